use std::path::Path;

use anyhow::{Context, Result};
use chrono::DateTime;

use crate::codec::{decode_adnl_address, decode_public_key_base64, FriendlyAddress};
use crate::models::{DomainDescriptor, NamedCheck};

/// Loads the domain descriptor and runs independent structural checks on it.
pub struct DomainConfigLoader;

impl DomainConfigLoader {
    /// Read and parse the descriptor JSON. A missing file or invalid JSON is
    /// an error for this check only; callers report `config_present=FAIL`
    /// and keep the run going.
    pub fn load(path: &Path) -> Result<DomainDescriptor> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading descriptor {}", path.display()))?;

        serde_json::from_str(&raw)
            .with_context(|| format!("parsing descriptor {}", path.display()))
    }

    /// Run every structural check independently. One check failing never
    /// short-circuits another; the report wants the full picture.
    pub fn validate_structure(
        descriptor: &DomainDescriptor,
        expected_keygen_command: &str,
    ) -> Vec<NamedCheck> {
        let mut checks = Vec::new();

        let site = descriptor.ton_site.as_ref();

        checks.push(match site {
            Some(_) => NamedCheck::pass("ton_site_present"),
            None => NamedCheck::fail("ton_site_present", "descriptor has no ton_site block"),
        });

        checks.push(match site {
            Some(site) => match decode_adnl_address(&site.adnl_address) {
                Ok(_) => NamedCheck::pass("adnl_format"),
                Err(e) => NamedCheck::fail("adnl_format", e.to_string()),
            },
            None => NamedCheck::fail("adnl_format", "no ton_site block"),
        });

        checks.push(match site {
            Some(site) => match decode_public_key_base64(&site.public_key_base64) {
                Ok(_) => NamedCheck::pass("public_key_valid"),
                Err(e) => NamedCheck::fail("public_key_valid", e.to_string()),
            },
            None => NamedCheck::fail("public_key_valid", "no ton_site block"),
        });

        checks.push(match &descriptor.resolver_contract {
            Some(contract) => match FriendlyAddress::decode(contract) {
                Ok(_) => NamedCheck::pass("resolver_format"),
                Err(e) => NamedCheck::fail("resolver_format", e.to_string()),
            },
            None => NamedCheck::fail("resolver_format", "no resolver_contract declared"),
        });

        // Provenance checks only apply when the descriptor records how the
        // keys were generated; drift in the command is a warning, not a
        // failure.
        if let Some(generated) = site.and_then(|s| s.generated.as_ref()) {
            checks.push(if generated.command == expected_keygen_command {
                NamedCheck::pass("generated_command_status")
            } else {
                NamedCheck::warn(
                    "generated_command_status",
                    format!("expected `{}`, got `{}`", expected_keygen_command, generated.command),
                )
            });

            checks.push(match DateTime::parse_from_rfc3339(&generated.timestamp) {
                Ok(_) => NamedCheck::pass("generated_timestamp_status"),
                Err(e) => NamedCheck::fail(
                    "generated_timestamp_status",
                    format!("`{}`: {}", generated.timestamp, e),
                ),
            });
        }

        // Documentation consistency: the declared ADNL string must appear
        // verbatim in at least one human-readable note.
        if let Some(site) = site {
            if !site.adnl_address.is_empty() {
                let referenced = descriptor
                    .notes
                    .iter()
                    .any(|note| note.contains(&site.adnl_address));
                checks.push(if referenced {
                    NamedCheck::pass("notes_reference_adnl")
                } else {
                    NamedCheck::fail(
                        "notes_reference_adnl",
                        "declared ADNL address never appears in notes",
                    )
                });
            }
        }

        checks
    }

    /// Hostnames that must resolve to the same TON Site: CNAME-shaped records
    /// whose target is the root domain itself.
    pub fn derive_alias_hosts(descriptor: &DomainDescriptor) -> Vec<String> {
        let root = descriptor.domain.trim_end_matches('.');
        if root.is_empty() {
            return Vec::new();
        }

        descriptor
            .records
            .iter()
            .filter(|record| record.record_type.eq_ignore_ascii_case("CNAME"))
            .filter(|record| record.data.trim_end_matches('.') == root)
            .map(|record| record.name.trim_end_matches('.').to_string())
            .filter(|name| !name.is_empty() && name != root)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CheckStatus, DnsRecordEntry, GeneratedInfo, TonSite};

    fn status_of(checks: &[NamedCheck], name: &str) -> CheckStatus {
        checks
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("missing check {}", name))
            .status
    }

    fn valid_descriptor() -> DomainDescriptor {
        let adnl = format!("0:{}", "ab".repeat(32));
        DomainDescriptor {
            domain: "example.ton".to_string(),
            ton_site: Some(TonSite {
                adnl_address: adnl.clone(),
                public_key_base64: {
                    use base64::Engine;
                    base64::engine::general_purpose::STANDARD.encode([1u8; 32])
                },
                generated: Some(GeneratedInfo {
                    command: "tonsite-keygen --adnl".to_string(),
                    timestamp: "2026-01-15T10:30:00Z".to_string(),
                    note: None,
                }),
            }),
            resolver_contract: None,
            records: vec![],
            notes: vec![format!("ADNL for this site: {}", adnl)],
        }
    }

    #[test]
    fn load_missing_file_is_an_error_not_a_panic() {
        assert!(DomainConfigLoader::load(Path::new("/nonexistent/site.json")).is_err());
    }

    #[test]
    fn valid_descriptor_passes_structural_checks() {
        let checks =
            DomainConfigLoader::validate_structure(&valid_descriptor(), "tonsite-keygen --adnl");

        assert_eq!(status_of(&checks, "ton_site_present"), CheckStatus::Pass);
        assert_eq!(status_of(&checks, "adnl_format"), CheckStatus::Pass);
        assert_eq!(status_of(&checks, "public_key_valid"), CheckStatus::Pass);
        assert_eq!(status_of(&checks, "generated_command_status"), CheckStatus::Pass);
        assert_eq!(status_of(&checks, "generated_timestamp_status"), CheckStatus::Pass);
        assert_eq!(status_of(&checks, "notes_reference_adnl"), CheckStatus::Pass);
    }

    #[test]
    fn missing_ton_site_fails_dependent_checks_independently() {
        let descriptor = DomainDescriptor {
            domain: "example.ton".to_string(),
            ..Default::default()
        };
        let checks = DomainConfigLoader::validate_structure(&descriptor, "tonsite-keygen --adnl");

        assert_eq!(status_of(&checks, "ton_site_present"), CheckStatus::Fail);
        assert_eq!(status_of(&checks, "adnl_format"), CheckStatus::Fail);
        assert_eq!(status_of(&checks, "public_key_valid"), CheckStatus::Fail);
        assert_eq!(status_of(&checks, "resolver_format"), CheckStatus::Fail);
    }

    #[test]
    fn command_drift_is_a_warning() {
        let mut descriptor = valid_descriptor();
        descriptor.ton_site.as_mut().unwrap().generated.as_mut().unwrap().command =
            "some-other-tool".to_string();

        let checks = DomainConfigLoader::validate_structure(&descriptor, "tonsite-keygen --adnl");
        assert_eq!(status_of(&checks, "generated_command_status"), CheckStatus::Warn);
    }

    #[test]
    fn bad_timestamp_fails() {
        let mut descriptor = valid_descriptor();
        descriptor.ton_site.as_mut().unwrap().generated.as_mut().unwrap().timestamp =
            "yesterday".to_string();

        let checks = DomainConfigLoader::validate_structure(&descriptor, "tonsite-keygen --adnl");
        assert_eq!(status_of(&checks, "generated_timestamp_status"), CheckStatus::Fail);
    }

    #[test]
    fn unreferenced_adnl_fails_notes_check() {
        let mut descriptor = valid_descriptor();
        descriptor.notes = vec!["setup instructions".to_string()];

        let checks = DomainConfigLoader::validate_structure(&descriptor, "tonsite-keygen --adnl");
        assert_eq!(status_of(&checks, "notes_reference_adnl"), CheckStatus::Fail);
    }

    #[test]
    fn alias_hosts_come_from_cnames_pointing_at_the_root() {
        let mut descriptor = valid_descriptor();
        descriptor.records = vec![
            DnsRecordEntry {
                record_type: "CNAME".to_string(),
                name: "www.example.ton".to_string(),
                data: "example.ton.".to_string(),
            },
            DnsRecordEntry {
                record_type: "cname".to_string(),
                name: "blog.example.ton.".to_string(),
                data: "example.ton".to_string(),
            },
            DnsRecordEntry {
                record_type: "CNAME".to_string(),
                name: "elsewhere.example.ton".to_string(),
                data: "other.ton".to_string(),
            },
            DnsRecordEntry {
                record_type: "A".to_string(),
                name: "example.ton".to_string(),
                data: "example.ton".to_string(),
            },
        ];

        let aliases = DomainConfigLoader::derive_alias_hosts(&descriptor);
        assert_eq!(aliases, vec!["www.example.ton", "blog.example.ton"]);
    }
}
