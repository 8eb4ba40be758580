use serde::{Deserialize, Serialize};

/// Declared identity of a domain: its TON Site keys, resolver contract and
/// DNS records. Loaded once per run, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DomainDescriptor {
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub ton_site: Option<TonSite>,

    #[serde(default)]
    pub resolver_contract: Option<String>,

    #[serde(default)]
    pub records: Vec<DnsRecordEntry>,

    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TonSite {
    #[serde(default)]
    pub adnl_address: String,

    #[serde(default)]
    pub public_key_base64: String,

    #[serde(default)]
    pub generated: Option<GeneratedInfo>,
}

/// Provenance of the TON Site keys: which command produced them and when.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratedInfo {
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DnsRecordEntry {
    #[serde(rename = "type", default)]
    pub record_type: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub data: String,
}
