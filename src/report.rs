use std::io::Write;

use crate::models::{CheckStatus, NamedCheck};

/// Line-oriented `key=value` report for shell automation: one line per check,
/// one terminal `verified=` verdict, non-zero exit on FAIL.
#[derive(Debug, Default)]
pub struct ReportEmitter {
    lines: Vec<(String, String)>,
    required_failed: bool,
    inconclusive: bool,
}

impl ReportEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-form informational key.
    pub fn info(&mut self, key: &str, value: impl Into<String>) {
        self.lines.push((key.to_string(), value.into()));
    }

    /// A check whose FAIL forces the terminal verdict to FAIL. An ERROR or
    /// SKIPPED here leaves the run inconclusive: never reported as PASS,
    /// never conflated with a substantive failure.
    pub fn required(&mut self, key: &str, status: CheckStatus) {
        match status {
            CheckStatus::Fail => self.required_failed = true,
            CheckStatus::Error | CheckStatus::Skipped => self.inconclusive = true,
            CheckStatus::Pass | CheckStatus::Warn => {}
        }
        self.lines.push((key.to_string(), status.as_str().to_string()));
    }

    /// A check recorded for visibility only (WARN, optional probes).
    pub fn optional(&mut self, key: &str, status: CheckStatus) {
        self.lines.push((key.to_string(), status.as_str().to_string()));
    }

    pub fn required_check(&mut self, check: &NamedCheck) {
        // WARN never forces failure; it rides along as its own status.
        match check.status {
            CheckStatus::Warn => self.optional(check.name, check.status),
            status => self.required(check.name, status),
        }
        if let Some(detail) = &check.detail {
            self.lines.push((format!("{}_detail", check.name), detail.clone()));
        }
    }

    /// Mark the whole run as missing a prerequisite (no config file, no
    /// usable transport). Distinct from a substantive failure.
    pub fn prerequisite_missing(&mut self, key: &str, detail: impl Into<String>) {
        self.inconclusive = true;
        self.lines.push((key.to_string(), CheckStatus::Skipped.as_str().to_string()));
        self.lines.push((format!("{}_detail", key), detail.into()));
    }

    /// Terminal verdict: FAIL beats SKIPPED beats PASS.
    pub fn terminal_verdict(&self) -> &'static str {
        if self.required_failed {
            "FAIL"
        } else if self.inconclusive {
            "SKIPPED"
        } else {
            "PASS"
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.terminal_verdict() == "FAIL" {
            1
        } else {
            0
        }
    }

    /// Write every record plus the terminal `verified=` line.
    pub fn emit(&self, out: &mut impl Write) -> std::io::Result<()> {
        for (key, value) in &self.lines {
            writeln!(out, "{}={}", key, sanitize(value))?;
        }
        writeln!(out, "verified={}", self.terminal_verdict())
    }
}

/// Keep the surface parseable: one record per line, no embedded newlines.
fn sanitize(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(report: &ReportEmitter) -> String {
        let mut buf = Vec::new();
        report.emit(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn all_pass_is_pass() {
        let mut report = ReportEmitter::new();
        report.required("config_present", CheckStatus::Pass);
        report.required("adnl_format", CheckStatus::Pass);

        assert_eq!(report.terminal_verdict(), "PASS");
        assert_eq!(report.exit_code(), 0);
        assert!(rendered(&report).ends_with("verified=PASS\n"));
    }

    #[test]
    fn any_required_fail_forces_fail() {
        let mut report = ReportEmitter::new();
        report.required("config_present", CheckStatus::Pass);
        report.required("adnl_format", CheckStatus::Fail);
        report.required("public_key_valid", CheckStatus::Pass);

        assert_eq!(report.terminal_verdict(), "FAIL");
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn warn_does_not_force_fail() {
        let mut report = ReportEmitter::new();
        report.required_check(&NamedCheck::warn("generated_command_status", "drifted"));

        assert_eq!(report.terminal_verdict(), "PASS");
        assert!(rendered(&report).contains("generated_command_status=WARN"));
    }

    #[test]
    fn missing_prerequisite_is_skipped_not_fail() {
        let mut report = ReportEmitter::new();
        report.prerequisite_missing("config_present", "no descriptor file");

        assert_eq!(report.terminal_verdict(), "SKIPPED");
        assert_eq!(report.exit_code(), 0);
        assert!(rendered(&report).contains("config_present=SKIPPED"));
        assert!(rendered(&report).ends_with("verified=SKIPPED\n"));
    }

    #[test]
    fn fail_beats_skipped() {
        let mut report = ReportEmitter::new();
        report.prerequisite_missing("gateway_probe", "no transport");
        report.required("adnl_format", CheckStatus::Fail);

        assert_eq!(report.terminal_verdict(), "FAIL");
    }

    #[test]
    fn required_error_is_inconclusive_not_pass() {
        let mut report = ReportEmitter::new();
        report.required("config_present", CheckStatus::Pass);
        report.required("resolver_matches_dns", CheckStatus::Error);

        assert_eq!(report.terminal_verdict(), "SKIPPED");
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn values_stay_on_one_line() {
        let mut report = ReportEmitter::new();
        report.info("note", "line one\nline two");

        assert!(rendered(&report).contains("note=line one line two\n"));
    }
}
