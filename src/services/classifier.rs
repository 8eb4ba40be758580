use serde_json::Value;

use crate::models::Outcome;

/// How many leading characters of a gateway body the heuristic inspects.
const BODY_WINDOW: usize = 240;

/// Substrings that mark a 200-looking gateway response as a miss. Gateways
/// routinely serve error pages and parking pages with a 200 status, so the
/// body has to clear this list before a probe counts as a hit.
pub const DEFAULT_FAILURE_INDICATORS: [&str; 7] = [
    "dns resolution failure",
    "not found",
    "upstream connect error",
    "connection timeout",
    "domain for sale",
    "forsale",
    "error",
];

/// Pluggable response classification.
///
/// Injectable so gateway wording drift is a config change, not a call-site
/// change.
pub trait Classifier: Send + Sync {
    /// Judge a gateway body that arrived with an HTTP-successful status.
    fn classify_gateway_body(&self, body: &str) -> Outcome;

    /// Judge an API response: transport-level problems are `Error`, a 2xx
    /// payload missing the field we need is `Fail`, anything else `Pass`.
    fn classify_api_response(
        &self,
        status: u16,
        body: Option<&Value>,
        required_field: &str,
    ) -> Outcome;
}

/// Default classifier: case-insensitive substring matching over the first
/// 240 characters of the body.
pub struct IndicatorClassifier {
    indicators: Vec<String>,
}

impl IndicatorClassifier {
    pub fn new(indicators: Vec<String>) -> Self {
        Self {
            indicators: indicators.into_iter().map(|i| i.to_lowercase()).collect(),
        }
    }
}

impl Default for IndicatorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_INDICATORS.iter().map(|i| i.to_string()).collect())
    }
}

impl Classifier for IndicatorClassifier {
    fn classify_gateway_body(&self, body: &str) -> Outcome {
        let window: String = body.chars().take(BODY_WINDOW).collect::<String>().to_lowercase();

        if self.indicators.iter().any(|i| window.contains(i.as_str())) {
            Outcome::Fail
        } else {
            Outcome::Pass
        }
    }

    fn classify_api_response(
        &self,
        status: u16,
        body: Option<&Value>,
        required_field: &str,
    ) -> Outcome {
        if !(200..300).contains(&status) {
            return Outcome::Error;
        }

        let Some(json) = body else {
            return Outcome::Error;
        };

        if lookup_path(json, required_field).is_none() {
            return Outcome::Fail;
        }

        Outcome::Pass
    }
}

/// Walk a dotted path (`item.address`) through a JSON value.
fn lookup_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = json;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_body_passes() {
        let classifier = IndicatorClassifier::default();
        assert_eq!(
            classifier.classify_gateway_body("<html><body>Welcome to my TON site</body></html>"),
            Outcome::Pass
        );
    }

    #[test]
    fn failure_indicators_fail_regardless_of_case() {
        let classifier = IndicatorClassifier::default();
        for body in [
            "DNS Resolution Failure for host",
            "404 Not Found",
            "upstream connect error or disconnect",
            "This Domain For Sale!",
            "ForSale: premium name",
            "Internal Server Error",
        ] {
            assert_eq!(classifier.classify_gateway_body(body), Outcome::Fail, "{}", body);
        }
    }

    #[test]
    fn only_the_first_240_chars_are_inspected() {
        let classifier = IndicatorClassifier::default();
        let body = format!("{}error", " ".repeat(300));
        assert_eq!(classifier.classify_gateway_body(&body), Outcome::Pass);

        let body = format!("{}error", " ".repeat(200));
        assert_eq!(classifier.classify_gateway_body(&body), Outcome::Fail);
    }

    #[test]
    fn custom_indicator_list_is_honored() {
        let classifier = IndicatorClassifier::new(vec!["suspended".to_string()]);
        assert_eq!(classifier.classify_gateway_body("account suspended"), Outcome::Fail);
        // "error" is no longer on the list.
        assert_eq!(classifier.classify_gateway_body("error page"), Outcome::Pass);
    }

    #[test]
    fn api_classification_tiers() {
        let classifier = IndicatorClassifier::default();
        let body = json!({"item": {"address": "0:ab"}});

        assert_eq!(
            classifier.classify_api_response(200, Some(&body), "item.address"),
            Outcome::Pass
        );
        assert_eq!(
            classifier.classify_api_response(200, Some(&json!({"item": {}})), "item.address"),
            Outcome::Fail
        );
        assert_eq!(
            classifier.classify_api_response(500, Some(&body), "item.address"),
            Outcome::Error
        );
        assert_eq!(classifier.classify_api_response(200, None, "item.address"), Outcome::Error);
    }
}
