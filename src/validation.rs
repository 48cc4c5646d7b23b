use crate::{errors::ApiError, Result};
use axum::http::{header, HeaderMap, Method};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Longest GraphQL document accepted on the wire
pub const MAX_QUERY_LENGTH: usize = 10_000;
/// Request body ceiling enforced by the router
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const MAX_NAME_LENGTH: usize = 214;
const RESERVED_NAMES: [&str; 2] = ["node_modules", "favicon.ico"];

static EVENT_HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)on\w+=").expect("valid regex"));
static JAVASCRIPT_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript:").expect("valid regex"));

/// Characters `encodeURIComponent` leaves untouched besides ASCII alphanumerics
const URI_COMPONENT_SAFE: &str = "-_.!~*'()";

pub const MAX_TOPIC_LENGTH: usize = 50;
pub const MAX_CATEGORY_LENGTH: usize = 30;
pub const THEMES: [&str; 3] = ["light", "dark", "auto"];
pub const CURRENCIES: [&str; 4] = ["USD", "EUR", "BTC", "ETH"];

/// Validates HTTP/HTTPS URL
pub fn validate_http_url(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err("URL cannot be empty".to_string());
    }
    let url = url::Url::parse(value).map_err(|e| format!("Invalid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => {}
        _ => return Err("URL must use http or https scheme".to_string()),
    }
    if url.host_str().filter(|h| !h.is_empty()).is_none() {
        return Err("URL must have a valid host".to_string());
    }
    Ok(())
}

/// Checks the JSON body of a GraphQL POST before it reaches the executor
pub fn validate_graphql_request(body: &Value) -> Result<()> {
    let mut problems = Vec::new();

    match body.get("query") {
        Some(Value::String(query)) if query.trim().is_empty() => {
            problems.push("GraphQL query is required".to_string())
        }
        Some(Value::String(query)) if query.len() > MAX_QUERY_LENGTH => {
            problems.push("Query too long".to_string())
        }
        Some(Value::String(_)) => {}
        _ => problems.push("GraphQL query is required".to_string()),
    }

    match body.get("variables") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => problems.push("variables must be an object".to_string()),
    }

    match body.get("operationName") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => problems.push("operationName must be a string".to_string()),
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "Invalid GraphQL request: {}",
            problems.join(", ")
        )))
    }
}

/// POST bodies must be JSON
pub fn validate_content_type(method: &Method, headers: &HeaderMap) -> Result<()> {
    if method != Method::POST {
        return Ok(());
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    if is_json {
        Ok(())
    } else {
        Err(ApiError::UnsupportedMediaType(
            "Content-Type must be application/json for POST requests".to_string(),
        ))
    }
}

/// Strips markup and script vectors from free text
pub fn sanitize_text(text: &str) -> String {
    let without_brackets: String = text.chars().filter(|c| *c != '<' && *c != '>').collect();
    let without_js = JAVASCRIPT_URL.replace_all(&without_brackets, "");
    EVENT_HANDLER.replace_all(&without_js, "").trim().to_string()
}

/// Length check followed by sanitization
pub fn validate_input(input: &str, max_length: usize) -> Result<String> {
    if input.chars().count() > max_length {
        return Err(ApiError::Validation(format!(
            "Input too long. Maximum {max_length} characters allowed"
        )));
    }
    Ok(sanitize_text(input))
}

/// API keys are at least ten alphanumeric characters
pub fn validate_api_key_format(value: &str) -> std::result::Result<(), String> {
    if value.chars().count() < 10 {
        return Err("API key must be at least 10 characters".to_string());
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("API key contains invalid characters".to_string());
    }
    Ok(())
}

fn survives_uri_encoding(part: &str) -> bool {
    part.chars()
        .all(|c| c.is_ascii_alphanumeric() || URI_COMPONENT_SAFE.contains(c))
}

/// A name is URL-friendly when it needs no percent-encoding, or when it is
/// `@scope/name` and both halves need none
fn is_url_friendly(name: &str) -> bool {
    if survives_uri_encoding(name) {
        return true;
    }
    name.strip_prefix('@')
        .and_then(|rest| rest.split_once('/'))
        .filter(|(scope, pkg)| !scope.is_empty() && !pkg.is_empty() && !pkg.contains('/'))
        .is_some_and(|(scope, pkg)| survives_uri_encoding(scope) && survives_uri_encoding(pkg))
}

fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let length = value.chars().count();
    if length == 0 {
        return Err(ApiError::Validation(format!("{field} must not be empty")));
    }
    if length > max {
        return Err(ApiError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Length bounds for a new topic and its category
pub fn validate_topic_fields(topic: &str, category: &str) -> Result<()> {
    check_length("topic", topic, MAX_TOPIC_LENGTH)?;
    check_length("category", category, MAX_CATEGORY_LENGTH)
}

/// Theme and currency must come from the supported sets
pub fn validate_preferences(theme: Option<&str>, currency: Option<&str>) -> Result<()> {
    if let Some(theme) = theme.filter(|t| !THEMES.contains(t)) {
        return Err(ApiError::Validation(format!(
            "Invalid theme: {theme}. Expected one of {}",
            THEMES.join(", ")
        )));
    }
    if let Some(currency) = currency.filter(|c| !CURRENCIES.contains(c)) {
        return Err(ApiError::Validation(format!(
            "Invalid currency: {currency}. Expected one of {}",
            CURRENCIES.join(", ")
        )));
    }
    Ok(())
}

/// Verdict for a package-style name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameValidation {
    pub valid_for_new_packages: bool,
    pub valid_for_old_packages: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl NameValidation {
    /// First error, or failing that the first warning
    pub fn first_problem(&self) -> Option<&str> {
        self.errors
            .first()
            .or_else(|| self.warnings.first())
            .map(String::as_str)
    }
}

/// Applies npm-style naming rules. Errors make a name unusable, warnings only
/// disqualify it for new names.
pub fn validate_name(name: &str) -> NameValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if name.is_empty() {
        errors.push("name length must be greater than zero".to_string());
    }
    if name.starts_with('.') {
        errors.push("name cannot start with a period".to_string());
    }
    if name.starts_with('_') {
        errors.push("name cannot start with an underscore".to_string());
    }
    if name.trim() != name {
        errors.push("name cannot contain leading or trailing spaces".to_string());
    }
    for reserved in RESERVED_NAMES {
        if name.eq_ignore_ascii_case(reserved) {
            errors.push(format!("{reserved} is a blacklisted name"));
        }
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        warnings.push(format!(
            "name can no longer contain more than {MAX_NAME_LENGTH} characters"
        ));
    }
    if name.to_lowercase() != name {
        warnings.push("name can no longer contain capital letters".to_string());
    }
    let last_segment = name.rsplit('/').next().unwrap_or(name);
    if last_segment.chars().any(|c| "~'!()*".contains(c)) {
        warnings.push("name can no longer contain special characters (\"~'!()*\")".to_string());
    }

    if !is_url_friendly(name) {
        errors.push("name can only contain URL-friendly characters".to_string());
    }

    NameValidation {
        valid_for_new_packages: errors.is_empty() && warnings.is_empty(),
        valid_for_old_packages: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_http_url() {
        assert_eq!(validate_http_url("https://lunarcrush.com/api4/public"), Ok(()));
        assert_eq!(validate_http_url("http://localhost:8787"), Ok(()));
        assert_eq!(
            validate_http_url("ftp://lunarcrush.com"),
            Err("URL must use http or https scheme".to_string())
        );
        assert_eq!(
            validate_http_url("lunarcrush.com/api4"),
            Err("Invalid URL: relative URL without a base".to_string())
        );
        assert_eq!(validate_http_url(""), Err("URL cannot be empty".to_string()));
    }

    #[test]
    fn test_validate_graphql_request() {
        assert!(validate_graphql_request(&json!({ "query": "{ ping { status } }" })).is_ok());
        assert!(validate_graphql_request(&json!({
            "query": "query Q($s: String) { getCoin(symbol: $s) { name } }",
            "variables": { "s": "btc" },
            "operationName": "Q"
        }))
        .is_ok());

        let err = validate_graphql_request(&json!({ "query": "" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid GraphQL request: GraphQL query is required"
        );

        let err = validate_graphql_request(&json!({ "variables": [] })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid GraphQL request: GraphQL query is required, variables must be an object"
        );

        let long_query = "a".repeat(MAX_QUERY_LENGTH + 1);
        assert!(validate_graphql_request(&json!({ "query": long_query })).is_err());
    }

    #[test]
    fn test_validate_content_type() {
        let mut headers = HeaderMap::new();
        assert!(validate_content_type(&Method::GET, &headers).is_ok());
        assert!(matches!(
            validate_content_type(&Method::POST, &headers),
            Err(ApiError::UnsupportedMediaType(_))
        ));
        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert!(validate_content_type(&Method::POST, &headers).is_ok());
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  <b>bitcoin</b> "), "bbitcoin/b");
        assert_eq!(sanitize_text("JavaScript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_text("img onerror=steal()"), "img steal()");
        assert_eq!(sanitize_text("ethereum"), "ethereum");
    }

    #[test]
    fn test_validate_input() {
        assert_eq!(validate_input(" btc ", 10).unwrap(), "btc");
        let err = validate_input("abcdef", 5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input too long. Maximum 5 characters allowed"
        );
    }

    #[test]
    fn test_validate_api_key_format() {
        assert!(validate_api_key_format("abc123def456").is_ok());
        assert_eq!(
            validate_api_key_format("short"),
            Err("API key must be at least 10 characters".to_string())
        );
        assert_eq!(
            validate_api_key_format("abc-123-def-456"),
            Err("API key contains invalid characters".to_string())
        );
    }

    #[test]
    fn test_validate_name() {
        let ok = validate_name("bitcoin-etf");
        assert!(ok.valid_for_new_packages);
        assert!(ok.valid_for_old_packages);
        assert!(ok.first_problem().is_none());

        let capital = validate_name("Bitcoin");
        assert!(!capital.valid_for_new_packages);
        assert!(capital.valid_for_old_packages);
        assert_eq!(
            capital.first_problem(),
            Some("name can no longer contain capital letters")
        );

        let leading_dot = validate_name(".hidden");
        assert!(!leading_dot.valid_for_old_packages);
        assert_eq!(
            leading_dot.first_problem(),
            Some("name cannot start with a period")
        );

        let spaced = validate_name("solana memes");
        assert!(!spaced.valid_for_old_packages);
        assert!(spaced
            .errors
            .contains(&"name can only contain URL-friendly characters".to_string()));

        assert!(!validate_name("").valid_for_old_packages);
        assert!(validate_name("").errors.len() == 1);
        assert!(!validate_name("node_modules").valid_for_old_packages);
        assert!(!validate_name(&"a".repeat(215)).valid_for_new_packages);
    }

    #[test]
    fn test_validate_name_url_friendliness() {
        let url_error = "name can only contain URL-friendly characters".to_string();

        for name in ["btc/eth", "bit@coin", "@/bitcoin", "@lunar/", "@lunar/bit/coin"] {
            let verdict = validate_name(name);
            assert!(!verdict.valid_for_old_packages, "{name}");
            assert!(verdict.errors.contains(&url_error), "{name}");
        }

        let scoped = validate_name("@lunarcrush/bitcoin");
        assert!(scoped.valid_for_new_packages);
        assert!(scoped.errors.is_empty());

        let spaced_scope = validate_name("@lunar crush/bitcoin");
        assert!(spaced_scope.errors.contains(&url_error));

        // Special characters survive encoding, they only warn
        let bang = validate_name("bitcoin!");
        assert!(bang.valid_for_old_packages);
        assert!(!bang.valid_for_new_packages);
        assert!(bang.errors.is_empty());
        assert_eq!(
            bang.first_problem(),
            Some("name can no longer contain special characters (\"~'!()*\")")
        );
        assert!(validate_name("(bitcoin)").valid_for_old_packages);
    }

    #[test]
    fn test_validate_topic_fields() {
        assert!(validate_topic_fields("solana-defi", "defi").is_ok());
        assert_eq!(
            validate_topic_fields("", "defi").unwrap_err().to_string(),
            "topic must not be empty"
        );
        assert_eq!(
            validate_topic_fields(&"t".repeat(51), "defi")
                .unwrap_err()
                .to_string(),
            "topic must be at most 50 characters"
        );
        assert!(validate_topic_fields(&"t".repeat(50), &"c".repeat(30)).is_ok());
        assert_eq!(
            validate_topic_fields("bitcoin", &"c".repeat(31))
                .unwrap_err()
                .to_string(),
            "category must be at most 30 characters"
        );
    }

    #[test]
    fn test_validate_preferences() {
        assert!(validate_preferences(None, None).is_ok());
        assert!(validate_preferences(Some("auto"), Some("BTC")).is_ok());
        assert_eq!(
            validate_preferences(Some("neon"), None).unwrap_err().to_string(),
            "Invalid theme: neon. Expected one of light, dark, auto"
        );
        assert_eq!(
            validate_preferences(Some("dark"), Some("usd"))
                .unwrap_err()
                .to_string(),
            "Invalid currency: usd. Expected one of USD, EUR, BTC, ETH"
        );
    }
}
