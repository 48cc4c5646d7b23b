use crate::{
    config::Config,
    models::{TokenResponse, User},
    Result,
};
use axum::http::{HeaderMap, Method};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, fmt, net::SocketAddr};

const DEMO_TOKEN_DAYS: i64 = 7;
const MIN_KEY_LENGTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerKind {
    Demo,
    Authenticated,
    Admin,
}

impl CallerKind {
    /// Requests allowed per rate limit window
    pub fn request_limit(&self) -> u64 {
        match self {
            CallerKind::Demo => 10,
            CallerKind::Authenticated => 1000,
            CallerKind::Admin => 5000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallerKind::Demo => "demo",
            CallerKind::Authenticated => "authenticated",
            CallerKind::Admin => "admin",
        }
    }

    fn from_claim(kind: &str) -> Self {
        match kind {
            "admin" => CallerKind::Admin,
            "personal" | "authenticated" => CallerKind::Authenticated,
            _ => CallerKind::Demo,
        }
    }
}

impl fmt::Display for CallerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is calling, as far as rate limiting and mutations are concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub kind: CallerKind,
    pub id: String,
}

impl Caller {
    pub fn demo(client_ip: &str) -> Self {
        Self {
            kind: CallerKind::Demo,
            id: format!("demo:{client_ip}"),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.kind == CallerKind::Demo
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_hash: Option<String>,
}

/// First 16 hex characters of the SHA-256 of the key
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut hashed = hex::encode(digest);
    hashed.truncate(16);
    hashed
}

pub fn validate_key(key: &str) -> ApiKeyValidation {
    if key.is_empty() {
        return ApiKeyValidation {
            valid: false,
            error: Some("API key is required".to_string()),
            key_hash: None,
        };
    }
    if key.chars().count() < MIN_KEY_LENGTH {
        return ApiKeyValidation {
            valid: false,
            error: Some("API key too short".to_string()),
            key_hash: None,
        };
    }
    ApiKeyValidation {
        valid: true,
        error: None,
        key_hash: Some(hash_api_key(key)),
    }
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, "authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Looks for a key in the bearer header, then `x-api-key`, then `?api_key=`
pub fn extract_api_key(headers: &HeaderMap, query: &HashMap<String, String>) -> Option<String> {
    bearer_token(headers)
        .or_else(|| header_str(headers, "x-api-key"))
        .or_else(|| {
            query
                .get("api_key")
                .map(String::as_str)
                .filter(|key| !key.is_empty())
        })
        .map(str::to_string)
}

/// Best guess at the client address behind proxies
pub fn client_ip(headers: &HeaderMap, connect_info: Option<SocketAddr>) -> String {
    if let Some(ip) = header_str(headers, "cf-connecting-ip") {
        return ip.to_string();
    }
    if let Some(ip) = header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }
    connect_info
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

pub fn issue_demo_token(secret: &str, now: DateTime<Utc>) -> Result<TokenResponse> {
    let sub = format!("demo_{}", now.timestamp_millis());
    let claims = Claims {
        sub: sub.clone(),
        kind: CallerKind::Demo.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(DEMO_TOKEN_DAYS)).timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(TokenResponse {
        token,
        user: User {
            id: sub,
            kind: claims.kind,
            last_seen: now.to_rfc3339(),
        },
        expires_in: format!("{DEMO_TOKEN_DAYS} days"),
    })
}

/// Classifies the caller of `/graphql`
pub fn identify_caller(
    method: &Method,
    headers: &HeaderMap,
    client_ip: &str,
    config: &Config,
) -> Caller {
    // GraphiQL page loads are always demo traffic
    if method == Method::GET {
        return Caller::demo(client_ip);
    }

    if let Some(key) = header_str(headers, "x-api-key") {
        if config.has_api_key() && key == config.lunarcrush_api_key {
            return Caller {
                kind: CallerKind::Authenticated,
                id: format!("auth:{}", hash_api_key(key)),
            };
        }
    }

    if let Some(token) = bearer_token(headers) {
        match verify_token(&config.jwt_secret, token) {
            Ok(claims) => {
                let kind = CallerKind::from_claim(&claims.kind);
                if kind != CallerKind::Demo {
                    return Caller {
                        kind,
                        id: format!("user:{}", claims.sub),
                    };
                }
            }
            Err(err) => tracing::debug!("Ignoring invalid bearer token: {}", err),
        }
    }

    Caller::demo(client_ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    fn config() -> Config {
        Config {
            lunarcrush_api_key: "upstreamkey123".to_string(),
            jwt_secret: "test-secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_api_key() {
        let hashed = hash_api_key("abc");
        assert_eq!(hashed, "ba7816bf8f01cfea");
        assert_eq!(hashed.len(), 16);
    }

    #[test]
    fn test_validate_key() {
        assert_eq!(validate_key("").error.as_deref(), Some("API key is required"));
        assert_eq!(validate_key("short").error.as_deref(), Some("API key too short"));
        let ok = validate_key("long-enough-key");
        assert!(ok.valid);
        assert_eq!(ok.key_hash, Some(hash_api_key("long-enough-key")));
    }

    #[test]
    fn test_extract_api_key_order() {
        let mut query = HashMap::new();
        query.insert("api_key".to_string(), "from-query".to_string());

        let all = headers(&[
            ("authorization", "Bearer from-bearer"),
            ("x-api-key", "from-header"),
        ]);
        assert_eq!(extract_api_key(&all, &query).as_deref(), Some("from-bearer"));

        let header_only = headers(&[("x-api-key", "from-header")]);
        assert_eq!(
            extract_api_key(&header_only, &query).as_deref(),
            Some("from-header")
        );

        let basic = headers(&[("authorization", "Basic abc")]);
        assert_eq!(extract_api_key(&basic, &query).as_deref(), Some("from-query"));

        assert_eq!(extract_api_key(&HeaderMap::new(), &HashMap::new()), None);
    }

    #[test]
    fn test_client_ip_precedence() {
        let addr: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let all = headers(&[
            ("cf-connecting-ip", "1.1.1.1"),
            ("x-forwarded-for", "2.2.2.2, 3.3.3.3"),
        ]);
        assert_eq!(client_ip(&all, Some(addr)), "1.1.1.1");

        let forwarded = headers(&[("x-forwarded-for", "2.2.2.2, 3.3.3.3")]);
        assert_eq!(client_ip(&forwarded, Some(addr)), "2.2.2.2");

        assert_eq!(client_ip(&HeaderMap::new(), Some(addr)), "10.0.0.9");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_demo_token_roundtrip() {
        let now = Utc::now();
        let issued = issue_demo_token("test-secret", now).unwrap();
        assert_eq!(issued.expires_in, "7 days");
        assert_eq!(issued.user.kind, "demo");
        assert!(issued.user.id.starts_with("demo_"));

        let claims = verify_token("test-secret", &issued.token).unwrap();
        assert_eq!(claims.sub, issued.user.id);
        assert_eq!(claims.kind, "demo");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);

        assert!(verify_token("other-secret", &issued.token).is_err());
    }

    #[test]
    fn test_identify_caller() {
        let config = config();

        let get = identify_caller(
            &Method::GET,
            &headers(&[("x-api-key", "upstreamkey123")]),
            "1.2.3.4",
            &config,
        );
        assert_eq!(get, Caller::demo("1.2.3.4"));

        let keyed = identify_caller(
            &Method::POST,
            &headers(&[("x-api-key", "upstreamkey123")]),
            "1.2.3.4",
            &config,
        );
        assert_eq!(keyed.kind, CallerKind::Authenticated);
        assert_eq!(keyed.id, format!("auth:{}", hash_api_key("upstreamkey123")));

        let wrong_key = identify_caller(
            &Method::POST,
            &headers(&[("x-api-key", "nope-nope-nope")]),
            "1.2.3.4",
            &config,
        );
        assert!(wrong_key.is_demo());

        let now = Utc::now();
        let admin_claims = Claims {
            sub: "ops".to_string(),
            kind: "admin".to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &admin_claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        let bearer = format!("Bearer {token}");
        let admin = identify_caller(
            &Method::POST,
            &headers(&[("authorization", bearer.as_str())]),
            "1.2.3.4",
            &config,
        );
        assert_eq!(admin.kind, CallerKind::Admin);
        assert_eq!(admin.id, "user:ops");

        let demo_token = issue_demo_token("test-secret", now).unwrap();
        let bearer = format!("Bearer {}", demo_token.token);
        let demo = identify_caller(
            &Method::POST,
            &headers(&[("authorization", bearer.as_str())]),
            "5.6.7.8",
            &config,
        );
        assert_eq!(demo, Caller::demo("5.6.7.8"));
    }

    #[test]
    fn test_tiers() {
        assert_eq!(CallerKind::Demo.request_limit(), 10);
        assert_eq!(CallerKind::Authenticated.request_limit(), 1000);
        assert_eq!(CallerKind::Admin.request_limit(), 5000);
    }
}
