use crate::{
    errors::ApiError,
    validation::{validate_api_key_format, validate_http_url},
    Result,
};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://lunarcrush.com/api4/public";

/// Configuration for the gateway, read from the environment
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Upstream LunarCrush API key. An empty key leaves the service running in degraded mode
    #[serde(default)]
    pub lunarcrush_api_key: String,
    /// Upstream base URL
    #[serde(default = "default_base_url")]
    pub lunarcrush_base_url: String,
    /// Secret used to sign demo tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Redis URL for the shared cache. Falls back to an in-process store when absent
    pub redis_url: Option<String>,
    /// Optional database binding, only reported by health checks
    pub database_url: Option<String>,
    /// Deployment environment discriminator
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Port to run the server on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Default cache TTL in seconds for upstream responses
    #[serde(default = "default_cache_ttl")]
    pub cache_default_ttl: u64,
    /// Upstream request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
    /// Comma separated list of allowed origins, `*` acts as a wildcard
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: String,
    /// `json` or `text`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_jwt_secret() -> String {
    "fallback-secret-key".to_string()
}

fn default_environment() -> String {
    "production".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_cache_ttl() -> u64 {
    120
}

fn default_upstream_timeout() -> u64 {
    30
}

fn default_cors_origins() -> String {
    "http://localhost:3000,https://lunarcrush.com,https://*.vercel.app,https://*.workers.dev"
        .to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lunarcrush_api_key: String::new(),
            lunarcrush_base_url: default_base_url(),
            jwt_secret: default_jwt_secret(),
            redis_url: None,
            database_url: None,
            environment: default_environment(),
            port: default_port(),
            cache_default_ttl: default_cache_ttl(),
            upstream_timeout_secs: default_upstream_timeout(),
            cors_allowed_origins: default_cors_origins(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Rejects configurations the server cannot start with
    pub fn validate(&self) -> Result<()> {
        validate_http_url(&self.lunarcrush_base_url)
            .map_err(|e| ApiError::Config(format!("LUNARCRUSH_BASE_URL: {e}")))?;
        if self.jwt_secret.trim().is_empty() {
            return Err(ApiError::Config("JWT_SECRET cannot be empty".to_string()));
        }
        if self.has_api_key() {
            if let Err(problem) = validate_api_key_format(self.lunarcrush_api_key.trim()) {
                tracing::warn!("LUNARCRUSH_API_KEY looks malformed: {}", problem);
            }
        }
        Ok(())
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn has_api_key(&self) -> bool {
        !self.lunarcrush_api_key.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_env() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.lunarcrush_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.port, 8787);
        assert_eq!(config.cache_default_ttl, 120);
        assert_eq!(config.environment, "production");
        assert!(config.redis_url.is_none());
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_env_overrides() {
        let vars = vec![
            ("LUNARCRUSH_API_KEY".to_string(), "abcdef123456".to_string()),
            ("PORT".to_string(), "9000".to_string()),
            ("ENVIRONMENT".to_string(), "development".to_string()),
            ("REDIS_URL".to_string(), "redis://127.0.0.1/".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.is_development());
        assert!(config.has_api_key());
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1/"));
    }

    #[test]
    fn test_cors_origins_split() {
        let config = Config {
            cors_allowed_origins: " http://a.test , ,https://*.b.test".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.cors_origins(),
            vec!["http://a.test".to_string(), "https://*.b.test".to_string()]
        );
    }

    #[test]
    fn test_validate() {
        tokio_test::assert_ok!(Config::default().validate());

        let bad_url = Config {
            lunarcrush_base_url: "ftp://lunarcrush.com".to_string(),
            ..Default::default()
        };
        tokio_test::assert_err!(bad_url.validate());

        let empty_secret = Config {
            jwt_secret: "  ".to_string(),
            ..Default::default()
        };
        assert!(empty_secret.validate().is_err());
    }
}
