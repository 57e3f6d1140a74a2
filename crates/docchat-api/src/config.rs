//! Server configuration from environment variables.

use axum::http::HeaderValue;
use std::path::PathBuf;

use docchat_core::defaults;

/// Settings the HTTP layer and the chat services need.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used to build PDF download links.
    pub backend_url: String,
    pub allowed_origins: Vec<HeaderValue>,
    pub storage_path: PathBuf,
    pub max_upload_bytes: usize,
    pub assistant_name: String,
    pub default_top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            backend_url: defaults::BACKEND_URL.to_string(),
            allowed_origins: parse_allowed_origins(defaults::ALLOWED_ORIGINS),
            storage_path: PathBuf::from(defaults::STORAGE_PATH),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            assistant_name: defaults::ASSISTANT_NAME.to_string(),
            default_top_k: defaults::TOP_K,
        }
    }
}

impl AppConfig {
    /// Read configuration, falling back to [`defaults`] for anything unset
    /// or unparseable.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            host: env_or("HOST", base.host),
            port: env_parse("PORT", base.port),
            backend_url: env_or("BACKEND_URL", base.backend_url)
                .trim_end_matches('/')
                .to_string(),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|s| parse_allowed_origins(&s))
                .unwrap_or(base.allowed_origins),
            storage_path: std::env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(base.storage_path),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", base.max_upload_bytes),
            assistant_name: env_or("ASSISTANT_NAME", base.assistant_name),
            default_top_k: env_parse("DEFAULT_TOP_K", base.default_top_k)
                .clamp(1, defaults::MAX_TOP_K),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(name: &str, fallback: String) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(fallback)
}

fn env_parse<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(fallback)
}

/// Parse a comma-separated origin list. Invalid entries are skipped with a
/// warning; an empty list falls back to the default origin.
pub fn parse_allowed_origins(origins: &str) -> Vec<HeaderValue> {
    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    if parsed.is_empty() {
        vec![HeaderValue::from_static(defaults::ALLOWED_ORIGINS)]
    } else {
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins() {
        let origins = parse_allowed_origins("http://localhost:5173, https://chat.example.com");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[1].to_str().unwrap(), "https://chat.example.com");
    }

    #[test]
    fn test_parse_allowed_origins_empty_uses_default() {
        let origins = parse_allowed_origins(" , ");
        assert_eq!(origins.len(), 1);
        assert_eq!(origins[0].to_str().unwrap(), defaults::ALLOWED_ORIGINS);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, defaults::SERVER_PORT);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.default_top_k, defaults::TOP_K);
    }
}
