use actix_web::http::header::HeaderName;
use actix_web::http::{Method, Uri};
use thiserror::Error;

use crate::youtube::config::YouTubeConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

const CORS_ALLOW_ORIGINS_ENV: &str = "FACTFINDER_CORS_ALLOW_ORIGINS";
const CORS_ALLOW_METHODS_ENV: &str = "FACTFINDER_CORS_ALLOW_METHODS";
const CORS_ALLOW_HEADERS_ENV: &str = "FACTFINDER_CORS_ALLOW_HEADERS";
const CORS_ALLOW_CREDENTIALS_ENV: &str = "FACTFINDER_CORS_ALLOW_CREDENTIALS";
const CORS_MAX_AGE_ENV: &str = "FACTFINDER_CORS_MAX_AGE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Either a wildcard or an explicit list of allowed values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowList {
    Any,
    Only(Vec<String>),
}

impl AllowList {
    /// `*` (or nothing) means any; otherwise a comma separated list.
    pub fn parse(raw: &str) -> Self {
        let values: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();

        if values.is_empty() || values.iter().any(|value| value == "*") {
            AllowList::Any
        } else {
            AllowList::Only(values)
        }
    }
}

/// Cross-origin policy applied to every response.
///
/// The defaults let any browser extension call the service with
/// credentials. Narrow `allowed_origins` to the extension's origin for
/// anything beyond local development.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: AllowList,
    pub allowed_methods: AllowList,
    pub allowed_headers: AllowList,
    pub allow_credentials: bool,
    pub max_age: Option<usize>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowList::Any,
            allowed_methods: AllowList::Any,
            allowed_headers: AllowList::Any,
            allow_credentials: true,
            max_age: Some(3600),
        }
    }
}

impl CorsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(origins) = lookup(CORS_ALLOW_ORIGINS_ENV) {
            config.allowed_origins = parse_checked(CORS_ALLOW_ORIGINS_ENV, &origins, |origin| {
                origin.parse::<Uri>().map(drop).map_err(|e| e.to_string())
            })?;
        }
        if let Some(methods) = lookup(CORS_ALLOW_METHODS_ENV) {
            config.allowed_methods = parse_checked(CORS_ALLOW_METHODS_ENV, &methods, |method| {
                Method::from_bytes(method.as_bytes()).map(drop).map_err(|e| e.to_string())
            })?;
        }
        if let Some(headers) = lookup(CORS_ALLOW_HEADERS_ENV) {
            config.allowed_headers = parse_checked(CORS_ALLOW_HEADERS_ENV, &headers, |header| {
                HeaderName::from_bytes(header.as_bytes()).map(drop).map_err(|e| e.to_string())
            })?;
        }
        if let Some(credentials) = lookup(CORS_ALLOW_CREDENTIALS_ENV) {
            config.allow_credentials = parse_bool(CORS_ALLOW_CREDENTIALS_ENV, &credentials)?;
        }
        if let Some(max_age) = lookup(CORS_MAX_AGE_ENV) {
            config.max_age = Some(max_age.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: CORS_MAX_AGE_ENV,
                    value: max_age.clone(),
                    reason: e.to_string(),
                }
            })?);
        }

        Ok(config)
    }
}

/// Parses an allow list and rejects entries actix-cors would refuse.
fn parse_checked<F>(key: &'static str, raw: &str, check: F) -> Result<AllowList, ConfigError>
where
    F: Fn(&str) -> Result<(), String>,
{
    let list = AllowList::parse(raw);
    if let AllowList::Only(values) = &list {
        for value in values {
            check(value).map_err(|reason| ConfigError::InvalidValue {
                key,
                value: value.clone(),
                reason,
            })?;
        }
    }
    Ok(list)
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
    pub youtube: YouTubeConfig,
}

impl ServerConfig {
    pub fn from_env(host: String, port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            host,
            port,
            cors: CorsConfig::from_env()?,
            youtube: YouTubeConfig::from_env(),
        })
    }
}

#[derive(Debug)]
pub struct ClientConfig {
    pub server_url: String,
    pub video: String,
    pub json_output: bool,
}

impl ClientConfig {
    pub fn new(server_url: String, video: String, json_output: bool) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            video,
            json_output,
        }
    }
}
