use crate::ai::groq;
use crate::search;
use std::env;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set (check your .env file)")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide settings for the relay server.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    pub groq_api_key: String,
    pub brave_api_key: String,
    pub groq_api_base: String,
    pub search_endpoint: String,
    pub host: String,
    pub port: u16,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`. Both API keys are required; blank
    /// values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| var(name).ok_or(ConfigError::MissingVar(name));

        let groq_api_key = required("GROQ_API_KEY")?;
        let brave_api_key = required("BRAVE_API_KEY")?;

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            groq_api_key,
            brave_api_key,
            groq_api_base: var("GROQ_API_BASE")
                .unwrap_or_else(|| groq::DEFAULT_API_BASE.to_string()),
            search_endpoint: var("BRAVE_SEARCH_ENDPOINT")
                .unwrap_or_else(|| search::DEFAULT_ENDPOINT.to_string()),
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
