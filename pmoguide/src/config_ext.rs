//! Guide settings in pmoconfig
//!
//! [`GuideConfigExt`] adds the feed and cache settings of this crate to
//! `pmoconfig::Config`, under the `guide` key:
//!
//! ```yaml
//! guide:
//!   base_url: https://data2.schedulesdirect.org
//!   api_version: "20141201"
//!   user_agent: pmoguide/0.1
//!   request_timeout_secs: 60
//!   token: ~
//!   cache:
//!     enabled: true
//!     max_entries: 50000
//!     ttl_secs: 21600
//! ```
//!
//! Getters persist the default value when the key is missing or invalid.
//!
//! # Example
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmoguide::GuideConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! let transport = config.guide_http_transport()?;
//! let orchestrator = config.guide_orchestrator(transport)?;
//! let lineups = orchestrator.lineups()?;
//! println!("{} lineups", lineups.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::{Number, Value};

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL, EntityCache};
use crate::decode::Decoder;
use crate::orchestrator::FetchOrchestrator;
use crate::transport::Transport;
use crate::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};

#[cfg(feature = "http")]
use crate::http::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_USER_AGENT, HttpTransport};

#[cfg(not(feature = "http"))]
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
#[cfg(not(feature = "http"))]
const DEFAULT_USER_AGENT: &str = concat!("pmoguide/", env!("CARGO_PKG_VERSION"));

const BASE_URL: &[&str] = &["guide", "base_url"];
const API_VERSION: &[&str] = &["guide", "api_version"];
const USER_AGENT: &[&str] = &["guide", "user_agent"];
const REQUEST_TIMEOUT: &[&str] = &["guide", "request_timeout_secs"];
const TOKEN: &[&str] = &["guide", "token"];
const CACHE_ENABLED: &[&str] = &["guide", "cache", "enabled"];
const CACHE_MAX_ENTRIES: &[&str] = &["guide", "cache", "max_entries"];
const CACHE_TTL: &[&str] = &["guide", "cache", "ttl_secs"];

/// Extension trait managing the guide settings of `pmoconfig::Config`
pub trait GuideConfigExt {
    // ========================================================================
    // Feed
    // ========================================================================

    fn get_guide_base_url(&self) -> Result<String>;
    fn set_guide_base_url(&self, url: &str) -> Result<()>;

    fn get_guide_api_version(&self) -> Result<String>;
    fn set_guide_api_version(&self, version: &str) -> Result<()>;

    fn get_guide_user_agent(&self) -> Result<String>;
    fn set_guide_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Global timeout of one upstream exchange, in seconds
    fn get_guide_request_timeout_secs(&self) -> Result<u64>;
    fn set_guide_request_timeout_secs(&self, secs: u64) -> Result<()>;

    /// Session token, if one was stored
    fn get_guide_token(&self) -> Result<Option<String>>;
    fn set_guide_token(&self, token: Option<&str>) -> Result<()>;

    // ========================================================================
    // Cache
    // ========================================================================

    /// Whether orchestrators read from the entity cache
    fn get_guide_cache_enabled(&self) -> Result<bool>;
    fn set_guide_cache_enabled(&self, enabled: bool) -> Result<()>;

    fn get_guide_cache_max_entries(&self) -> Result<u64>;
    fn set_guide_cache_max_entries(&self, max_entries: u64) -> Result<()>;

    /// Time to live of cached entities, in seconds; 0 disables expiry
    fn get_guide_cache_ttl_secs(&self) -> Result<u64>;
    fn set_guide_cache_ttl_secs(&self, ttl_secs: u64) -> Result<()>;

    // ========================================================================
    // Factories
    // ========================================================================

    /// Decoder resolving artwork against the configured feed
    fn guide_decoder(&self) -> Result<Decoder> {
        Ok(Decoder::new(
            &self.get_guide_base_url()?,
            &self.get_guide_api_version()?,
        ))
    }

    /// Entity cache sized and timed from the configuration
    fn guide_entity_cache(&self) -> Result<EntityCache> {
        let ttl = match self.get_guide_cache_ttl_secs()? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(EntityCache::with_settings(
            self.get_guide_cache_max_entries()?,
            ttl,
        ))
    }

    /// HTTP transport for the configured feed
    #[cfg(feature = "http")]
    fn guide_http_transport(&self) -> Result<HttpTransport> {
        let mut builder = HttpTransport::builder()
            .base_url(self.get_guide_base_url()?)
            .api_version(self.get_guide_api_version()?)
            .user_agent(self.get_guide_user_agent()?)
            .timeout(Duration::from_secs(self.get_guide_request_timeout_secs()?));
        if let Some(token) = self.get_guide_token()? {
            builder = builder.token(token);
        }
        Ok(builder.build())
    }

    /// Orchestrator over `transport` with a fresh configured cache
    fn guide_orchestrator<T: Transport>(&self, transport: T) -> Result<FetchOrchestrator<T>> {
        Ok(FetchOrchestrator::builder(transport)
            .cache(Arc::new(self.guide_entity_cache()?))
            .decoder(self.guide_decoder()?)
            .use_cache(self.get_guide_cache_enabled()?)
            .build())
    }
}

impl GuideConfigExt for Config {
    fn get_guide_base_url(&self) -> Result<String> {
        get_string(self, BASE_URL, DEFAULT_BASE_URL)
    }

    fn set_guide_base_url(&self, url: &str) -> Result<()> {
        self.set_value(BASE_URL, Value::String(url.to_string()))
    }

    fn get_guide_api_version(&self) -> Result<String> {
        get_string(self, API_VERSION, DEFAULT_API_VERSION)
    }

    fn set_guide_api_version(&self, version: &str) -> Result<()> {
        self.set_value(API_VERSION, Value::String(version.to_string()))
    }

    fn get_guide_user_agent(&self) -> Result<String> {
        get_string(self, USER_AGENT, DEFAULT_USER_AGENT)
    }

    fn set_guide_user_agent(&self, user_agent: &str) -> Result<()> {
        self.set_value(USER_AGENT, Value::String(user_agent.to_string()))
    }

    fn get_guide_request_timeout_secs(&self) -> Result<u64> {
        get_u64(self, REQUEST_TIMEOUT, DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    fn set_guide_request_timeout_secs(&self, secs: u64) -> Result<()> {
        self.set_value(REQUEST_TIMEOUT, Value::Number(Number::from(secs)))
    }

    fn get_guide_token(&self) -> Result<Option<String>> {
        match self.get_value(TOKEN) {
            Ok(Value::String(token)) if !token.is_empty() => Ok(Some(token)),
            _ => Ok(None),
        }
    }

    fn set_guide_token(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) => self.set_value(TOKEN, Value::String(token.to_string())),
            None => self.remove_value(TOKEN),
        }
    }

    fn get_guide_cache_enabled(&self) -> Result<bool> {
        match self.get_value(CACHE_ENABLED) {
            Ok(Value::Bool(b)) => Ok(b),
            _ => {
                // Default: enabled
                self.set_guide_cache_enabled(true)?;
                Ok(true)
            }
        }
    }

    fn set_guide_cache_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(CACHE_ENABLED, Value::Bool(enabled))
    }

    fn get_guide_cache_max_entries(&self) -> Result<u64> {
        get_u64(self, CACHE_MAX_ENTRIES, DEFAULT_MAX_ENTRIES)
    }

    fn set_guide_cache_max_entries(&self, max_entries: u64) -> Result<()> {
        self.set_value(CACHE_MAX_ENTRIES, Value::Number(Number::from(max_entries)))
    }

    fn get_guide_cache_ttl_secs(&self) -> Result<u64> {
        get_u64(self, CACHE_TTL, DEFAULT_TTL.as_secs())
    }

    fn set_guide_cache_ttl_secs(&self, ttl_secs: u64) -> Result<()> {
        self.set_value(CACHE_TTL, Value::Number(Number::from(ttl_secs)))
    }
}

/// Reads a string setting; numbers are accepted (`api_version: 20141201`)
fn get_string(config: &Config, path: &[&str], default: &str) -> Result<String> {
    match config.get_value(path) {
        Ok(Value::String(s)) if !s.is_empty() => Ok(s),
        Ok(Value::Number(n)) => Ok(n.to_string()),
        _ => {
            config.set_value(path, Value::String(default.to_string()))?;
            Ok(default.to_string())
        }
    }
}

fn get_u64(config: &Config, path: &[&str], default: u64) -> Result<u64> {
    match config.get_value(path) {
        Ok(Value::Number(n)) if n.as_u64().is_some() => Ok(n.as_u64().unwrap_or(default)),
        _ => {
            // Not set or invalid, use default and persist
            config.set_value(path, Value::Number(Number::from(default)))?;
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.get_guide_base_url().unwrap(), DEFAULT_BASE_URL);
        assert_eq!(config.get_guide_api_version().unwrap(), "20141201");
        assert_eq!(config.get_guide_request_timeout_secs().unwrap(), 60);
        assert!(config.get_guide_cache_enabled().unwrap());
        assert_eq!(config.get_guide_cache_max_entries().unwrap(), 50_000);
        assert_eq!(config.get_guide_cache_ttl_secs().unwrap(), 21_600);
        assert_eq!(config.get_guide_token().unwrap(), None);
    }

    #[test]
    fn test_invalid_values_fall_back_and_persist() {
        let config = Config::from_yaml_str(
            "guide:\n  api_version: 20141201\n  request_timeout_secs: soon\n  cache:\n    enabled: maybe\n",
        )
        .unwrap();
        assert_eq!(config.get_guide_api_version().unwrap(), "20141201");
        assert_eq!(config.get_guide_request_timeout_secs().unwrap(), 60);
        assert!(matches!(
            config.get_value(REQUEST_TIMEOUT).unwrap(),
            Value::Number(_)
        ));
        assert!(config.get_guide_cache_enabled().unwrap());
        assert_eq!(config.get_value(CACHE_ENABLED).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_token_round_trip() {
        let config = Config::from_yaml_str("").unwrap();
        config.set_guide_token(Some("abc")).unwrap();
        assert_eq!(config.get_guide_token().unwrap().as_deref(), Some("abc"));
        config.set_guide_token(None).unwrap();
        assert_eq!(config.get_guide_token().unwrap(), None);
    }

    #[test]
    fn test_factories() {
        let config = Config::from_yaml_str(
            "guide:\n  base_url: https://guide.example.org/\n  cache:\n    enabled: false\n    ttl_secs: 0\n",
        )
        .unwrap();
        assert_eq!(
            config.guide_decoder().unwrap().image_base(),
            "https://guide.example.org/20141201"
        );
        assert_eq!(config.guide_entity_cache().unwrap().stats().total(), 0);
        assert!(!config.get_guide_cache_enabled().unwrap());
    }
}
