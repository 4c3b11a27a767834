//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local development.

use std::env;
use std::net::IpAddr;
use std::str::FromStr;

/// Which identity service implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityBackend {
    /// Firebase Authentication (Identity Toolkit REST API)
    Firebase,
    /// In-process accounts, lost on exit
    Memory,
}

impl FromStr for IdentityBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firebase" => Ok(IdentityBackend::Firebase),
            "memory" => Ok(IdentityBackend::Memory),
            _ => Err(ConfigError::Invalid("IDENTITY_BACKEND", s.to_string())),
        }
    }
}

/// Which document store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase Web API key (required for the Firebase identity backend)
    pub firebase_api_key: Option<String>,
    /// GCP project ID
    pub gcp_project_id: String,
    pub identity_backend: IdentityBackend,
    pub store_backend: StoreBackend,
    /// Listen address; loopback unless overridden
    pub bind_addr: IpAddr,
    /// Server port
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// `host:port` of the Firebase Auth emulator, if used
    pub auth_emulator_host: Option<String>,
}

impl Default for Config {
    /// Default config for testing only (offline backends).
    fn default() -> Self {
        Self {
            firebase_api_key: None,
            gcp_project_id: "test-project".to_string(),
            identity_backend: IdentityBackend::Memory,
            store_backend: StoreBackend::Memory,
            bind_addr: IpAddr::from([127, 0, 0, 1]),
            port: 8080,
            frontend_url: "http://localhost:3000".to_string(),
            auth_emulator_host: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let identity_backend: IdentityBackend = env::var("IDENTITY_BACKEND")
            .unwrap_or_else(|_| "firebase".to_string())
            .parse()?;
        let store_backend: StoreBackend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "firestore".to_string())
            .parse()?;

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("BIND_ADDR", v))?,
            Err(_) => IpAddr::from([127, 0, 0, 1]),
        };
        let port = match env::var("PORT") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", v))?,
            Err(_) => 8080,
        };

        let config = Self {
            firebase_api_key: non_empty_var("FIREBASE_API_KEY"),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            identity_backend,
            store_backend,
            bind_addr,
            port,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            auth_emulator_host: non_empty_var("FIREBASE_AUTH_EMULATOR_HOST"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every setting the selected backends need is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity_backend == IdentityBackend::Firebase {
            self.require_firebase_api_key()?;
        }
        Ok(())
    }

    /// Firebase Web API key, required by the Firebase identity backend.
    pub fn require_firebase_api_key(&self) -> Result<&str, ConfigError> {
        self.firebase_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("FIREBASE_API_KEY"))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("IDENTITY_BACKEND", "memory");
        env::set_var("STORE_BACKEND", "Memory");
        env::set_var("PORT", "9090");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.identity_backend, IdentityBackend::Memory);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.port, 9090);
        assert!(config.bind_addr.is_loopback());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("firebase".parse::<IdentityBackend>().unwrap(), IdentityBackend::Firebase);
        assert_eq!(" FIRESTORE ".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert!(matches!(
            "sqlite".parse::<StoreBackend>(),
            Err(ConfigError::Invalid("STORE_BACKEND", _))
        ));
    }

    #[test]
    fn test_firebase_backend_requires_api_key() {
        let mut config = Config {
            identity_backend: IdentityBackend::Firebase,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("FIREBASE_API_KEY"))
        ));

        config.firebase_api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.require_firebase_api_key().unwrap(), "key");

        // The offline backend needs no key.
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_is_offline() {
        let config = Config::default();
        assert_eq!(config.identity_backend, IdentityBackend::Memory);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.firebase_api_key.is_none());
    }
}
