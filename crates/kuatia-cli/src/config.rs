//! Agent configuration loaded from a YAML file.
//!
//! The secret key is deliberately not part of the file: it is read from
//! the `KUATIA_SECRET_KEY` environment variable at startup so it never
//! lands on disk next to the endpoint configuration.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use kuatia_core::{Credentials, EmissionMode, Ruc, SecretKey};
use kuatia_sifen_client::SifenEndpoint;

/// Environment variable holding the taxpayer's secret key.
pub const SECRET_KEY_ENV: &str = "KUATIA_SECRET_KEY";

/// Remote service section of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the SIFEN API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Top-level agent configuration.
///
/// ```yaml
/// service:
///   base_url: https://sifen.set.gov.py/api/v1
///   timeout_secs: 30
/// ruc: "5452"
/// emission_mode: Normal
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Remote service endpoint.
    pub service: ServiceConfig,
    /// Taxpayer the agent operates for.
    pub ruc: Ruc,
    /// Emission mode tag.
    #[serde(default)]
    pub emission_mode: EmissionMode,
}

impl AgentConfig {
    /// Load and validate the configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading agent configuration {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing agent configuration {}", path.display()))?;
        Ok(config)
    }

    /// The remote endpoint described by this configuration.
    pub fn endpoint(&self) -> SifenEndpoint {
        let mut endpoint = SifenEndpoint::new(self.service.base_url.clone());
        endpoint.timeout_secs = self.service.timeout_secs;
        endpoint
    }

    /// Assemble credentials, reading the secret key from the environment.
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        let secret = std::env::var(SECRET_KEY_ENV)
            .with_context(|| format!("{SECRET_KEY_ENV} must hold the taxpayer secret key"))?;
        Ok(Credentials {
            ruc: self.ruc.clone(),
            secret_key: SecretKey::new(secret),
            emission_mode: self.emission_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_config() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "service:\n  base_url: https://sifen.set.gov.py/api/v1\nruc: \"5452\"\n"
        )
        .expect("write config");

        let config = AgentConfig::load(file.path()).expect("should load");
        assert_eq!(config.ruc.as_str(), "5452");
        assert_eq!(config.service.timeout_secs, 30, "default timeout");
        assert_eq!(config.emission_mode, EmissionMode::Normal, "default mode");
    }

    #[test]
    fn rejects_malformed_ruc() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "service:\n  base_url: https://sifen.set.gov.py/api/v1\nruc: \"54-52\"\n"
        )
        .expect("write config");

        assert!(AgentConfig::load(file.path()).is_err());
    }

    #[test]
    fn endpoint_carries_timeout() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "service:\n  base_url: https://example.test/api\n  timeout_secs: 5\nruc: \"5452\"\n"
        )
        .expect("write config");

        let config = AgentConfig::load(file.path()).expect("should load");
        assert_eq!(config.endpoint().timeout_secs, 5);
    }
}
