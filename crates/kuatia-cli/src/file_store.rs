//! File-backed configuration store: one JSON document per taxpayer under
//! the state directory. Any failure to read, parse, or write surfaces as
//! a configuration-retrieval error; a corrupt state file is never treated
//! as an empty cache.

use std::path::{Path, PathBuf};

use kuatia_core::{AgentError, CacheEntry, IssuerConfiguration, Ruc};

use kuatia_agent::ConfigStore;

/// Durable [`ConfigStore`] writing `config-<ruc>.json` files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, ruc: &Ruc) -> PathBuf {
        self.dir.join(format!("config-{}.json", ruc.as_str()))
    }

    fn retrieval_error(path: &Path, action: &str, err: impl std::fmt::Display) -> AgentError {
        AgentError::ConfigurationRetrieval {
            detail: format!("{action} {}: {err}", path.display()),
        }
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self, ruc: &Ruc) -> Result<Option<CacheEntry<IssuerConfiguration>>, AgentError> {
        let path = self.path_for(ruc);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::retrieval_error(&path, "reading", err)),
        };
        let entry = serde_json::from_str(&raw)
            .map_err(|err| Self::retrieval_error(&path, "parsing", err))?;
        Ok(Some(entry))
    }

    fn save(&self, ruc: &Ruc, entry: &CacheEntry<IssuerConfiguration>) -> Result<(), AgentError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| Self::retrieval_error(&self.dir, "creating state directory", err))?;
        let path = self.path_for(ruc);
        let raw = serde_json::to_vec_pretty(entry)
            .map_err(|err| Self::retrieval_error(&path, "serializing", err))?;
        std::fs::write(&path, raw).map_err(|err| Self::retrieval_error(&path, "writing", err))
    }

    fn delete(&self, ruc: &Ruc) -> Result<bool, AgentError> {
        let path = self.path_for(ruc);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Self::retrieval_error(&path, "deleting", err)),
        }
    }
}
