use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use super::{LookupCache, Resolve};

/// Label used when neither port maps to a known service.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Port → service cache, backed by a [`PortTable`] unless a test swaps the
/// resolver.
pub type ServiceCache<R = PortTable> = LookupCache<u16, String, R>;

#[derive(Debug, Error)]
pub enum PortTableError {
    #[error("cannot read port table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse port table: {0}")]
    Json(#[from] serde_json::Error),
}

/// Static port → service name table.
///
/// The on-disk form is a JSON object keyed by decimal port numbers:
/// `{"22": "ssh", "80": "http"}`. Keys that are not valid `u16` ports are
/// skipped with a warning.
#[derive(Debug, Clone, Default)]
pub struct PortTable {
    services: HashMap<u16, String>,
}

impl PortTable {
    pub fn load(path: &Path) -> Result<Self, PortTableError> {
        let json = fs::read_to_string(path).map_err(|source| PortTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        info!(path = %path.display(), entries = table.len(), "loaded port mappings");
        Ok(table)
    }

    /// Load the table, degrading to an empty one when the file is missing or
    /// malformed. Every port then resolves to [`UNKNOWN_SERVICE`].
    pub fn load_or_empty(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            warn!(%err, "continuing without port mappings");
            Self::default()
        })
    }

    pub fn from_json(json: &str) -> Result<Self, PortTableError> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let mut services = HashMap::with_capacity(raw.len());
        for (port, service) in raw {
            match port.trim().parse::<u16>() {
                Ok(port) => {
                    services.insert(port, service);
                }
                Err(err) => warn!(port = %port, %err, "skipping invalid port number"),
            }
        }
        Ok(Self { services })
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl FromIterator<(u16, String)> for PortTable {
    fn from_iter<I: IntoIterator<Item = (u16, String)>>(iter: I) -> Self {
        Self {
            services: iter.into_iter().collect(),
        }
    }
}

impl Resolve<u16, String> for PortTable {
    fn resolve(&mut self, port: &u16) -> String {
        self.services
            .get(port)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
    }
}
