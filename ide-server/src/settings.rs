//! Server settings: listen address plus the `[exec]` table.

use ide_exec::ExecConfig;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use crate::ServerError;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub addr: SocketAddr,
    pub exec: ExecConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            exec: ExecConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self, ServerError> {
        let settings: Settings =
            toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        settings.exec.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }
}
