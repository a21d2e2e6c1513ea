use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use lattice_core::identity::SecretIdentity;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

const LISTEN_DEFAULT: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 9993);
const DB_PATH_DEFAULT: &str = "controller.db";

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

/// On-disk controller configuration.
///
/// A fresh config (including a newly generated controller identity) is
/// written on first start, so a bare `lattice-controller run` works out of
/// the box.
#[derive(Deserialize, Serialize)]
pub struct ControllerConfig {
    pub identity: SecretIdentity,
    #[serde(default = "default_db_path")]
    pub db: String,
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

fn default_db_path() -> String {
    DB_PATH_DEFAULT.to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::V4(LISTEN_DEFAULT)
}

impl ControllerConfig {
    pub fn new(identity: SecretIdentity) -> Self {
        Self {
            identity,
            db: default_db_path(),
            listen: default_listen(),
        }
    }

    pub fn load_or_generate(path: &str) -> Result<Self, Error> {
        let config = if std::path::Path::new(path).exists() {
            trace!("Config file exists, loading from {}", path);
            toml::from_str(&fs::read_to_string(path)?)?
        } else {
            trace!("Config file does not exist, generating new one");
            let config = ControllerConfig::new(SecretIdentity::generate());
            let config_content = toml::to_string_pretty(&config)?;

            // Create empty file first so permissions are tight before the
            // identity is written.
            fs::write(path, "")?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(path)?.permissions();
                perms.set_mode(0o600);
                fs::set_permissions(path, perms)?;
            }

            fs::write(path, &config_content)?;

            config
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("controller.toml");
        let path = path.to_str().unwrap();

        let generated = ControllerConfig::load_or_generate(path).unwrap();
        let reloaded = ControllerConfig::load_or_generate(path).unwrap();

        assert_eq!(
            generated.identity.public(),
            reloaded.identity.public()
        );
        assert_eq!(reloaded.db, DB_PATH_DEFAULT);
        assert_eq!(reloaded.listen, SocketAddr::V4(LISTEN_DEFAULT));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let id = SecretIdentity::generate();
        let toml = format!("identity = \"{id}\"\n");
        let config: ControllerConfig = toml::from_str(&toml).unwrap();
        assert_eq!(config.db, DB_PATH_DEFAULT);
        assert_eq!(config.listen, SocketAddr::V4(LISTEN_DEFAULT));
    }
}
