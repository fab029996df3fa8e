use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::AuthorityError;

const ENV_PREFIX: &str = "AUTHORITY";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub policy: Policy,
    pub logging: Logging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// A single `.kdl` file or a directory of them. Default: policies
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            path: PathBuf::from("policies"),
        }
    }
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    /// Defaults, then the optional config file, then `AUTHORITY__*` environment variables.
    pub fn load(path: &str) -> Result<Self, AuthorityError> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix(path: &str, prefix: &str) -> Result<Self, AuthorityError> {
        let mut builder = config::Config::builder()
            .set_default(
                "policy.path",
                Policy::default().path.to_string_lossy().to_string(),
            )?
            .set_default("logging.filter", Logging::default().filter)?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: AUTHORITY__POLICY__PATH=/etc/authority, etc.
        builder = builder.add_source(config::Environment::with_prefix(prefix).separator("__"));

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;

        if s.policy.path.is_relative() {
            s.policy.path = std::env::current_dir()?.join(&s.policy.path);
        }

        Ok(s)
    }
}
