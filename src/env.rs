use std::path::Path;

use tracing::{info, warn};

const COMMON_ENV: &str = "config/common.env";
const SECRETS_ENV: &str = ".secrets.env";

/// Outcome of loading one dotenv file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    pub path: &'static str,
    pub loaded: bool,
}

impl EnvFile {
    pub fn log(&self) {
        if self.loaded {
            info!("Loaded environment from: {}", self.path);
        } else {
            warn!("Environment file {} not found, skipping", self.path);
        }
    }
}

/// Loads the dotenv files for the active profile into the process environment.
///
/// Later files override earlier ones, so secrets win over profile values and
/// profile values win over the common file.
pub fn load_environment() -> Result<Vec<EnvFile>, dotenvy::Error> {
    let profile_env = if is_production() {
        "config/prod.env"
    } else {
        "config/dev.env"
    };

    load_env_files(&[COMMON_ENV, profile_env, SECRETS_ENV])
}

fn is_production() -> bool {
    dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string()) == "production"
}

fn load_env_files(paths: &[&'static str]) -> Result<Vec<EnvFile>, dotenvy::Error> {
    paths
        .iter()
        .map(|&path| -> Result<EnvFile, dotenvy::Error> {
            let loaded = Path::new(path).exists();
            if loaded {
                dotenvy::from_filename_override(path)?;
            }
            Ok(EnvFile { path, loaded })
        })
        .collect()
}
