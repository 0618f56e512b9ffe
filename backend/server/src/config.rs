use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr};

use registry::credentials::DEFAULT_ITERATIONS;
use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEV_SECRET: &str = "dev-secret-key-change-this";

pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub public_dir: PathBuf,
    pub production: bool,
    pub auth_secret: String,
    pub password_iterations: u32,
    pub reset_password: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let production = try_load::<String>("APP_ENV", "development")? == "production";

        Ok(Self {
            port: try_load("RUST_PORT", "3000")?,
            data_dir: try_load("DATA_DIR", "data")?,
            public_dir: try_load("PUBLIC_DIR", "public")?,
            production,
            auth_secret: load_secret("AUTH_SECRET", production)?,
            password_iterations: try_load("PASSWORD_ITERATIONS", &DEFAULT_ITERATIONS.to_string())?,
            reset_password: try_load("RESET_PASSWORD", "Dhaka@2025")?,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

/// Environment first, then the docker secret file. Only development may fall back
/// to [`DEV_SECRET`].
fn load_secret(key: &str, production: bool) -> Result<String, ConfigError> {
    if let Some(secret) = var(key).or_else(|| read_secret(key)) {
        return Ok(secret);
    }

    if production {
        return Err(ConfigError::MissingSecret(key.to_string()));
    }

    warn!("{key} not configured, signing sessions with the INSECURE development secret");

    Ok(DEV_SECRET.to_string())
}
