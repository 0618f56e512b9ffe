use std::sync::Arc;

use registry::{Credentials, RecordStore, Registry};

use super::{config::Config, session::Sessions};

pub struct AppState {
    pub config: Config,
    pub registry: Registry,
    pub sessions: Sessions,
    pub credentials: Credentials,
    /// Verified against when a login names no known user, so both failures
    /// cost one key derivation.
    pub decoy_hash: String,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let registry = Registry::new(RecordStore::new(&config.data_dir));
        let sessions = Sessions::new(&config.auth_secret);
        let credentials = Credentials::new(config.password_iterations);
        let decoy_hash = credentials.hash_password("decoy");

        Arc::new(Self {
            config,
            registry,
            sessions,
            credentials,
            decoy_hash,
        })
    }
}
