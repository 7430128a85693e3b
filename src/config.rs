//! Data directory resolution.

use crate::csv_store;
use crate::error::Result;
use crate::store::MemoryStore;
use std::path::PathBuf;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "POKER_LEDGER_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Command-line value first, then the environment, then the working directory.
    pub fn from_cli_or_env(cli_arg: Option<PathBuf>) -> Self {
        let env = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        Self::resolve(cli_arg, env)
    }

    fn resolve(cli_arg: Option<PathBuf>, env: Option<PathBuf>) -> Self {
        let data_dir = cli_arg
            .or(env)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { data_dir }
    }

    pub fn open(&self) -> Result<MemoryStore> {
        csv_store::load_dir(&self.data_dir)
    }

    pub fn save(&self, store: &MemoryStore) -> Result<()> {
        csv_store::save_dir(store, &self.data_dir)
    }
}
