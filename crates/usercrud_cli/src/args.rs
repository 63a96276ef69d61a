//! Command-line and environment configuration.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use usercrud_core::StoreConfig;

#[derive(Debug, Parser)]
#[command(name = "usercrud", version, about = "Console front end for the user store")]
pub struct Args {
    #[arg(
        long,
        env = "USERCRUD_DB",
        default_value = "usercrud.db",
        help = "SQLite database file"
    )]
    pub db: PathBuf,

    #[arg(
        long,
        env = "USERCRUD_IN_MEMORY",
        help = "Use a throwaway in-memory database instead of --db"
    )]
    pub in_memory: bool,

    #[arg(
        long,
        env = "USERCRUD_POOL_SIZE",
        default_value_t = 4,
        help = "Maximum pooled database connections"
    )]
    pub pool_size: u32,

    #[arg(
        long,
        env = "USERCRUD_LOG_LEVEL",
        help = "trace|debug|info|warn|error (default depends on build mode)"
    )]
    pub log_level: Option<String>,

    #[arg(
        long,
        env = "USERCRUD_LOG_DIR",
        help = "Log directory (default: ./logs)"
    )]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    /// Store settings derived from the flags.
    pub fn store_config(&self) -> StoreConfig {
        if self.in_memory {
            StoreConfig::in_memory()
        } else {
            StoreConfig::file(&self.db).with_pool_size(self.pool_size)
        }
    }

    /// Absolute log directory; relative values resolve against the cwd.
    pub fn log_dir(&self) -> Result<PathBuf> {
        let dir = self
            .log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("logs"));
        if dir.is_absolute() {
            Ok(dir)
        } else {
            Ok(std::env::current_dir()?.join(dir))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;
    use usercrud_core::StoreLocation;

    #[test]
    fn in_memory_flag_overrides_db_path() {
        let args = Args::try_parse_from(["usercrud", "--db", "x.db", "--in-memory"]).unwrap();
        assert_eq!(args.store_config().location, StoreLocation::Memory);
    }

    #[test]
    fn relative_log_dir_becomes_absolute() {
        let args = Args::try_parse_from(["usercrud", "--log-dir", "var/log"]).unwrap();
        let dir = args.log_dir().unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with("var/log"));
    }
}
