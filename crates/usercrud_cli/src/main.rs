//! Console entry point for the user store.
//!
//! # Responsibility
//! - Own the process lifecycle: logging, connection factory, shutdown.
//! - Hand a ready `UserService` to the interactive menu.
//!
//! # Invariants
//! - Failing to open or probe the store is the only fatal error.

mod args;
mod menu;

use anyhow::{anyhow, Context, Result};
use args::Args;
use clap::Parser;
use log::info;
use menu::{EditorSource, Menu};
use usercrud_core::{
    default_log_level, init_logging, open_factory, SqliteUserRepository, UserService,
};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, args.log_dir()?)
        .map_err(|err| anyhow!("failed to initialize logging: {err}"))?;

    let factory = open_factory(&args.store_config()).context("failed to open the user store")?;
    let service = UserService::new(SqliteUserRepository::new(factory.clone()));

    let existing = service
        .get_all_users()
        .context("user store is not reachable")?;
    info!(
        "event=cli_start module=cli status=ok mode={} users={}",
        factory.location().mode(),
        existing.len()
    );

    let result = EditorSource::new()
        .and_then(|input| Menu::new(&service, input, std::io::stdout()).run());

    drop(service);
    factory.shutdown();
    info!("event=cli_exit module=cli status={}", if result.is_ok() { "ok" } else { "error" });
    result
}
