mod atomic;
mod cli;
mod commands;
mod password;
mod profile;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use password::InteractivePrompt;
use profile::FsProfileResolver;
use satchel_core::env::Environment;
use satchel_core::primitives::wipe::disable_core_dumps;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SATCHEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_file(true).with_line_number(true).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already set");
    }
}

fn main() -> Result<()> {
    init_tracing();

    if let Err(e) = disable_core_dumps() {
        eprintln!("warning: could not disable core dumps: {e}");
    }

    let cli = Cli::parse();
    let resolver = FsProfileResolver::new()?;
    let prompt = InteractivePrompt::new();

    let env = Environment::open(&cli.profile, &resolver, Some(&prompt))?;

    match cli.command {
        Command::Identity { action } => commands::identity::run(action, &env, &resolver, &prompt),
        Command::Counterparty { action } => commands::counterparty::run(action, &env, &resolver, &prompt),
        Command::Bundle { action } => commands::bundle::run(action, &env),
        Command::Symfile { action } => commands::symfile::run(action, &prompt),
    }
}
