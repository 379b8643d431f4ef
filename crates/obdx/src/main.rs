mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use obdx_core::{RemoteStore, Scheduler};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't touch the store
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "obdx", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            // `reconcile --watch --repair` repairs from the background task too.
            let watch_repair = matches!(cmd, Command::Reconcile(ref a) if a.watch && a.repair);
            let scheduler = build_scheduler(&cli.global, watch_repair)?;

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &scheduler, &cli.global).await
        }
    }
}

/// Connect to the store named by the active profile (or by flags alone)
/// and wrap it in a scheduler carrying the file's `[scheduler]` and
/// `[pricing]` settings.
fn build_scheduler(
    global: &cli::GlobalOpts,
    watch_repair: bool,
) -> Result<Scheduler<RemoteStore>, CliError> {
    let cfg = config::load_config()?;
    let profile_name = config::active_profile_name(global, &cfg);

    let store_config = match cfg.profiles.get(&profile_name) {
        Some(profile) => config::resolve_profile(profile, &profile_name, global)?,
        None if global.profile.is_some() && global.url.is_none() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: config::available_profiles(&cfg),
            });
        }
        None => config::from_flags(global, profile_name)?,
    };

    let mut scheduler_config = cfg.scheduler_config()?;
    scheduler_config.reconcile_repair |= watch_repair;

    let store = store_config.connect()?;
    Ok(Scheduler::new(store, scheduler_config))
}
