use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use git_switch::{
    AppError, NewProfile, ProfileManager, Settings,
    cli::{Cli, Commands},
    commands::{
        add_profile, list_all_profiles, remove_profile, show_current_user, switch_profile,
        test_all_profiles, test_profile, update_remote,
    },
    menu::run_menu,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            ExitCode::FAILURE
        }
    }
}

/// Logs to stderr; `RUST_LOG` wins over the verbose flag
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<(), AppError> {
    let mut settings = Settings::from_env()?;
    let no_probe = matches!(
        cli.command,
        Some(Commands::Add { no_probe: true, .. }) | Some(Commands::Switch { no_probe: true, .. })
    );
    if no_probe {
        settings.probe_enabled = false;
    }
    tracing::debug!(?settings, "resolved settings");
    let manager = ProfileManager::new(settings);

    match cli.command {
        Some(Commands::Add { alias, user_name, user_email, passphrase, switch, .. }) => {
            let request = NewProfile {
                alias,
                user_name,
                user_email,
                passphrase: None,
            };
            add_profile(&manager, request, passphrase, switch)
        }
        Some(Commands::Switch { alias, .. }) => switch_profile(&manager, &alias),
        Some(Commands::Remove { alias, yes }) => remove_profile(&manager, &alias, yes),
        Some(Commands::Current) => show_current_user(&manager),
        Some(Commands::List) => list_all_profiles(&manager),
        Some(Commands::Test { all: true, .. }) => test_all_profiles(&manager),
        Some(Commands::Test { alias: Some(alias), .. }) => test_profile(&manager, &alias),
        Some(Commands::Test { alias: None, .. }) => {
            Err(AppError::Validation("give a profile alias or --all".to_string()))
        }
        Some(Commands::Remote) => update_remote(&manager),
        None => run_menu(&manager),
    }
}
