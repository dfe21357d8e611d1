//! Menuwright CLI - edit and import context-menu items.

use clap::Parser;
use menuwright::cli::{
    ActionCommands, Cli, Commands, ConfigCommands, MenuCommands, ProfileCommands, SystemCommands,
};
use menuwright::commands::{self, AddOptions, Output, PromptAsker};
use menuwright::config::{ConfigOverrides, OutputFormat};
use menuwright::import::ImportMode;
use std::io;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Log filter variable, e.g. `MW_LOG=menuwright=debug`.
const LOG_ENV: &str = "MW_LOG";

fn main() {
    init_logging();

    let cli = Cli::parse();

    let data_dir = match commands::default_data_dir() {
        Ok(dir) => dir,
        Err(e) => fail(&e, cli.human_readable),
    };
    let human = commands::output_format(&data_dir, cli.human_readable) == OutputFormat::Human;

    if let Err(e) = run_command(cli.command, &data_dir, human) {
        fail(&e, human);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .init();
}

fn fail(e: &menuwright::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

fn run_command(command: Commands, data_dir: &Path, human: bool) -> Result<(), menuwright::Error> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => output(&commands::system_init(data_dir)?, human),
        },

        Commands::Show { path } => output(&commands::show(data_dir, path.as_deref())?, human),

        Commands::Menu { command } => match command {
            MenuCommands::Add { label, placement } => {
                let options = AddOptions {
                    parent: placement.parent,
                    id: placement.id,
                };
                output(&commands::add_menu(data_dir, &label, &options)?, human)
            }
        },

        Commands::Action { command } => match command {
            ActionCommands::Add {
                label,
                placement,
                path,
                parameters,
            } => {
                let options = AddOptions {
                    parent: placement.parent,
                    id: placement.id,
                };
                let result = commands::add_action(
                    data_dir,
                    &label,
                    &options,
                    path.as_deref(),
                    parameters.as_deref(),
                )?;
                output(&result, human)
            }
        },

        Commands::Profile { command } => match command {
            ProfileCommands::Add {
                action,
                label,
                path,
                parameters,
                id,
            } => {
                let result = commands::add_profile(
                    data_dir,
                    &action,
                    &label,
                    &path,
                    parameters.as_deref(),
                    id.as_deref(),
                )?;
                output(&result, human)
            }
        },

        Commands::Set {
            path,
            field,
            value,
            dry_run,
        } => output(
            &commands::set_field(data_dir, &path, &field, &value, dry_run)?,
            human,
        ),

        Commands::Remove { path } => output(&commands::remove(data_dir, &path)?, human),

        Commands::Import {
            file,
            mode,
            keep_choice,
            no_keep_choice,
            dry_run,
        } => {
            let mut overrides = ConfigOverrides::new();
            if let Some(mode) = mode {
                let parsed = ImportMode::parse(&mode).ok_or_else(|| {
                    menuwright::Error::InvalidInput(format!("unknown import mode: {}", mode))
                })?;
                overrides = overrides.with_import_mode(parsed);
            }
            if keep_choice {
                overrides = overrides.with_keep_last_choice(true);
            } else if no_keep_choice {
                overrides = overrides.with_keep_last_choice(false);
            }

            let stdin = io::stdin();
            let asker = PromptAsker::new(stdin.lock(), io::stderr());
            output(
                &commands::import(data_dir, &file, &overrides, dry_run, asker)?,
                human,
            )
        }

        Commands::Export { path } => output(&commands::export(data_dir, path.as_deref())?, human),

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(
                &commands::config_show(data_dir, &ConfigOverrides::default())?,
                human,
            ),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(data_dir, &key, &value)?, human)
            }
        },
    }
    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
