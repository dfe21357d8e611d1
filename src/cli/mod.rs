//! CLI argument definitions for Menuwright.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("MW_GIT_COMMIT"),
    ", built ",
    env!("MW_BUILD_TIMESTAMP"),
    ")"
);

/// Menuwright - build the menus, actions and profiles a file manager shows
/// in its context menu.
///
/// Items are addressed by slash-separated ID paths (`tools/term/p1`); a bare
/// ID finds the first item with that ID.
#[derive(Parser, Debug)]
#[command(name = "mw")]
#[command(author, version, long_version = LONG_VERSION, about = "Edit and import context-menu items", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store administration
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Show the item tree with modified/valid flags
    Show {
        /// Only show the subtree at this path
        path: Option<String>,
    },

    /// Menu commands
    Menu {
        #[command(subcommand)]
        command: MenuCommands,
    },

    /// Action commands
    Action {
        #[command(subcommand)]
        command: ActionCommands,
    },

    /// Profile commands
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Change one field of an item
    ///
    /// Fields: label, tooltip, icon, description, enabled, basenames,
    /// matchcase, mimetypes, schemes, folders, toolbar-label,
    /// target-selection, target-location, target-toolbar, path, parameters,
    /// working-dir, execution-mode. Lists are comma-separated.
    Set {
        /// Item path
        path: String,
        /// Field name
        field: String,
        /// New value (empty clears optional fields)
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Report the resulting flags without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove an item and everything below it
    Remove {
        /// Item path
        path: String,
    },

    /// Import items from a JSON file
    Import {
        /// File holding one item or an array of items
        file: PathBuf,

        /// What to do with an item whose ID already exists
        /// (ask, no-import, renumber, override)
        #[arg(long)]
        mode: Option<String>,

        /// Reuse the last conflict answer without asking
        #[arg(long, conflicts_with = "no_keep_choice")]
        keep_choice: bool,

        /// Ask again on every conflict
        #[arg(long)]
        no_keep_choice: bool,

        /// Report the decisions without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Export items as JSON
    Export {
        /// Only export the subtree at this path
        path: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Create the item store (keeps existing items)
    Init,
}

/// Options shared by the add subcommands
#[derive(clap::Args, Debug)]
pub struct PlacementArgs {
    /// Path of the parent menu (top level when omitted)
    #[arg(long)]
    pub parent: Option<String>,

    /// Item ID (generated from the label when omitted)
    #[arg(long)]
    pub id: Option<String>,
}

/// Menu subcommands
#[derive(Subcommand, Debug)]
pub enum MenuCommands {
    /// Add a menu
    Add {
        /// Menu label
        label: String,

        #[command(flatten)]
        placement: PlacementArgs,
    },
}

/// Action subcommands
#[derive(Subcommand, Debug)]
pub enum ActionCommands {
    /// Add an action, optionally with a first profile
    Add {
        /// Action label
        label: String,

        #[command(flatten)]
        placement: PlacementArgs,

        /// Command of the first profile
        #[arg(long)]
        path: Option<String>,

        /// Parameters of the first profile
        #[arg(long, requires = "path", allow_hyphen_values = true)]
        parameters: Option<String>,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add a profile to an action
    Add {
        /// Path of the owning action
        action: String,

        /// Profile label
        label: String,

        /// Command to run
        #[arg(long)]
        path: String,

        /// Command parameters
        #[arg(long, allow_hyphen_values = true)]
        parameters: Option<String>,

        /// Profile ID (generated from the label when omitted)
        #[arg(long)]
        id: Option<String>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved values and where they come from
    Show,

    /// Set a value in the store's config.kdl
    Set {
        /// Key (output-format, import-mode, keep-last-choice)
        key: String,
        /// Value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_with_dry_run() {
        let cli = Cli::parse_from(["mw", "-H", "set", "tools/term", "label", "Term", "--dry-run"]);
        assert!(cli.human_readable);
        let Commands::Set {
            path,
            field,
            value,
            dry_run,
        } = cli.command
        else {
            panic!("expected set");
        };
        assert_eq!((path.as_str(), field.as_str(), value.as_str()), ("tools/term", "label", "Term"));
        assert!(dry_run);
    }

    #[test]
    fn test_keep_choice_flags_conflict() {
        let result = Cli::try_parse_from(["mw", "import", "a.json", "--keep-choice", "--no-keep-choice"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_action_parameters_require_path() {
        assert!(Cli::try_parse_from(["mw", "action", "add", "Term", "--parameters", "-e"]).is_err());
        assert!(
            Cli::try_parse_from(["mw", "action", "add", "Term", "--path", "/usr/bin/xterm", "--parameters", "-e"])
                .is_ok()
        );
    }

    #[test]
    fn test_parameters_may_start_with_a_dash() {
        let cli = Cli::parse_from(["mw", "profile", "add", "term", "Kitty", "--path", "/usr/bin/kitty", "--parameters", "-e"]);
        let Commands::Profile {
            command: ProfileCommands::Add { parameters, .. },
        } = cli.command
        else {
            panic!("expected profile add");
        };
        assert_eq!(parameters.as_deref(), Some("-e"));

        let cli = Cli::parse_from(["mw", "set", "term/p1", "parameters", "-e", "--dry-run"]);
        let Commands::Set { value, dry_run, .. } = cli.command else {
            panic!("expected set");
        };
        assert_eq!(value, "-e");
        assert!(dry_run);
    }
}
