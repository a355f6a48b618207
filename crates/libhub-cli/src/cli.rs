use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use libhub_config::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE, value_hint = ValueHint::FilePath)]
    pub config_file: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize every library listed in the registry file
    Sync {
        /// Registry data file
        #[arg(default_value = "./repos.txt", value_hint = ValueHint::FilePath)]
        registry_file: PathBuf,
    },

    /// Modify a library in the catalog
    #[command(arg_required_else_help = true)]
    Modify {
        /// Library to modify
        #[arg(required = true)]
        library_name: String,

        /// New repository URL
        #[arg(long)]
        repo_url: Option<String>,

        /// New comma separated list of types
        #[arg(long)]
        types: Option<String>,
    },

    /// Remove libraries or single releases from the catalog
    #[command(arg_required_else_help = true)]
    Remove {
        /// Libraries to remove, as NAME or NAME@VERSION
        #[arg(required = true, value_name = "LIBRARY_NAME[@VERSION]")]
        references: Vec<String>,
    },

    /// Validate a registry data file
    #[command(arg_required_else_help = true)]
    CheckRegistry {
        /// Registry data file
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}
