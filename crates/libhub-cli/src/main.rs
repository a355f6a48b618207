use std::process::ExitCode;

use clap::Parser;
use cli::{Args, Commands};
use libhub_config::config::Config;
use libhub_core::{
    operations::{modify_library, parse_types, remove_libraries, ModifyRequest},
    Result,
};
use libhub_registry::check_registry;
use logging::{log_level, setup_logging, use_color};
use nu_ansi_term::Color::Red;
use sync::sync_libraries;
use tracing::{debug, info};

mod cli;
mod logging;
mod sync;

fn handle_cli(args: &Args) -> Result<()> {
    if let Commands::CheckRegistry {
        file,
    } = &args.command
    {
        check_registry(file)?;
        info!("{} is a valid registry data file", file.display());
        return Ok(());
    }

    let config = Config::load(&args.config_file)?;
    debug!("loaded configuration from {}", args.config_file.display());

    match &args.command {
        Commands::Sync {
            registry_file,
        } => sync_libraries(&config, registry_file, log_level(args)),
        Commands::Modify {
            library_name,
            repo_url,
            types,
        } => {
            let request = ModifyRequest {
                library: library_name.clone(),
                repo_url: repo_url.clone(),
                types: types.as_deref().map(parse_types),
            };
            modify_library(&config, &request)
        }
        Commands::Remove {
            references,
        } => remove_libraries(&config, references.as_slice()),
        Commands::CheckRegistry {
            ..
        } => Ok(()),
    }
}

fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let args = Args::parse();
    setup_logging(&args);

    match handle_cli(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = err.to_string().replace('\n', " ");
            debug!("{:?}", miette::Report::new(err));

            let prefix = if use_color(&args) {
                Red.bold().paint("error:").to_string()
            } else {
                "error:".to_string()
            };
            eprintln!("{prefix} {message}");
            ExitCode::FAILURE
        }
    }
}
