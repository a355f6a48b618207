use std::path::Path;

use libhub_config::config::Config;
use libhub_core::{
    inspect::{ArduinoLint, ClamAvScanner, ReleaseInspector},
    sync::{run_sync, SyncContext},
    Result,
};
use libhub_db::Catalog;
use tracing::{info, level_filters::LevelFilter, warn};

pub fn sync_libraries(config: &Config, registry_file: &Path, log_level: LevelFilter) -> Result<()> {
    let catalog = Catalog::open(&config.libraries_db);

    let scanner = ClamAvScanner;
    let linter = ArduinoLint::new(config.lint_path());
    if config.skip_security_scan {
        warn!("Security scan is disabled");
    }

    let ctx = SyncContext {
        config,
        catalog: &catalog,
        scanner: (!config.skip_security_scan).then_some(&scanner as &dyn ReleaseInspector),
        linter: &linter,
        log_level,
    };

    let report = run_sync(&ctx, registry_file)?;
    info!(
        "Synchronized {} repositories: {} new releases, {} failed",
        report.repositories, report.added, report.failed
    );

    Ok(())
}
