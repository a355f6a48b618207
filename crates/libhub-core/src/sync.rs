//! Release synchronization: turns every tag of every registered repository into a catalog
//! release.

use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use libhub_config::config::Config;
use libhub_db::Catalog;
use libhub_registry::{list_repos, RepoEntry};
use libhub_utils::fs::{ensure_dir_exists, safe_remove};
use tracing::{debug, error, info, level_filters::LevelFilter, warn};

use crate::{
    archive::Archive,
    error::{CoreError, ErrorContext, Result},
    git::GitRepository,
    inspect::ReleaseInspector,
    logging::LogBuffer,
    metadata::LibraryMetadata,
    pool::WorkerPool,
};

/// Everything a sync run needs, borrowed from the command that started it.
pub struct SyncContext<'a> {
    pub config: &'a Config,
    pub catalog: &'a Catalog,
    /// `None` when the security scan is disabled.
    pub scanner: Option<&'a dyn ReleaseInspector>,
    pub linter: &'a dyn ReleaseInspector,
    /// Most verbose level kept in the per-repository logs.
    pub log_level: LevelFilter,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub repositories: usize,
    pub failed: usize,
    pub added: usize,
}

/// Synchronizes every repository listed in `registry_file`, then writes the public index.
///
/// Fails before touching any repository when the registry lists an unsupported URL. Failures of
/// a single repository or tag are logged and do not stop the run.
pub fn run_sync<P: AsRef<Path>>(ctx: &SyncContext<'_>, registry_file: P) -> Result<SyncReport> {
    let registry_file = registry_file.as_ref();
    if !registry_file.exists() {
        return Err(CoreError::Validation(format!(
            "registry data file argument {} not found",
            registry_file.display()
        )));
    }

    let listing = list_repos(registry_file)?;
    if let Some(rejection) = listing.rejection() {
        return Err(rejection.into());
    }

    ensure_dir_exists(&ctx.config.git_clones_folder)?;
    ensure_dir_exists(&ctx.config.libraries_folder)?;

    let report = sync_repositories(ctx, listing.repos);

    ctx.catalog.commit()?;
    let index = ctx.catalog.write_index(&ctx.config.libraries_index)?;
    info!(
        "Wrote {} releases to {}",
        index.libraries.len(),
        ctx.config.libraries_index.display()
    );
    info!("...DONE");

    Ok(report)
}

/// Runs the per-repository pipeline on `repos` through the worker pool.
pub fn sync_repositories(ctx: &SyncContext<'_>, repos: Vec<RepoEntry>) -> SyncReport {
    let added = AtomicUsize::new(0);

    let pool = WorkerPool::new(ctx.config.workers());
    debug!(
        "Syncing {} repositories with {} workers",
        repos.len(),
        pool.workers()
    );
    let outcome = pool.run(repos, |entry| sync_repository(ctx, &entry, &added));

    SyncReport {
        repositories: outcome.completed + outcome.errors.len(),
        failed: outcome.errors.len(),
        added: added.into_inner(),
    }
}

/// Synchronizes one repository with its log captured in a private buffer, then flushes the
/// buffer to the log folder and stdout.
///
/// The per-repository log is always plain text, whatever format the global subscriber uses.
fn sync_repository(ctx: &SyncContext<'_>, entry: &RepoEntry, added: &AtomicUsize) -> Result<()> {
    let buffer = LogBuffer::new();
    let outcome = tracing::subscriber::with_default(buffer.subscriber(ctx.log_level), || {
        let outcome = sync_tags(ctx, entry, added);
        if let Err(err) = &outcome {
            error!("{err}");
        }
        outcome
    });

    let mut log = buffer.contents();
    if let Some(logs_folder) = &ctx.config.logs_folder {
        if let Err(err) = write_repo_log(logs_folder, entry, &log) {
            log.push_str(&format!("Error writing log file: {err}\n"));
        }
    }

    emit_repo_log(io::stdout().lock(), entry, &log);

    outcome
}

/// Writes a repository log in one piece. A failed write is reported and the run goes on.
fn emit_repo_log<W: Write>(mut out: W, entry: &RepoEntry, log: &str) {
    if let Err(err) = out.write_all(log.as_bytes()).and_then(|()| out.flush()) {
        drop(out);
        warn!("Error writing log of {}: {err}", entry.url);
    }
}

fn write_repo_log(logs_folder: &Path, entry: &RepoEntry, log: &str) -> Result<()> {
    let folder = logs_folder.join(entry.as_folder()?);
    ensure_dir_exists(&folder)?;
    let file = folder.join("index.html");
    fs::write(&file, format!("<pre>\n{log}\n</pre>"))
        .with_context(|| format!("writing log file {}", file.display()))
}

fn open_clone(ctx: &SyncContext<'_>, entry: &RepoEntry) -> Result<GitRepository> {
    let folder = entry.as_folder()?;
    let clone_path = ctx.config.git_clones_folder.join(folder);

    match GitRepository::clone_or_fetch(&entry.url, &clone_path) {
        Ok(repo) => Ok(repo),
        Err(err) => {
            warn!("Error fetching repository: {err}");
            warn!("Removing clone and trying again");
            safe_remove(&clone_path)?;

            GitRepository::clone_or_fetch(&entry.url, &clone_path).inspect_err(|err| {
                error!("Error fetching repository: {err}");
                error!("Leaving...");
            })
        }
    }
}

fn sync_tags(ctx: &SyncContext<'_>, entry: &RepoEntry, added: &AtomicUsize) -> Result<()> {
    info!("Scraping {}", entry.url);

    let repo = open_clone(ctx, entry)?;
    let tags = repo.sorted_commit_tags().inspect_err(|_| {
        error!("Error retrieving git-tags");
    })?;

    for tag in &tags {
        match sync_tag(ctx, &repo, entry, tag) {
            Ok(true) => {
                added.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(err) => error!("Error syncing library: {err}"),
        }
    }

    Ok(())
}

/// Runs an inspector, logging the report attached to a rejection.
fn run_inspector(
    inspector: &dyn ReleaseInspector,
    folder: &Path,
    entry: &RepoEntry,
) -> Result<Option<String>> {
    inspector.inspect(folder, entry).inspect_err(|err| {
        if let CoreError::Scan { report, .. } = err {
            if !report.is_empty() {
                error!("{report}");
            }
        }
    })
}

/// Packages the release at `tag`. Returns whether a new release was recorded.
fn sync_tag(
    ctx: &SyncContext<'_>,
    repo: &GitRepository,
    entry: &RepoEntry,
    tag: &str,
) -> Result<bool> {
    info!("Checking out tag: {tag}");
    repo.checkout_tag(tag)?;

    let metadata = LibraryMetadata::from_folder(repo.path())?;
    if metadata.name != entry.library_name {
        error!(
            "Release {}:{} has wrong library name, should be {}",
            metadata.name, metadata.version, entry.library_name
        );
        return Ok(false);
    }

    if let Ok(existing) = ctx.catalog.find_release(&metadata.name, &metadata.version) {
        info!(
            "Release {}:{} already loaded, skipping",
            metadata.name, metadata.version
        );
        if !existing.log.is_empty() {
            info!("{}", existing.log);
        }
        return Ok(false);
    }

    if let Some(scanner) = ctx.scanner {
        if let Some(report) = run_inspector(scanner, repo.path(), entry)? {
            info!("{} output:\n{}", scanner.name(), report);
        }
    }

    let mut release_log = String::new();
    if let Some(report) = run_inspector(ctx.linter, repo.path(), entry)? {
        warn!("{report}");
        release_log.push_str(&report);
    }

    let mut release = metadata.to_release(&entry.types)?;
    let mut archive = Archive::locate(
        &entry.url,
        &metadata.name,
        &metadata.version,
        ctx.config,
    )?;
    archive.create(repo.path())?;

    release.url = archive.url;
    release.archive_file_name = archive.file_name;
    release.size = archive.size;
    release.checksum = archive.checksum;
    release.log = release_log;

    let recorded = ctx.catalog.record_release(release, &entry.url)?;
    if recorded {
        info!("Added {}:{}", metadata.name, metadata.version);
    }
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::{tempdir, TempDir};

    use libhub_registry::RegistryError;
    use libhub_utils::hash::calculate_checksum;

    use super::*;
    use crate::git::test_utils::{commit, file_url, init_repo};

    struct Pass;

    impl ReleaseInspector for Pass {
        fn name(&self) -> &str {
            "pass"
        }

        fn inspect(&self, _: &Path, _: &RepoEntry) -> Result<Option<String>> {
            Ok(None)
        }
    }

    struct Advise;

    impl ReleaseInspector for Advise {
        fn name(&self) -> &str {
            "advise"
        }

        fn inspect(&self, _: &Path, _: &RepoEntry) -> Result<Option<String>> {
            Ok(Some("consider adding examples".to_string()))
        }
    }

    struct Reject;

    impl ReleaseInspector for Reject {
        fn name(&self) -> &str {
            "reject"
        }

        fn inspect(&self, _: &Path, _: &RepoEntry) -> Result<Option<String>> {
            Err(CoreError::Scan {
                tool: "reject".to_string(),
                message: "found errors".to_string(),
                report: "bad library".to_string(),
            })
        }
    }

    struct Fixture {
        dir: TempDir,
        config: Config,
        remote: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let root = dir.path();
            let config = Config::parse(&format!(
                r#"
                base_download_url = "https://downloads.example.com/"
                libraries_folder = "{0}/libraries"
                libraries_db = "{0}/db.json"
                libraries_index = "{0}/index.json"
                git_clones_folder = "{0}/gitclones"
                logs_folder = "{0}/logs"
                workers = 2
                "#,
                root.display()
            ))
            .unwrap();

            let remote = root.join("remotes/blink");
            init_repo(&remote);
            commit(
                &remote,
                &[
                    ("library.properties", properties("Blink", "1.0.0").as_str()),
                    ("src/Blink.h", "#pragma once\n"),
                ],
                Some("v1.0.0"),
                1_600_000_100,
            );
            commit(
                &remote,
                &[("library.properties", properties("Blink", "1.1.0").as_str())],
                Some("v1.1.0"),
                1_600_000_200,
            );

            Self {
                dir,
                config,
                remote,
            }
        }

        fn entry(&self, library_name: &str) -> RepoEntry {
            RepoEntry {
                url: file_url(&self.remote),
                types: vec!["Contributed".to_string()],
                library_name: library_name.to_string(),
            }
        }

        fn context<'a>(
            &'a self,
            catalog: &'a Catalog,
            linter: &'a dyn ReleaseInspector,
        ) -> SyncContext<'a> {
            SyncContext {
                config: &self.config,
                catalog,
                scanner: None,
                linter,
                log_level: LevelFilter::INFO,
            }
        }

        fn repo_log(&self, entry: &RepoEntry) -> String {
            let path = self
                .config
                .logs_folder
                .as_ref()
                .unwrap()
                .join(entry.as_folder().unwrap())
                .join("index.html");
            fs::read_to_string(path).unwrap()
        }
    }

    fn properties(name: &str, version: &str) -> String {
        format!(
            "name={name}\nversion={version}\nauthor=Someone\nmaintainer=Someone\n\
             sentence=Blinks a led.\nparagraph=\ncategory=Timing\nurl=https://example.com\n\
             architectures=*\n"
        )
    }

    #[test]
    fn test_sync_adds_every_tag() {
        let fixture = Fixture::new();
        let catalog = Catalog::new(&fixture.config.libraries_db);
        let ctx = fixture.context(&catalog, &Pass);
        let entry = fixture.entry("Blink");

        let report = sync_repositories(&ctx, vec![entry.clone()]);
        assert_eq!(
            report,
            SyncReport {
                repositories: 1,
                failed: 0,
                added: 2,
            }
        );

        assert_eq!(catalog.library_count(), 1);
        assert_eq!(catalog.release_count(), 2);
        let library = catalog.find_library("Blink").unwrap();
        assert_eq!(library.repository, entry.url);
        assert_eq!(library.latest_category, "Timing");

        let index = catalog.output_library_index();
        assert_eq!(index.libraries.len(), 2);
        for (item, version) in index.libraries.iter().zip(["1.0.0", "1.1.0"]) {
            assert_eq!(item.version.as_str(), version);
            assert!(item.size > 0);

            let archive = Archive::locate(&entry.url, "Blink", version, &fixture.config).unwrap();
            assert!(archive.path.exists());
            assert_eq!(item.checksum, calculate_checksum(&archive.path).unwrap());
            assert!(!item.checksum.starts_with("SHA-256:SHA-256:"));
            assert_eq!(item.url, archive.url);
        }

        let log = fixture.repo_log(&entry);
        assert!(log.starts_with("<pre>\nScraping file://"));
        assert!(log.contains("Checking out tag: v1.1.0"));
        assert!(log.ends_with("\n</pre>"));

        assert!(fixture.dir.path().join("db.json").exists());
    }

    #[test]
    fn test_sync_is_idempotent() {
        let fixture = Fixture::new();
        let catalog = Catalog::new(&fixture.config.libraries_db);
        let ctx = fixture.context(&catalog, &Advise);
        let entry = fixture.entry("Blink");

        assert_eq!(sync_repositories(&ctx, vec![entry.clone()]).added, 2);
        let release = catalog.find_release("Blink", "1.0.0").unwrap();
        assert_eq!(release.log, "consider adding examples");

        let report = sync_repositories(&ctx, vec![entry.clone()]);
        assert_eq!(report.added, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(catalog.release_count(), 2);

        let log = fixture.repo_log(&entry);
        assert!(log.contains("Release Blink:1.0.0 already loaded, skipping"));
        assert!(log.contains("consider adding examples"));
    }

    #[test]
    fn test_sync_skips_wrong_library_name() {
        let fixture = Fixture::new();
        let catalog = Catalog::new(&fixture.config.libraries_db);
        let ctx = fixture.context(&catalog, &Pass);
        let entry = fixture.entry("Blinker");

        let report = sync_repositories(&ctx, vec![entry.clone()]);
        assert_eq!(report.added, 0);
        assert_eq!(catalog.release_count(), 0);
        assert!(fixture
            .repo_log(&entry)
            .contains("Release Blink:1.0.0 has wrong library name, should be Blinker"));
    }

    #[test]
    fn test_sync_rejected_by_linter() {
        let fixture = Fixture::new();
        let catalog = Catalog::new(&fixture.config.libraries_db);
        let ctx = fixture.context(&catalog, &Reject);
        let entry = fixture.entry("Blink");

        let report = sync_repositories(&ctx, vec![entry.clone()]);
        assert_eq!(report.added, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(catalog.release_count(), 0);

        let log = fixture.repo_log(&entry);
        assert!(log.contains("[ERROR] bad library"));
        assert!(log.contains("[ERROR] Error syncing library: reject failed: found errors"));
    }

    #[test]
    fn test_sync_rejected_by_scanner() {
        let fixture = Fixture::new();
        let catalog = Catalog::new(&fixture.config.libraries_db);
        let ctx = SyncContext {
            scanner: Some(&Reject as &dyn ReleaseInspector),
            ..fixture.context(&catalog, &Advise)
        };
        let entry = fixture.entry("Blink");

        let report = sync_repositories(&ctx, vec![entry.clone()]);
        assert_eq!(report.added, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(catalog.release_count(), 0);

        for version in ["1.0.0", "1.1.0"] {
            let archive = Archive::locate(&entry.url, "Blink", version, &fixture.config).unwrap();
            assert!(!archive.path.exists());
        }

        let log = fixture.repo_log(&entry);
        assert!(log.contains("[ERROR] bad library"));
        assert!(log.contains("[ERROR] Error syncing library: reject failed: found errors"));
        assert!(!log.contains("consider adding examples"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_emit_repo_log_reports_write_failure() {
        let fixture = Fixture::new();
        let entry = fixture.entry("Blink");

        let buffer = LogBuffer::new();
        tracing::subscriber::with_default(buffer.subscriber(LevelFilter::INFO), || {
            emit_repo_log(BrokenPipe, &entry, "Scraping\n");
        });

        let log = buffer.contents();
        assert!(log.contains("[WARN] Error writing log of file://"));
        assert!(log.contains("closed"));
    }

    #[test]
    fn test_sync_unreachable_repository() {
        let fixture = Fixture::new();
        let catalog = Catalog::new(&fixture.config.libraries_db);
        let ctx = fixture.context(&catalog, &Pass);
        let entry = RepoEntry {
            url: file_url(&fixture.dir.path().join("remotes/missing")),
            ..fixture.entry("Missing")
        };

        let report = sync_repositories(&ctx, vec![entry.clone(), fixture.entry("Blink")]);
        assert_eq!(report.repositories, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.added, 2);

        let log = fixture.repo_log(&entry);
        assert!(log.contains("Removing clone and trying again"));
        assert!(log.contains("Leaving..."));
    }

    #[test]
    fn test_run_sync_writes_index() {
        let fixture = Fixture::new();
        let registry = fixture.dir.path().join("repos.txt");
        fs::write(&registry, "# registry\n\n").unwrap();

        let catalog = Catalog::new(&fixture.config.libraries_db);
        let report = run_sync(&fixture.context(&catalog, &Pass), &registry).unwrap();
        assert_eq!(report.repositories, 0);

        let index = fs::read_to_string(&fixture.config.libraries_index).unwrap();
        let value: serde_json::Value = serde_json::from_str(&index).unwrap();
        assert_eq!(value["libraries"], serde_json::json!([]));
        assert!(fixture.config.git_clones_folder.is_dir());
        assert!(fixture.config.libraries_folder.is_dir());
    }

    #[test]
    fn test_run_sync_rejects_unsupported_urls() {
        let fixture = Fixture::new();
        let registry = fixture.dir.path().join("repos.txt");
        fs::write(
            &registry,
            "https://example.com/owner/valid.git|Contributed|Valid\n\
             http://example.com/insecure.git|Contributed|Insecure\n",
        )
        .unwrap();

        let catalog = Catalog::new(&fixture.config.libraries_db);
        let err = run_sync(&fixture.context(&catalog, &Pass), &registry).unwrap_err();

        match err {
            CoreError::Registry(RegistryError::UnsupportedUrls { urls }) => {
                assert_eq!(urls, vec!["http://example.com/insecure.git".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!fixture.config.libraries_index.exists());
        assert!(!fixture.config.git_clones_folder.exists());
    }

    #[test]
    fn test_run_sync_missing_registry() {
        let fixture = Fixture::new();
        let catalog = Catalog::new(&fixture.config.libraries_db);
        let err = run_sync(
            &fixture.context(&catalog, &Pass),
            fixture.dir.path().join("nope.txt"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
