//! Local clones of library repositories.
//!
//! All operations shell out to the system `git` executable.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Command,
};

use libhub_utils::fs::ensure_dir_exists;
use tracing::{debug, trace};

use crate::error::{CoreError, Result};

const CLEAN_ATTEMPTS: usize = 2;

fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new("git");
    command.args(args).env("GIT_TERMINAL_PROMPT", "0");
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let subcommand = args
        .iter()
        .find(|arg| !arg.starts_with('-') && !arg.contains('='))
        .copied()
        .unwrap_or_default()
        .to_string();
    trace!("running git {}", args.join(" "));

    let output = command.output().map_err(|err| {
        CoreError::Git {
            command: subcommand.clone(),
            message: err.to_string(),
        }
    })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(CoreError::Git {
            command: subcommand,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// A tag as listed in the repository, with the commit it resolves to.
///
/// `commit` is `None` when the tag points to a tree or blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub commit: Option<String>,
}

/// Orders tags by the position of their commit in the branch history.
///
/// `commit_ranks` maps each commit reachable from HEAD to a rank that decreases going back in
/// history, and `oldest_rank` is one below the oldest commit. Tags are given in lexicographic
/// order. A tag whose commit is not in the history takes the rank of the last tag that was, so it
/// stays next to its nearest anchored neighbour. Tags without a commit are dropped.
pub fn order_tags(
    commit_ranks: &HashMap<String, i64>,
    oldest_rank: i64,
    tags: Vec<TagRef>,
) -> Vec<String> {
    let mut anchored_rank = oldest_rank;
    let mut keyed: Vec<((i64, usize), String)> = tags
        .into_iter()
        .filter_map(|tag| tag.commit.map(|commit| (tag.name, commit)))
        .enumerate()
        .map(|(discovery, (name, commit))| {
            if let Some(rank) = commit_ranks.get(&commit) {
                anchored_rank = *rank;
            }
            ((anchored_rank, discovery), name)
        })
        .collect();

    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, name)| name).collect()
}

#[derive(Debug, Clone)]
pub struct GitRepository {
    path: PathBuf,
    url: String,
}

impl GitRepository {
    /// Clones `url` into `path`, or opens the existing clone, then replaces every local tag with
    /// the remote's current tags.
    pub fn clone_or_fetch<P: AsRef<Path>>(url: &str, path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                ensure_dir_exists(parent)?;
            }
            debug!("cloning {} into {}", url, path.display());
            let target = path.to_string_lossy();
            run_git(None, &["clone", "--quiet", "--", url, &target])?;
        } else {
            run_git(Some(path), &["rev-parse", "--git-dir"])?;
        }

        let repo = Self {
            path: path.to_path_buf(),
            url: url.to_string(),
        };
        repo.delete_local_tags()?;
        repo.git(&["fetch", "--quiet", "--force", "--tags", "origin"])?;

        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        run_git(Some(&self.path), args)
    }

    fn delete_local_tags(&self) -> Result<()> {
        let listing = self.git(&["tag", "--list"])?;
        let tags: Vec<&str> = listing.lines().filter(|l| !l.is_empty()).collect();
        if tags.is_empty() {
            return Ok(());
        }

        let mut args = vec!["tag", "--delete"];
        args.extend(tags);
        self.git(&args)?;
        Ok(())
    }

    fn resolve_commit(&self, tag: &str) -> Option<String> {
        let revision = format!("refs/tags/{tag}^{{commit}}");
        self.git(&["rev-parse", "--verify", "--quiet", &revision])
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|sha| !sha.is_empty())
    }

    fn list_tags(&self) -> Result<Vec<TagRef>> {
        let listing = self.git(&[
            "for-each-ref",
            "--format=%(refname:strip=2)%09%(objecttype)%09%(objectname)%09%(*objecttype)%09%(*objectname)",
            "refs/tags",
        ])?;

        let tags = listing
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                let fields: Vec<&str> = line.split('\t').collect();
                let field = |idx: usize| fields.get(idx).copied().unwrap_or_default();
                let name = field(0).to_string();

                let commit = match (field(1), field(3)) {
                    ("commit", _) => Some(field(2).to_string()),
                    ("tag", "commit") => Some(field(4).to_string()),
                    ("tag", "tag") => self.resolve_commit(&name),
                    _ => None,
                };

                TagRef {
                    name,
                    commit,
                }
            })
            .collect();

        Ok(tags)
    }

    /// Returns the repository tags ordered by the chronology of the current branch.
    ///
    /// Tags of commits outside the branch keep their lexicographic position relative to the
    /// nearest preceding tag that is in the branch. Tags pointing to trees or blobs are omitted.
    pub fn sorted_commit_tags(&self) -> Result<Vec<String>> {
        let history = self.git(&["rev-list", "HEAD"])?;

        let mut commit_ranks = HashMap::new();
        let mut rank: i64 = 0;
        for commit in history.lines().filter(|l| !l.is_empty()) {
            commit_ranks.insert(commit.to_string(), rank);
            rank -= 1;
        }

        let tags = self.list_tags()?;
        Ok(order_tags(&commit_ranks, rank, tags))
    }

    /// Force-checks out `tag` and makes sure the working tree ends up clean.
    pub fn checkout_tag(&self, tag: &str) -> Result<()> {
        let checkout_error = |message: String| {
            CoreError::Checkout {
                tag: tag.to_string(),
                message,
            }
        };

        let commit = self
            .resolve_commit(tag)
            .ok_or_else(|| checkout_error("tag does not point to a commit".to_string()))?;

        self.git(&[
            "-c",
            "advice.detachedHead=false",
            "checkout",
            "--quiet",
            "--force",
            "--detach",
            &commit,
        ])
        .map_err(|err| checkout_error(err.to_string()))?;

        for _ in 0..CLEAN_ATTEMPTS {
            if self.clean().map_err(|err| checkout_error(err.to_string()))? {
                return Ok(());
            }
        }

        Err(checkout_error("failed to reach clean state".to_string()))
    }

    fn clean(&self) -> Result<bool> {
        self.git(&["clean", "--quiet", "--force", "-d"])?;
        self.git(&["reset", "--quiet", "--hard"])?;
        let status = self.git(&["status", "--porcelain"])?;
        Ok(status.trim().is_empty())
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use std::{fs, path::Path, process::Command};

    /// Runs git in `dir` with a fixed identity and commit date.
    pub fn git(dir: &Path, args: &[&str], timestamp: u64) -> String {
        let date = format!("{timestamp} +0000");
        let output = Command::new("git")
            .args([
                "-c",
                "user.name=libhub",
                "-c",
                "user.email=libhub@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "tag.gpgsign=false",
                "-c",
                "init.defaultBranch=main",
            ])
            .args(args)
            .current_dir(dir)
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    pub fn init_repo(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        git(dir, &["init", "--quiet"], 1_600_000_000);
    }

    /// Writes `files`, commits them and tags the commit when `tag` is given.
    pub fn commit(dir: &Path, files: &[(&str, &str)], tag: Option<&str>, timestamp: u64) {
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        git(dir, &["add", "--all"], timestamp);
        git(
            dir,
            &["commit", "--quiet", "--allow-empty", "-m", "change"],
            timestamp,
        );
        if let Some(tag) = tag {
            git(dir, &["tag", tag], timestamp);
        }
    }

    pub fn file_url(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}
