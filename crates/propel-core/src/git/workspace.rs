//! Working copies of the configuration repository.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::PropagateError;

/// Result of a publish attempt against the tracked branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    /// The remote branch now points at the local commit
    Pushed,
    /// The remote advanced past the local base; the caller must refetch and
    /// reapply its mutation against the new head
    RejectedNonFastForward,
}

/// A clone of the configuration repository's tracked branch.
///
/// Network-facing commands (clone, fetch, push) run under a deadline; a
/// command that exceeds it is killed and surfaced as a transport failure, so
/// no propagation attempt can hang its caller.
#[derive(Debug)]
pub struct GitWorkspace {
    root: PathBuf,
    branch: String,
    author_name: String,
    author_email: String,
    timeout: Duration,
}

impl GitWorkspace {
    /// Clone the tracked branch of `url` into `root`.
    pub fn clone(
        url: &str,
        branch: &str,
        root: PathBuf,
        author_name: &str,
        author_email: &str,
        timeout: Duration,
    ) -> Result<Self, PropagateError> {
        if let Some(parent) = root.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let root_arg = root
            .to_str()
            .ok_or_else(|| PropagateError::Transport("working copy path is not valid UTF-8".to_string()))?
            .to_string();

        run_git_timeout(
            None,
            &[
                "clone",
                "--quiet",
                "--branch",
                branch,
                "--single-branch",
                url,
                &root_arg,
            ],
            timeout,
        )
        .map_err(GitFailure::into_transport)?;

        Ok(Self {
            root,
            branch: branch.to_string(),
            author_name: author_name.to_string(),
            author_email: author_email.to_string(),
            timeout,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-point the local branch at the freshly fetched remote head,
    /// discarding any local commit left over from a rejected attempt.
    pub fn fetch_reset(&self) -> Result<(), PropagateError> {
        run_git_timeout(
            Some(&self.root),
            &["fetch", "--quiet", "origin", &self.branch],
            self.timeout,
        )
        .map_err(GitFailure::into_transport)?;
        run_git(Some(&self.root), &["reset", "--quiet", "--hard", "FETCH_HEAD"])
            .map_err(GitFailure::into_local)?;
        Ok(())
    }

    /// Stage a single path and commit it with the given message.
    ///
    /// Returns the new HEAD commit id.
    pub fn commit_path(&self, rel_path: &Path, message: &str) -> Result<String, PropagateError> {
        let rel = rel_path.to_string_lossy();
        run_git(Some(&self.root), &["add", "--", rel.as_ref()])
            .map_err(GitFailure::into_local)?;
        run_git(
            Some(&self.root),
            &[
                "-c",
                &format!("user.name={}", self.author_name),
                "-c",
                &format!("user.email={}", self.author_email),
                "commit",
                "--quiet",
                "-m",
                message,
            ],
        )
        .map_err(GitFailure::into_local)?;
        self.head_id()
    }

    /// Current HEAD commit id, read through libgit2.
    pub fn head_id(&self) -> Result<String, PropagateError> {
        let repo = git2::Repository::open(&self.root)?;
        let head = repo.revparse_single("HEAD")?;
        Ok(head.id().to_string())
    }

    /// Publish the local branch, classifying a non-fast-forward rejection
    /// separately from transport failures.
    pub fn push(&self) -> Result<PushResult, PropagateError> {
        let refspec = format!("{branch}:{branch}", branch = self.branch);
        match run_git_timeout(Some(&self.root), &["push", "origin", &refspec], self.timeout) {
            Ok(()) => Ok(PushResult::Pushed),
            Err(GitFailure::Exit { ref stderr, .. }) if is_push_conflict(stderr) => {
                Ok(PushResult::RejectedNonFastForward)
            }
            Err(failure) => Err(failure.into_transport()),
        }
    }
}

/// Stderr markers git emits when a push loses against a concurrent writer:
/// a stale base, or ref-lock contention with a push in flight.
fn is_push_conflict(stderr: &str) -> bool {
    stderr.contains("non-fast-forward")
        || stderr.contains("fetch first")
        || stderr.contains("[rejected]")
        || stderr.contains("cannot lock ref")
}

/// Failure of a single git invocation, kept internal so callers can classify
/// before collapsing into the transport error.
#[derive(Debug)]
enum GitFailure {
    Spawn(std::io::Error),
    TimedOut { args: String },
    Exit { args: String, stderr: String },
}

impl GitFailure {
    fn describe(self) -> String {
        match self {
            Self::Spawn(err) => format!("failed to invoke git: {err}"),
            Self::TimedOut { args } => format!("git {args} exceeded the transport timeout"),
            Self::Exit { args, stderr } => format!("git {args} failed: {stderr}"),
        }
    }

    fn into_transport(self) -> PropagateError {
        PropagateError::Transport(self.describe())
    }

    /// Staging, committing, and resetting are working-copy operations; their
    /// failures must not read as transport problems.
    fn into_local(self) -> PropagateError {
        PropagateError::LocalGit(self.describe())
    }
}

/// Run a local git command with no deadline.
fn run_git(cwd: Option<&Path>, args: &[&str]) -> Result<(), GitFailure> {
    run_git_inner(cwd, args, None)
}

/// Run a network-facing git command under a deadline.
fn run_git_timeout(cwd: Option<&Path>, args: &[&str], timeout: Duration) -> Result<(), GitFailure> {
    run_git_inner(cwd, args, Some(timeout))
}

fn run_git_inner(
    cwd: Option<&Path>,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<(), GitFailure> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    tracing::debug!(?args, "running git");

    let mut child = cmd.spawn().map_err(GitFailure::Spawn)?;

    // Drain both pipes off-thread so a chatty command (a remote whose hooks
    // flood the sideband) can never fill a pipe buffer, block on write, and
    // stall against the deadline poll below. The deadline only fires on
    // genuine hangs.
    let stdout_reader = drain_pipe(child.stdout.take());
    let stderr_reader = drain_pipe(child.stderr.take());

    let status = match timeout {
        Some(limit) => {
            let start = Instant::now();
            loop {
                match child.try_wait().map_err(GitFailure::Spawn)? {
                    Some(status) => break status,
                    None if start.elapsed() >= limit => {
                        let _ = child.kill();
                        let _ = child.wait();
                        let _ = stdout_reader.join();
                        let _ = stderr_reader.join();
                        return Err(GitFailure::TimedOut {
                            args: args.join(" "),
                        });
                    }
                    None => std::thread::sleep(Duration::from_millis(25)),
                }
            }
        }
        None => child.wait().map_err(GitFailure::Spawn)?,
    };

    let _ = stdout_reader.join();
    let stderr = stderr_reader.join().unwrap_or_default();
    if status.success() {
        return Ok(());
    }
    Err(GitFailure::Exit {
        args: args.join(" "),
        stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
    })
}

/// Read a child pipe to EOF on a dedicated thread.
fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}
