//! Host probes: free space per mounted volume and recursive usage per directory.
//!
//! Both are traits so the scanner can run against fakes; the host versions shell out to
//! `df` and `du` with a wall-clock timeout, and [`WalkProbe`] computes the same output
//! in-process.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use crate::config::{DEFAULT_DF_TIMEOUT_SECS, DEFAULT_DU_TIMEOUT_SECS};
use crate::error::ProbeError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Captured output of a usage probe. `stdout` holds `KiB<TAB>path` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
}

pub trait SpaceProbe {
    /// Host-wide total/used/free summary, passed through to the report as-is.
    fn disk_free(&self) -> Result<String, ProbeError>;
}

pub trait UsageProbe {
    /// Usage of `root` and its subdirectories down to `depth` levels.
    fn measure(&self, root: &Path, depth: usize) -> Result<ProbeOutput, ProbeError>;
}

impl<F> SpaceProbe for F
where
    F: Fn() -> Result<String, ProbeError>,
{
    fn disk_free(&self) -> Result<String, ProbeError> {
        self()
    }
}

impl<F> UsageProbe for F
where
    F: Fn(&Path, usize) -> Result<ProbeOutput, ProbeError>,
{
    fn measure(&self, root: &Path, depth: usize) -> Result<ProbeOutput, ProbeError> {
        self(root, depth)
    }
}

/// Runs `df -h`.
#[derive(Debug, Clone)]
pub struct DfProbe {
    pub timeout: Duration,
}

impl Default for DfProbe {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(DEFAULT_DF_TIMEOUT_SECS) }
    }
}

impl SpaceProbe for DfProbe {
    fn disk_free(&self) -> Result<String, ProbeError> {
        let mut command = Command::new("df");
        command.arg("-h");
        let output = run_with_timeout("df", command, self.timeout)?;
        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: "df",
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}

/// Runs `du -k -x -d <depth> <root>`; stays on the root's filesystem.
#[derive(Debug, Clone)]
pub struct DuProbe {
    pub timeout: Duration,
}

impl Default for DuProbe {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(DEFAULT_DU_TIMEOUT_SECS) }
    }
}

impl UsageProbe for DuProbe {
    fn measure(&self, root: &Path, depth: usize) -> Result<ProbeOutput, ProbeError> {
        let mut command = Command::new("du");
        command.args(["-k", "-x", "-d"]).arg(depth.to_string()).arg(root);
        // du exits non-zero whenever a subtree is unreadable; the readable part is still valid.
        let output = run_with_timeout("du", command, self.timeout)?;
        Ok(ProbeOutput { stdout: output.stdout, stderr: output.stderr })
    }
}

/// In-process equivalent of `du -k -x -d`, built on `walkdir`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkProbe;

impl UsageProbe for WalkProbe {
    fn measure(&self, root: &Path, depth: usize) -> Result<ProbeOutput, ProbeError> {
        let mut totals: BTreeMap<PathBuf, u64> = BTreeMap::new();
        let mut stderr = String::new();

        let walker = WalkDir::new(root).follow_links(false).same_file_system(true);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                    stderr.push_str(&format!("walk: cannot read '{path}': {err}\n"));
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if entry.depth() <= depth {
                    totals.entry(entry.path().to_path_buf()).or_insert(0);
                }
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(_) => continue,
            };

            if entry.depth() == 0 {
                totals.insert(root.to_path_buf(), size);
                continue;
            }

            // Credit every ancestor directory that du would print at this depth.
            let mut level = entry.depth();
            for ancestor in entry.path().ancestors().skip(1) {
                level -= 1;
                if level <= depth {
                    let total = totals.entry(ancestor.to_path_buf()).or_insert(0);
                    *total = total.saturating_add(size);
                }
                if level == 0 {
                    break;
                }
            }
        }

        let mut stdout = String::new();
        for (path, bytes) in totals.iter().rev() {
            stdout.push_str(&format!("{}\t{}\n", bytes.div_ceil(1024), path.display()));
        }
        Ok(ProbeOutput { stdout, stderr })
    }
}

struct RawOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Run `command`, abandoning (and killing) it once `timeout` elapses.
fn run_with_timeout(
    program: &'static str,
    mut command: Command,
    timeout: Duration,
) -> Result<RawOutput, ProbeError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProbeError::Spawn { program, source })?;

    // Drain both pipes on their own threads so a chatty child never blocks on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill(&mut child);
                return Err(ProbeError::Timeout { program, after: timeout });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                kill(&mut child);
                return Err(ProbeError::Spawn { program, source });
            }
        }
    };

    Ok(RawOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
