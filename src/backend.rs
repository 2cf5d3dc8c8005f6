//! The inference collaborator seam.
//!
//! The node never runs the model itself. It seeds and calls a
//! [`LipsyncBackend`], which owns model loading, denoising and muxing.
//! [`CommandBackend`] drives a stock LatentSync checkout through
//! `python -m scripts.inference`.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

use crate::args::InvocationArgs;
use crate::config::{NodeConfig, UnetConfig};

/// An external lip-sync inference entry point.
pub trait LipsyncBackend {
    /// Seed every RNG the pipeline uses with `seed`.
    fn set_seed(&mut self, seed: i64);

    /// Draw a fresh nondeterministic seed and return it.
    fn reseed(&mut self) -> u64;

    /// Run one generation, writing the video to `args.video_out_path()`.
    fn infer(&mut self, config: &UnetConfig, args: &InvocationArgs) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// CommandBackend
// ─────────────────────────────────────────────────────────────────────────────

/// stderr lines kept for the failure message.
const STDERR_TAIL: usize = 20;

/// Runs the LatentSync inference script as a child process.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: OsString,
    module: String,
    working_dir: PathBuf,
    seed: Option<i64>,
}

impl CommandBackend {
    pub fn new(
        program: impl Into<OsString>,
        module: impl Into<String>,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            program: program.into(),
            module: module.into(),
            working_dir,
            seed: None,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            config.python.clone(),
            config.inference_module.clone(),
            config.install_dir.clone(),
        )
    }

    /// The full command line for `args`, without spawning it.
    pub fn command(&self, args: &InvocationArgs) -> Command {
        let seed = self.seed.unwrap_or(args.seed());
        let mut cmd = Command::new(&self.program);
        cmd.arg("-m")
            .arg(&self.module)
            .args(args.to_cli_flags(seed))
            .current_dir(&self.working_dir);
        cmd
    }
}

impl LipsyncBackend for CommandBackend {
    fn set_seed(&mut self, seed: i64) {
        self.seed = Some(seed);
    }

    fn reseed(&mut self) -> u64 {
        // Kept below 2^32 so numpy's seeding inside the script accepts it.
        let seed = rand::random::<u32>() as u64;
        self.seed = Some(seed as i64);
        seed
    }

    fn infer(&mut self, config: &UnetConfig, args: &InvocationArgs) -> Result<()> {
        let mut cmd = self.command(args);
        tracing::debug!("Running {:?} (config {})", cmd, config.path().display());

        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to launch {:?}", self.program))?;

        // stderr is drained on its own thread so a chatty child cannot block
        // on a full pipe while we read stdout.
        let stderr = child.stderr.take().context("child stderr not captured")?;
        let stderr_reader = std::thread::spawn(move || {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL + 1);
            for line in BufReader::new(stderr).lines().map_while(std::io::Result::ok) {
                tracing::debug!(target: "latentsync_node::inference", "{}", line);
                tail.push_back(line);
                if tail.len() > STDERR_TAIL {
                    tail.pop_front();
                }
            }
            tail
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(std::io::Result::ok) {
                tracing::info!(target: "latentsync_node::inference", "{}", line);
            }
        }

        let status = child.wait().context("Failed to wait on inference process")?;
        let tail = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            let last = tail.back().cloned().unwrap_or_default();
            bail!("inference process exited with {}: {}", status, last);
        }
        if !args.video_out_path().is_file() {
            bail!(
                "inference finished but produced no video at {}",
                args.video_out_path().display()
            );
        }
        Ok(())
    }
}
