//! The argument bundle passed to the inference pipeline.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Seed value meaning "pick a fresh nondeterministic seed".
pub const RANDOM_SEED: i64 = -1;

/// How the run is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    Random,
    Fixed(i64),
}

impl SeedPolicy {
    pub fn from_raw(seed: i64) -> Self {
        if seed == RANDOM_SEED {
            Self::Random
        } else {
            Self::Fixed(seed)
        }
    }
}

/// Everything one inference run needs. Built once per invocation and handed
/// to [`LipsyncBackend::infer`](crate::backend::LipsyncBackend::infer).
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationArgs {
    unet_config_path: PathBuf,
    inference_ckpt_path: PathBuf,
    video_path: PathBuf,
    audio_path: PathBuf,
    video_out_path: PathBuf,
    inference_steps: u32,
    guidance_scale: f32,
    seed: i64,
}

impl InvocationArgs {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        unet_config_path: PathBuf,
        inference_ckpt_path: PathBuf,
        video_path: PathBuf,
        audio_path: PathBuf,
        video_out_path: PathBuf,
        inference_steps: u32,
        guidance_scale: f32,
        seed: i64,
    ) -> Self {
        Self {
            unet_config_path,
            inference_ckpt_path,
            video_path,
            audio_path,
            video_out_path,
            inference_steps,
            guidance_scale,
            seed,
        }
    }

    pub fn unet_config_path(&self) -> &Path {
        &self.unet_config_path
    }

    pub fn inference_ckpt_path(&self) -> &Path {
        &self.inference_ckpt_path
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn video_out_path(&self) -> &Path {
        &self.video_out_path
    }

    pub fn inference_steps(&self) -> u32 {
        self.inference_steps
    }

    pub fn guidance_scale(&self) -> f32 {
        self.guidance_scale
    }

    /// The seed as given by the caller; `-1` for a random run.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn seed_policy(&self) -> SeedPolicy {
        SeedPolicy::from_raw(self.seed)
    }

    /// Command-line flags understood by `scripts/inference.py`.
    ///
    /// `seed` is the value to pass as `--seed`, which may differ from
    /// [`seed`](Self::seed) when a random seed was drawn for this run.
    pub fn to_cli_flags(&self, seed: i64) -> Vec<OsString> {
        let mut flags: Vec<OsString> = Vec::with_capacity(16);
        let mut push = |name: &str, value: OsString| {
            flags.push(name.into());
            flags.push(value);
        };
        push("--unet_config_path", self.unet_config_path.clone().into());
        push("--inference_ckpt_path", self.inference_ckpt_path.clone().into());
        push("--video_path", self.video_path.clone().into());
        push("--audio_path", self.audio_path.clone().into());
        push("--video_out_path", self.video_out_path.clone().into());
        push("--inference_steps", self.inference_steps.to_string().into());
        push("--guidance_scale", self.guidance_scale.to_string().into());
        push("--seed", seed.to_string().into());
        flags
    }
}
