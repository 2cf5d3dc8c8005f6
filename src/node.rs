//! The lip-sync node: validate, stage, invoke, clean up.
//!
//! ```text
//! inputs ──► validate ──► stage waveform ──► seed ──► infer ──► cleanup ──► output path
//!              │               │                        │
//!              └── fail fast ──┘                        └── Inference error
//! ```
//!
//! Each call is synchronous and owns its scratch files. In the waveform
//! variant the staged WAV is removed on every exit path by [`StagedInputs`].

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::{
    args::{InvocationArgs, SeedPolicy},
    audio::{AudioInput, Waveform},
    backend::LipsyncBackend,
    config::{NodeConfig, UnetConfig},
    error::{LipsyncError, Result},
    host::HostEnvironment,
    paths::{clean_path_input, output_file_name, remove_quietly, require_file},
    schema::{
        MAX_GUIDANCE_SCALE, MAX_INFERENCE_STEPS, MIN_GUIDANCE_SCALE, MIN_INFERENCE_STEPS,
    },
};

/// Name of the staged waveform inside the scratch directory.
const STAGED_AUDIO_NAME: &str = "input_audio.wav";

/// Prefix of the per-invocation scratch directory in the waveform variant.
const SCRATCH_DIR_PREFIX: &str = "latentsync_";

/// Generation parameters shared by both variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: i64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            inference_steps: crate::schema::DEFAULT_INFERENCE_STEPS,
            guidance_scale: crate::schema::DEFAULT_GUIDANCE_SCALE,
            seed: crate::args::RANDOM_SEED,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_INFERENCE_STEPS..=MAX_INFERENCE_STEPS).contains(&self.inference_steps) {
            return Err(LipsyncError::ParameterOutOfRange {
                name: "inference_steps",
                value: self.inference_steps as f64,
                min: MIN_INFERENCE_STEPS as f64,
                max: MAX_INFERENCE_STEPS as f64,
            });
        }
        // NaN fails `contains` too.
        if !(MIN_GUIDANCE_SCALE..=MAX_GUIDANCE_SCALE).contains(&self.guidance_scale) {
            return Err(LipsyncError::ParameterOutOfRange {
                name: "guidance_scale",
                value: self.guidance_scale as f64,
                min: MIN_GUIDANCE_SCALE as f64,
                max: MAX_GUIDANCE_SCALE as f64,
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scratch cleanup
// ─────────────────────────────────────────────────────────────────────────────

/// Files removed when the invocation ends, however it ends.
struct StagedInputs {
    paths: Vec<PathBuf>,
    scratch_dir: Option<PathBuf>,
    keep_scratch_dir: bool,
}

impl StagedInputs {
    fn new() -> Self {
        Self {
            paths: Vec::new(),
            scratch_dir: None,
            keep_scratch_dir: false,
        }
    }

    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }
}

impl Drop for StagedInputs {
    fn drop(&mut self) {
        for path in &self.paths {
            remove_quietly(path);
        }
        // A failed run leaves nothing worth keeping in its scratch dir.
        if let (Some(dir), false) = (&self.scratch_dir, self.keep_scratch_dir) {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                tracing::warn!("Could not remove scratch dir {}: {}", dir.display(), e);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LipsyncNode
// ─────────────────────────────────────────────────────────────────────────────

/// The LatentSync lip-sync node.
pub struct LipsyncNode<B, H> {
    config: NodeConfig,
    backend: B,
    host: H,
}

impl<B: LipsyncBackend, H: HostEnvironment> LipsyncNode<B, H> {
    pub fn new(config: NodeConfig, backend: B, host: H) -> Self {
        Self {
            config,
            backend,
            host,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Dispatch on the audio source.
    pub fn generate(
        &mut self,
        video_path: &str,
        audio: AudioInput,
        params: GenerationParams,
    ) -> Result<PathBuf> {
        match audio {
            AudioInput::Path(audio_path) => self.generate_lipsync(video_path, &audio_path, params),
            AudioInput::Waveform(waveform) => {
                self.generate_lipsync_from_waveform(video_path, &waveform, params)
            }
        }
    }

    /// Path variant: both inputs are files the caller keeps.
    ///
    /// The output lands in the host temp directory.
    pub fn generate_lipsync(
        &mut self,
        video_path: &str,
        audio_path: &str,
        params: GenerationParams,
    ) -> Result<PathBuf> {
        let video_path = clean_path_input(video_path, "video")?;
        let audio_path = clean_path_input(audio_path, "audio")?;
        params.validate()?;

        tracing::info!("Video input: {}", video_path.display());
        tracing::info!("Audio input: {}", audio_path.display());

        require_file(&video_path, |path| LipsyncError::VideoNotFound { path })?;
        require_file(&audio_path, |path| LipsyncError::AudioNotFound { path })?;
        let (checkpoint, unet_config) = self.resolve_model_files()?;

        let temp_dir = self.host.temp_directory();
        std::fs::create_dir_all(&temp_dir)?;
        let video_out_path = self.output_path_in(&temp_dir);

        let args = InvocationArgs::new(
            unet_config,
            checkpoint,
            video_path,
            audio_path,
            video_out_path,
            params.inference_steps,
            params.guidance_scale,
            params.seed,
        );
        self.invoke(&args)?;
        Ok(args.video_out_path().to_path_buf())
    }

    /// Waveform variant: the audio tensor is staged to a WAV file in a fresh
    /// scratch directory, which also receives the output.
    ///
    /// The staged WAV is removed on success and on failure. The input video
    /// is removed too when [`NodeConfig::remove_source_video`] is set.
    pub fn generate_lipsync_from_waveform(
        &mut self,
        video_path: &str,
        waveform: &Waveform,
        params: GenerationParams,
    ) -> Result<PathBuf> {
        let video_path = clean_path_input(video_path, "video")?;
        params.validate()?;
        let planar = waveform.to_planar()?;

        tracing::info!("Video input: {}", video_path.display());
        tracing::info!(
            "Audio input: waveform {} ch x {} samples @ {} Hz",
            planar.channels,
            planar.samples,
            planar.sample_rate
        );

        require_file(&video_path, |path| LipsyncError::VideoNotFound { path })?;
        let (checkpoint, unet_config) = self.resolve_model_files()?;

        let mut staged = StagedInputs::new();
        if self.config.remove_source_video {
            staged.track(video_path.clone());
        }

        let temp_root = self.host.temp_directory();
        std::fs::create_dir_all(&temp_root)?;
        let scratch_dir = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir_in(&temp_root)?
            .keep();
        staged.scratch_dir = Some(scratch_dir.clone());

        let audio_path = scratch_dir.join(STAGED_AUDIO_NAME);
        staged.track(audio_path.clone());
        planar.write_pcm16(&audio_path)?;

        let video_out_path = self.output_path_in(&scratch_dir);
        let args = InvocationArgs::new(
            unet_config,
            checkpoint,
            video_path,
            audio_path,
            video_out_path,
            params.inference_steps,
            params.guidance_scale,
            params.seed,
        );
        self.invoke(&args)?;

        staged.keep_scratch_dir = true;
        Ok(args.video_out_path().to_path_buf())
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn resolve_model_files(&self) -> Result<(PathBuf, PathBuf)> {
        let checkpoint = self.config.checkpoint_file();
        let unet_config = self.config.unet_config_file();
        require_file(&checkpoint, |path| LipsyncError::CheckpointNotFound { path })?;
        require_file(&unet_config, |path| LipsyncError::ConfigNotFound { path })?;
        Ok((checkpoint, unet_config))
    }

    fn output_path_in(&self, dir: &Path) -> PathBuf {
        dir.join(output_file_name(
            &self.config.output_prefix,
            &self.config.output_extension,
            Local::now(),
        ))
    }

    fn apply_seed(&mut self, policy: SeedPolicy) {
        match policy {
            SeedPolicy::Fixed(seed) => {
                self.backend.set_seed(seed);
                tracing::info!("Initial seed: {}", seed);
            }
            SeedPolicy::Random => {
                let seed = self.backend.reseed();
                tracing::info!("Initial seed: {} (random)", seed);
            }
        }
    }

    fn invoke(&mut self, args: &InvocationArgs) -> Result<()> {
        let config = UnetConfig::load(args.unet_config_path())?;
        self.apply_seed(args.seed_policy());

        tracing::debug!(
            "UNet config {}: num_frames={:?} resolution={:?}",
            config.path().display(),
            config.lookup("data.num_frames").and_then(|v| v.as_u64()),
            config.lookup("data.resolution").and_then(|v| v.as_u64())
        );
        tracing::info!(
            "Generating {} ({} steps, guidance {})",
            args.video_out_path().display(),
            args.inference_steps(),
            args.guidance_scale()
        );
        self.backend.infer(&config, args).map_err(|e| {
            let message = format!("{e:#}");
            tracing::error!("Error during generation: {}", message);
            LipsyncError::Inference { message }
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
