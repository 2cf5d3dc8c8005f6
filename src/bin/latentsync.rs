//! `latentsync` — run the lip-sync node from a shell.
//!
//! ```text
//! latentsync run --install-dir /opt/LatentSync --video face.mp4 --audio voice.wav
//! latentsync run --install-dir /opt/LatentSync --video face.mp4 --audio-npy voice.npy --sample-rate 16000
//! latentsync schema
//! latentsync fetch --install-dir /opt/LatentSync
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use latentsync_node::{
    npy, AudioInput, CommandBackend, FixedTempDir, GenerationParams, HostEnvironment,
    LipsyncNode, NodeConfig, NodeSchema, SystemTemp,
};

#[derive(Parser)]
#[command(name = "latentsync", version, about = "LatentSync lip-sync node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a lip-synced video
    Run(RunArgs),
    /// Print the node schema as JSON
    Schema,
    /// Download the UNet checkpoint into the install directory
    Fetch(InstallArgs),
}

#[derive(Args)]
struct InstallArgs {
    /// LatentSync checkout
    #[arg(long, default_value = ".")]
    install_dir: PathBuf,

    /// Node settings JSON; --install-dir overrides its install_dir
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    install: InstallArgs,

    /// Input video
    #[arg(long)]
    video: String,

    /// Input audio file
    #[arg(long, conflicts_with = "audio_npy", required_unless_present = "audio_npy")]
    audio: Option<String>,

    /// Input audio tensor saved with numpy (`[channels, samples]`)
    #[arg(long, requires = "sample_rate")]
    audio_npy: Option<PathBuf>,

    /// Sample rate of --audio-npy
    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long, default_value_t = 20)]
    steps: u32,

    #[arg(long, default_value_t = 1.5)]
    guidance: f32,

    /// -1 picks a random seed
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    seed: i64,

    /// Scratch directory (defaults to the system temp dir)
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

fn load_config(args: &InstallArgs) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::from_json_file(path)?,
        None => NodeConfig::default(),
    };
    config.install_dir = args.install_dir.clone();
    Ok(config)
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.install)?;
    let backend = CommandBackend::from_config(&config);

    let audio = match (&args.audio, &args.audio_npy, args.sample_rate) {
        (_, Some(path), Some(rate)) => AudioInput::Waveform(npy::load_waveform(path, rate)?),
        (Some(path), _, _) => AudioInput::Path(path.clone()),
        _ => anyhow::bail!("either --audio or --audio-npy with --sample-rate is required"),
    };
    let params = GenerationParams {
        inference_steps: args.steps,
        guidance_scale: args.guidance,
        seed: args.seed,
    };

    let output = match args.temp_dir {
        Some(dir) => generate(config, backend, FixedTempDir(dir), &args.video, audio, params)?,
        None => generate(config, backend, SystemTemp, &args.video, audio, params)?,
    };
    println!("{}", output.display());
    Ok(())
}

fn generate<H: HostEnvironment>(
    config: NodeConfig,
    backend: CommandBackend,
    host: H,
    video: &str,
    audio: AudioInput,
    params: GenerationParams,
) -> Result<PathBuf> {
    let mut node = LipsyncNode::new(config, backend, host);
    Ok(node.generate(video, audio, params)?)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("latentsync_node=info,latentsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Run(args) => run(args),
        Command::Schema => {
            let json = NodeSchema::lipsync()
                .to_json()
                .context("Failed to serialise schema")?;
            println!("{json}");
            Ok(())
        }
        Command::Fetch(args) => {
            let config = load_config(&args)?;
            let path = latentsync_node::download::fetch_checkpoint(&config)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
