//! Basic example — lip-syncs a video to a generated test tone.
//!
//! Usage:
//!   cargo run --example basic -- --install-dir /opt/LatentSync --video face.mp4
//!   cargo run --example basic -- --install-dir /opt/LatentSync --video face.mp4 --audio voice.wav
//!
//! Requirements:
//!   - a LatentSync checkout with `checkpoints/latentsync_unet.pt`
//!   - its Python environment on $PATH as `python`

use latentsync_node::{
    AudioInput, CommandBackend, GenerationParams, LipsyncNode, NodeConfig, SystemTemp, Waveform,
};

/// One second of a 440 Hz sine at 16 kHz.
fn test_tone() -> Waveform {
    let rate = 16_000u32;
    let samples = (0..rate)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / rate as f32).sin() * 0.3)
        .collect();
    Waveform::mono(samples, rate)
}

fn main() -> anyhow::Result<()> {
    // ── Parse simple CLI arguments ───────────────────────────────────────────
    let mut args = std::env::args().skip(1);

    let mut install_dir = ".".to_string();
    let mut video       = String::new();
    let mut audio       = None;
    let mut steps       = 20u32;
    let mut seed        = -1i64;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--install-dir" => { if let Some(v) = args.next() { install_dir = v; } }
            "--video"       => { if let Some(v) = args.next() { video = v; } }
            "--audio"       => { audio = args.next(); }
            "--steps"       => { if let Some(v) = args.next() { steps = v.parse().unwrap_or(20); } }
            "--seed"        => { if let Some(v) = args.next() { seed = v.parse().unwrap_or(-1); } }
            "--help"        => {
                println!(
                    "Usage: basic --install-dir DIR --video FILE \
                     [--audio FILE] [--steps N] [--seed N]"
                );
                return Ok(());
            }
            _ => {}
        }
    }

    let config = NodeConfig::with_install_dir(&install_dir);
    println!("Install    : {}", install_dir);
    println!("Checkpoint : {}", config.checkpoint_file().display());
    println!("Video      : {}", video);
    println!("Audio      : {}", audio.as_deref().unwrap_or("<440 Hz test tone>"));
    println!();

    let backend = CommandBackend::from_config(&config);
    let mut node = LipsyncNode::new(config, backend, SystemTemp);

    let audio = match audio {
        Some(path) => AudioInput::Path(path),
        None => AudioInput::Waveform(test_tone()),
    };
    let params = GenerationParams {
        inference_steps: steps,
        seed,
        ..GenerationParams::default()
    };

    println!("Generating…");
    let output = node.generate(&video, audio, params)?;
    println!("Done: {}", output.display());
    Ok(())
}
