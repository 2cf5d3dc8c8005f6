//! # latentsync-node
//!
//! A graph-editor node around the [LatentSync](https://github.com/bytedance/LatentSync)
//! lip-sync pipeline. The node takes a video, an audio file or in-graph
//! audio tensor, and a few sampling parameters, runs the external inference
//! script and hands back the path of the generated video.
//!
//! ## Quick start
//!
//! ```no_run
//! use latentsync_node::{CommandBackend, GenerationParams, LipsyncNode, NodeConfig, SystemTemp};
//!
//! let config = NodeConfig::with_install_dir("/opt/LatentSync");
//! let backend = CommandBackend::from_config(&config);
//! let mut node = LipsyncNode::new(config, backend, SystemTemp);
//!
//! let output = node
//!     .generate_lipsync("/clips/face.mp4", "/clips/voice.wav", GenerationParams::default())
//!     .unwrap();
//! println!("{}", output.display());
//! ```
//!
//! ## Invocation
//! 1. **Validate** — path inputs are trimmed of whitespace and quotes, must be
//!    non-empty, and must exist together with the UNet checkpoint and config.
//! 2. **Stage** — audio tensors are written to a 16-bit PCM WAV in a fresh
//!    scratch directory.
//! 3. **Seed** — `-1` draws a random seed, anything else is applied as is.
//! 4. **Invoke** — the UNet config is loaded and the [`LipsyncBackend`] runs.
//! 5. **Cleanup** — staged audio is removed whether or not inference succeeded.

// Model download from HuggingFace Hub is desktop-only: mobile builds ship
// the checkpoint with the app.
#[cfg(not(any(target_os = "ios", target_os = "android")))]
pub mod download;

// C ABI for the host editor process.
pub mod ffi;

pub mod args;
pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod host;
pub mod node;
pub mod npy;
pub mod paths;
pub mod schema;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use args::{InvocationArgs, SeedPolicy, RANDOM_SEED};
pub use audio::{AudioInput, Waveform};
pub use backend::{CommandBackend, LipsyncBackend};
pub use config::{NodeConfig, UnetConfig};
pub use error::{LipsyncError, Result};
pub use host::{FixedTempDir, HostEnvironment, SystemTemp};
pub use node::{GenerationParams, LipsyncNode};
pub use schema::{registry, NodeSchema};
