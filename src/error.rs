//! Error types for the lip-sync node.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LipsyncError {
    // Input validation
    #[error("{field} path must not be empty, provide a valid {field} file path")]
    EmptyInput { field: &'static str },

    #[error("{name} must be within [{min}, {max}], got {value}")]
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    // Missing files
    #[error("Video file not found: {}", .path.display())]
    VideoNotFound { path: PathBuf },

    #[error("Audio file not found: {}", .path.display())]
    AudioNotFound { path: PathBuf },

    #[error("Checkpoint file not found: {}", .path.display())]
    CheckpointNotFound { path: PathBuf },

    #[error("Config file not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    // Waveform staging
    #[error("Malformed audio waveform: {message}")]
    MalformedWaveform { message: String },

    #[error("Failed to stage audio: {0}")]
    Wav(#[from] hound::Error),

    // Configuration
    #[error("Failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse node settings: {0}")]
    Settings(#[from] serde_json::Error),

    // Collaborator
    #[error("Error during generation: {message}")]
    Inference { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LipsyncError {
    /// True for failures raised before the inference collaborator is called
    /// because of bad caller input or a missing file.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyInput { .. }
                | Self::ParameterOutOfRange { .. }
                | Self::VideoNotFound { .. }
                | Self::AudioNotFound { .. }
                | Self::CheckpointNotFound { .. }
                | Self::ConfigNotFound { .. }
                | Self::MalformedWaveform { .. }
        )
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedWaveform {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LipsyncError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_empty_input_display() {
        let error = LipsyncError::EmptyInput { field: "video" };
        assert_eq!(
            error.to_string(),
            "video path must not be empty, provide a valid video file path"
        );
    }

    #[test]
    fn test_not_found_names_path() {
        let error = LipsyncError::CheckpointNotFound {
            path: PathBuf::from("/opt/latentsync/checkpoints/latentsync_unet.pt"),
        };
        assert_eq!(
            error.to_string(),
            "Checkpoint file not found: /opt/latentsync/checkpoints/latentsync_unet.pt"
        );
    }

    #[test]
    fn test_inference_display_carries_message() {
        let error = LipsyncError::Inference {
            message: "CUDA out of memory".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Error during generation: CUDA out of memory"
        );
    }

    #[test]
    fn test_parameter_out_of_range_display() {
        let error = LipsyncError::ParameterOutOfRange {
            name: "inference_steps",
            value: 0.0,
            min: 1.0,
            max: 100.0,
        };
        assert_eq!(
            error.to_string(),
            "inference_steps must be within [1, 100], got 0"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(LipsyncError::EmptyInput { field: "audio" }.is_validation());
        assert!(LipsyncError::malformed("rank 4").is_validation());
        assert!(LipsyncError::ConfigNotFound {
            path: PathBuf::from("stage2.yaml")
        }
        .is_validation());
        assert!(!LipsyncError::Inference {
            message: "boom".to_string()
        }
        .is_validation());
        assert!(!LipsyncError::Io(io::Error::new(io::ErrorKind::Other, "disk")).is_validation());
    }

    #[test]
    fn test_from_io_error_keeps_source() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: LipsyncError = io_error.into();
        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<LipsyncError>();
        assert_sync::<LipsyncError>();
    }
}
