//! Declarative input/output schema the editor uses to draw the node.
//!
//! Serialises to JSON in the shape
//!
//! ```json
//! {
//!   "name": "LatentSyncNode",
//!   "display_name": "LatentSync Lip Sync",
//!   "category": "LatentSync",
//!   "function": "generate_lipsync",
//!   "inputs": { "required": [ … ], "optional": [ … ] },
//!   "outputs": [ { "name": "output_video_path", "kind": "STRING" } ]
//! }
//! ```

use serde::Serialize;

pub const NODE_NAME: &str = "LatentSyncNode";
pub const DISPLAY_NAME: &str = "LatentSync Lip Sync";
pub const CATEGORY: &str = "LatentSync";
pub const FUNCTION: &str = "generate_lipsync";

pub const DEFAULT_INFERENCE_STEPS: u32 = 20;
pub const MIN_INFERENCE_STEPS: u32 = 1;
pub const MAX_INFERENCE_STEPS: u32 = 100;

pub const DEFAULT_GUIDANCE_SCALE: f32 = 1.5;
pub const MIN_GUIDANCE_SCALE: f32 = 0.1;
pub const MAX_GUIDANCE_SCALE: f32 = 20.0;
pub const GUIDANCE_SCALE_STEP: f32 = 0.1;

/// Widget/socket type of one input or output.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputKind {
    String {
        default: String,
        multiline: bool,
        placeholder: String,
    },
    Int {
        default: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Float {
        default: f32,
        min: f32,
        max: f32,
        step: f32,
    },
    Audio,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InputSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: InputKind,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InputGroups {
    pub required: Vec<InputSpec>,
    pub optional: Vec<InputSpec>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutputSpec {
    pub name: &'static str,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeSchema {
    pub name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub function: &'static str,
    pub inputs: InputGroups,
    pub outputs: Vec<OutputSpec>,
}

fn path_input(name: &'static str, placeholder: &str) -> InputSpec {
    InputSpec {
        name,
        kind: InputKind::String {
            default: String::new(),
            multiline: false,
            placeholder: placeholder.to_string(),
        },
    }
}

impl NodeSchema {
    /// Schema of the lip-sync node. Audio comes either from `audio_path` or
    /// from an `audio` tensor socket; the tensor wins when both are set.
    pub fn lipsync() -> Self {
        Self {
            name: NODE_NAME,
            display_name: DISPLAY_NAME,
            category: CATEGORY,
            function: FUNCTION,
            inputs: InputGroups {
                required: vec![
                    path_input("video_path", "Input video path, e.g. /path/to/video.mp4"),
                    InputSpec {
                        name: "num_inference_steps",
                        kind: InputKind::Int {
                            default: DEFAULT_INFERENCE_STEPS as i64,
                            min: Some(MIN_INFERENCE_STEPS as i64),
                            max: Some(MAX_INFERENCE_STEPS as i64),
                        },
                    },
                    InputSpec {
                        name: "guidance_scale",
                        kind: InputKind::Float {
                            default: DEFAULT_GUIDANCE_SCALE,
                            min: MIN_GUIDANCE_SCALE,
                            max: MAX_GUIDANCE_SCALE,
                            step: GUIDANCE_SCALE_STEP,
                        },
                    },
                    InputSpec {
                        name: "seed",
                        kind: InputKind::Int {
                            default: crate::args::RANDOM_SEED,
                            min: None,
                            max: None,
                        },
                    },
                ],
                optional: vec![
                    path_input("audio_path", "Input audio path, e.g. /path/to/audio.wav"),
                    InputSpec {
                        name: "audio",
                        kind: InputKind::Audio,
                    },
                ],
            },
            outputs: vec![OutputSpec {
                name: "output_video_path",
                kind: "STRING",
            }],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Registry entry: class name, display name, schema.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRegistration {
    pub class_name: &'static str,
    pub display_name: &'static str,
    pub schema: NodeSchema,
}

/// Every node class this crate provides.
pub fn registry() -> Vec<NodeRegistration> {
    vec![NodeRegistration {
        class_name: NODE_NAME,
        display_name: DISPLAY_NAME,
        schema: NodeSchema::lipsync(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn schema_json() -> Value {
        serde_json::from_str(&NodeSchema::lipsync().to_json().unwrap()).unwrap()
    }

    fn find<'a>(group: &'a Value, name: &str) -> &'a Value {
        group
            .as_array()
            .unwrap()
            .iter()
            .find(|i| i["name"] == name)
            .unwrap()
    }

    #[test]
    fn test_step_bounds() {
        let json = schema_json();
        let steps = find(&json["inputs"]["required"], "num_inference_steps");
        assert_eq!(steps["kind"], "INT");
        assert_eq!(steps["default"], 20);
        assert_eq!(steps["min"], 1);
        assert_eq!(steps["max"], 100);
    }

    #[test]
    fn test_guidance_bounds() {
        let json = schema_json();
        let g = find(&json["inputs"]["required"], "guidance_scale");
        assert_eq!(g["kind"], "FLOAT");
        assert_eq!(g["default"].as_f64(), Some(1.5));
        assert!((g["min"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(g["max"].as_f64(), Some(20.0));
    }

    #[test]
    fn test_seed_unbounded_default_random() {
        let json = schema_json();
        let seed = find(&json["inputs"]["required"], "seed");
        assert_eq!(seed["default"], -1);
        assert!(seed.get("min").is_none());
    }

    #[test]
    fn test_single_string_output() {
        let json = schema_json();
        assert_eq!(json["outputs"].as_array().unwrap().len(), 1);
        assert_eq!(json["outputs"][0]["name"], "output_video_path");
        assert_eq!(json["outputs"][0]["kind"], "STRING");
        assert_eq!(json["function"], "generate_lipsync");
    }

    #[test]
    fn test_audio_sources_optional() {
        let json = schema_json();
        assert_eq!(find(&json["inputs"]["optional"], "audio")["kind"], "AUDIO");
        assert_eq!(find(&json["inputs"]["optional"], "audio_path")["kind"], "STRING");
    }

    #[test]
    fn test_registry() {
        let nodes = registry();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].class_name, "LatentSyncNode");
        assert_eq!(nodes[0].schema.category, "LatentSync");
    }
}
