//! Graph descriptions.
//!
//! A [`GraphConfig`] is a serde tree mirroring the factory types, so a whole
//! graph can live in a YAML file:
//!
//! ```yaml
//! sources:
//!   base_dir: samples
//! graph:
//!   kind: resample
//!   quality: sinc
//!   target: { rate: 48000, channels: 2, format: s16 }
//!   input:
//!     kind: double
//!     first:  { kind: file, path: intro.wav }
//!     second: { kind: rectify, input: { kind: sinus, frequency: 220.0, rate: 44100 } }
//! ```

use std::{fs, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AudError, AudResult},
    graph::{
        extensions::FactoryExt, file::FileFactory, node::BoxedFactory, sinus::SinusFactory,
        SourceConfig,
    },
    spec::DeviceSpec,
};

fn default_q() -> f32 {
    std::f32::consts::FRAC_1_SQRT_2
}

/// Interpolation used by a `resample` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Linear,
    #[default]
    Sinc,
}

/// One node of a graph description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum NodeConfig {
    Sinus {
        frequency: f32,
        rate: u32,
    },
    File {
        path: std::path::PathBuf,
    },
    Double {
        first: Box<NodeConfig>,
        second: Box<NodeConfig>,
    },
    Sum {
        input: Box<NodeConfig>,
    },
    Rectify {
        input: Box<NodeConfig>,
    },
    Iir {
        input: Box<NodeConfig>,
        b: Vec<f32>,
        a: Vec<f32>,
    },
    Volume {
        input: Box<NodeConfig>,
        gain: f32,
    },
    Lowpass {
        input: Box<NodeConfig>,
        cutoff: f32,
        #[serde(default = "default_q")]
        q: f32,
    },
    Highpass {
        input: Box<NodeConfig>,
        cutoff: f32,
        #[serde(default = "default_q")]
        q: f32,
    },
    Resample {
        input: Box<NodeConfig>,
        target: DeviceSpec,
        #[serde(default)]
        quality: Quality,
    },
}

impl NodeConfig {
    /// Build the factory tree described by this node.
    pub fn build(&self, sources: &SourceConfig) -> AudResult<BoxedFactory> {
        let factory = match self {
            NodeConfig::Sinus { frequency, rate } => SinusFactory::new(*frequency, *rate).boxed(),
            NodeConfig::File { path } => FileFactory::with_config(path, sources).boxed(),
            NodeConfig::Double { first, second } => {
                first.build(sources)?.then(second.build(sources)?).boxed()
            }
            NodeConfig::Sum { input } => input.build(sources)?.sum().boxed(),
            NodeConfig::Rectify { input } => input.build(sources)?.rectify().boxed(),
            NodeConfig::Iir { input, b, a } => input.build(sources)?.iir(b, a)?.boxed(),
            NodeConfig::Volume { input, gain } => input.build(sources)?.volume(*gain).boxed(),
            NodeConfig::Lowpass { input, cutoff, q } => {
                input.build(sources)?.lowpass(*cutoff, *q).boxed()
            }
            NodeConfig::Highpass { input, cutoff, q } => {
                input.build(sources)?.highpass(*cutoff, *q).boxed()
            }
            NodeConfig::Resample {
                input,
                target,
                quality,
            } => {
                target.validate()?;
                let input = input.build(sources)?;
                match quality {
                    Quality::Linear => input.resample_linear(*target).boxed(),
                    Quality::Sinc => input.resample_sinc(*target).boxed(),
                }
            }
        };
        Ok(factory)
    }
}

/// A graph plus the settings needed to build it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    #[serde(default)]
    pub sources: SourceConfig,
    pub graph: NodeConfig,
}

impl GraphConfig {
    pub fn from_yaml(text: &str) -> AudResult<Self> {
        serde_yaml::from_str(text)
            .map_err(|err| AudError::Configuration(format!("invalid graph description: {err}")))
    }

    /// Load a YAML description. Without an explicit `base_dir`, file paths
    /// resolve relative to the description's own directory.
    pub fn load(path: impl AsRef<Path>) -> AudResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| AudError::ResourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&text)?;

        if let Some(parent) = path.parent() {
            config.sources.base_dir = Some(match config.sources.base_dir.take() {
                Some(base) => parent.join(base),
                None => parent.to_path_buf(),
            });
        }
        debug!("loaded graph description {}", path.display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> AudResult<String> {
        serde_yaml::to_string(self)
            .map_err(|err| AudError::Configuration(format!("cannot serialize graph: {err}")))
    }

    pub fn build(&self) -> AudResult<BoxedFactory> {
        self.graph.build(&self.sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        graph::node::{read_to_end, AudioFactory, AudioReader},
        spec::{Channels, SampleFormat},
    };

    const RECTIFIED_TONE: &str = r#"
graph:
  kind: resample
  quality: linear
  target: { rate: 22050, channels: 2, format: s16 }
  input:
    kind: rectify
    input: { kind: sinus, frequency: 441.0, rate: 44100 }
"#;

    #[test]
    fn parses_and_builds_nested_graph() {
        let config = GraphConfig::from_yaml(RECTIFIED_TONE).unwrap();
        let factory = config.build().unwrap();
        let mut reader = factory.create_reader().unwrap();

        assert_eq!(reader.spec().rate, 22_050);
        assert_eq!(reader.spec().channels, Channels::STEREO);

        let samples = read_to_end(&mut reader, 512).unwrap();
        assert_eq!(samples.len(), 1_024);
        assert!(samples.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn defaults_fill_in() {
        let config = GraphConfig::from_yaml(
            r#"
graph:
  kind: lowpass
  cutoff: 1000.0
  input:
    kind: resample
    target: { rate: 48000, channels: 1 }
    input: { kind: sinus, frequency: 100.0, rate: 44100 }
"#,
        )
        .unwrap();

        let NodeConfig::Lowpass { q, input, .. } = &config.graph else {
            panic!("expected a lowpass node");
        };
        assert!((q - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        let NodeConfig::Resample { quality, target, .. } = input.as_ref() else {
            panic!("expected a resample node");
        };
        assert_eq!(*quality, Quality::Sinc);
        assert_eq!(target.format(), SampleFormat::Float32);
        assert_eq!(config.sources, SourceConfig::default());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = GraphConfig::from_yaml("graph: { kind: reverb, input: { kind: sum } }")
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn bad_coefficients_fail_when_building() {
        let config = GraphConfig::from_yaml(
            "graph: { kind: iir, b: [1.0], a: [0.0], input: { kind: sinus, frequency: 1.0, rate: 100 } }",
        )
        .unwrap();
        assert_eq!(config.build().err().unwrap().kind(), ErrorKind::Construction);
    }

    #[test]
    fn file_nodes_stay_lazy() {
        let config = GraphConfig::from_yaml("graph: { kind: file, path: missing.wav }").unwrap();
        let factory = config.build().unwrap();
        let err = factory.create_reader().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    }

    #[test]
    fn yaml_round_trip_preserves_graph() {
        let config = GraphConfig::from_yaml(RECTIFIED_TONE).unwrap();
        let again = GraphConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn load_resolves_against_description_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.yaml");
        fs::write(&path, "graph: { kind: file, path: tone.wav }").unwrap();

        let config = GraphConfig::load(&path).unwrap();
        assert_eq!(config.sources.base_dir.as_deref(), Some(dir.path()));
    }
}
