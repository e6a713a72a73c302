//! Configuration of [`FusionModel`](super::FusionModel).
use crate::{encoder::EncoderConfig, opt::OptimizerConfig};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
/// Configuration of [`FusionModel`](super::FusionModel).
///
/// Both encoders are built from the same `encoder` configuration.
pub struct FusionModelConfig {
    /// Configuration of the encoders of `M` and `Phi`.
    pub encoder: EncoderConfig,

    /// Number of hidden units of the fusion head.
    pub hidden_units: usize,

    /// Dimension of the control output.
    pub out_dim: usize,

    /// Optimizer configuration.
    pub opt_config: OptimizerConfig,
}

impl Default for FusionModelConfig {
    fn default() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            hidden_units: 3,
            out_dim: 2,
            opt_config: OptimizerConfig::default(),
        }
    }
}

impl FusionModelConfig {
    /// Sets the configuration of the encoders.
    pub fn encoder(mut self, v: EncoderConfig) -> Self {
        self.encoder = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Dimension of the input of the fusion head, the two encoder outputs
    /// concatenated.
    pub fn fused_dim(&self) -> usize {
        2 * self.encoder.out_dim
    }

    /// Constructs [`FusionModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of fusion model from {:?}", path_);
        Ok(b)
    }

    /// Saves [`FusionModelConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of fusion model into {:?}", path_);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoder::ForwardMode;
    use tempdir::TempDir;

    #[test]
    fn test_serde_fusion_model_config() -> Result<()> {
        let config = FusionModelConfig::default()
            .encoder(EncoderConfig::default().forward_mode(ForwardMode::Passthrough))
            .opt_config(OptimizerConfig::Sgd {
                lr: 0.05,
                momentum: 0.5,
            });
        let dir = TempDir::new("fusion_model_config")?;
        let path = dir.path().join("fusion_model.yaml");
        config.save(&path)?;
        assert_eq!(config, FusionModelConfig::load(&path)?);
        assert_eq!(config.fused_dim(), 4);
        Ok(())
    }
}
