use super::{FusionModelConfig, FusionNet};
use crate::{model::SubModel2, opt::Optimizer};
use anyhow::{ensure, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use std::path::Path;
use swarmctl_core::record::Record;

/// Fusion controller owning its parameters and optimizer.
///
/// All parameters are registered in a single [`VarMap`], which is what
/// [`FusionModel::save`] writes and [`FusionModel::load`] reads.
pub struct FusionModel {
    device: Device,
    varmap: VarMap,

    /// The network.
    net: FusionNet,

    /// Optimizer over all parameters of `net`.
    opt: Optimizer,

    config: FusionModelConfig,
}

impl FusionModel {
    /// Constructs [`FusionModel`] with freshly initialized parameters.
    pub fn build(config: FusionModelConfig, device: Device) -> Result<Self> {
        let varmap = VarMap::new();
        let net = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            FusionNet::build(vb, config.clone())?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            net,
            opt,
            config,
        })
    }

    /// Computes controls from `M` and `Phi`, both of shape `[batch, 2]`.
    ///
    /// The inputs are moved to the device of the model.
    pub fn forward(&self, m: &Tensor, phi: &Tensor) -> Result<Tensor> {
        let m = m.to_device(&self.device)?;
        let phi = phi.to_device(&self.device)?;
        self.net.forward(&m, &phi)
    }

    /// Backpropagates `loss` and updates the parameters.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// Computes the control for a single sample `[Mx, My, Phix, Phiy]`.
    pub fn predict(&self, input: [f32; 4]) -> Result<[f32; 2]> {
        let m = Tensor::from_slice(&input[..2], (1, 2), &self.device)?;
        let phi = Tensor::from_slice(&input[2..], (1, 2), &self.device)?;
        let u = self.forward(&m, &phi)?.flatten_all()?.to_vec1::<f32>()?;
        ensure!(u.len() == 2, "expected 2 outputs, got {}", u.len());
        Ok([u[0], u[1]])
    }

    /// The device on which parameters live.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The configuration the model was built with.
    pub fn config(&self) -> &FusionModelConfig {
        &self.config
    }

    /// All trainable parameters, keyed by their names.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Mean and standard deviation of every parameter.
    pub fn param_stats(&self) -> Result<Record> {
        crate::util::param_stats(&self.varmap)
    }

    /// Saves the parameters in safetensors format.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save fusion model to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads parameters saved by [`FusionModel::save`].
    ///
    /// The file must contain every parameter of this model with the same
    /// shape.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load fusion model from {:?}", path.as_ref());
        Ok(())
    }
}
