use super::FusionModelConfig;
use crate::{
    encoder::Encoder,
    model::{SubModel1, SubModel2},
    util::xavier_linear,
};
use anyhow::Result;
use candle_core::{Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};

/// Two encoders followed by a fusion head.
///
/// Parameters are registered as `encoder_a.*`, `encoder_b.*`, `hidden.*` and
/// `output.*`.
pub struct FusionNet {
    encoder_a: Encoder,
    encoder_b: Encoder,
    hidden: Linear,
    output: Linear,
}

impl SubModel2 for FusionNet {
    type Config = FusionModelConfig;
    type Input1 = Tensor;
    type Input2 = Tensor;
    type Output = Tensor;

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let encoder_a = Encoder::build(vb.pp("encoder_a"), config.encoder.clone())?;
        let encoder_b = Encoder::build(vb.pp("encoder_b"), config.encoder.clone())?;
        let hidden = xavier_linear(config.fused_dim(), config.hidden_units, vb.pp("hidden"))?;
        let output = xavier_linear(config.hidden_units, config.out_dim, vb.pp("output"))?;

        Ok(Self {
            encoder_a,
            encoder_b,
            hidden,
            output,
        })
    }

    /// Computes the control from `M` and `Phi`, both of shape `[batch, 2]`.
    fn forward(&self, m: &Tensor, phi: &Tensor) -> Result<Tensor> {
        let x1 = self.encoder_a.forward(m)?;
        let x2 = self.encoder_b.forward(phi)?;
        let xs = Tensor::cat(&[&x1, &x2], D::Minus1)?;
        let xs = self.hidden.forward(&xs)?.relu()?;
        Ok(self.output.forward(&xs)?)
    }
}
