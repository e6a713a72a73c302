//! Encoder of a 2-dimensional error vector.
use crate::{model::SubModel1, util::xavier_linear};
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::{Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

/// How the layers of an [`Encoder`] are composed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ForwardMode {
    /// `output(relu(hidden(relu(input(x)))))`.
    #[default]
    Sequential,

    /// Every stage reads the raw input and only the last one is returned,
    /// i.e., the encoder computes `output(x)`.
    ///
    /// This reproduces models trained with the stage outputs discarded.
    /// Stages are sized to accept the raw input, and `input`/`hidden` are
    /// kept as parameters so that checkpoints have the same keys in both
    /// modes, but they never affect the output nor receive gradients.
    Passthrough,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Encoder`].
pub struct EncoderConfig {
    /// Dimension of the input vector.
    pub in_dim: usize,

    /// Number of hidden units.
    pub units: usize,

    /// Dimension of the output vector.
    pub out_dim: usize,

    /// Composition of the layers.
    #[serde(default)]
    pub forward_mode: ForwardMode,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            in_dim: 2,
            units: 3,
            out_dim: 2,
            forward_mode: ForwardMode::default(),
        }
    }
}

impl EncoderConfig {
    /// Sets the forward mode.
    pub fn forward_mode(mut self, v: ForwardMode) -> Self {
        self.forward_mode = v;
        self
    }
}

/// Three-layer perceptron with ReLU activations.
///
/// Layers are named `input`, `hidden` and `output` under the prefix of the
/// [`VarBuilder`] given to [`SubModel1::build`].
pub struct Encoder {
    input: Linear,
    hidden: Linear,
    output: Linear,
    forward_mode: ForwardMode,
}

impl Encoder {
    /// The forward mode of this encoder.
    pub fn forward_mode(&self) -> ForwardMode {
        self.forward_mode
    }
}

impl SubModel1 for Encoder {
    type Config = EncoderConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let EncoderConfig {
            in_dim,
            units,
            out_dim,
            forward_mode,
        } = config;
        let (hidden_in, output_in) = match forward_mode {
            ForwardMode::Sequential => (units, units),
            ForwardMode::Passthrough => (in_dim, in_dim),
        };

        Ok(Self {
            input: xavier_linear(in_dim, units, vb.pp("input"))?,
            hidden: xavier_linear(hidden_in, units, vb.pp("hidden"))?,
            output: xavier_linear(output_in, out_dim, vb.pp("output"))?,
            forward_mode,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = match self.forward_mode {
            ForwardMode::Sequential => {
                let xs = self.input.forward(xs)?.relu()?;
                let xs = self.hidden.forward(&xs)?.relu()?;
                self.output.forward(&xs)?
            }
            ForwardMode::Passthrough => self.output.forward(xs)?,
        };
        Ok(xs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn build(mode: ForwardMode) -> Result<(VarMap, Encoder)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let encoder = Encoder::build(vb.pp("enc"), EncoderConfig::default().forward_mode(mode))?;
        Ok((varmap, encoder))
    }

    fn set(varmap: &VarMap, name: &str, t: Tensor) -> Result<()> {
        let data = varmap.data().lock().unwrap();
        data.get(name).unwrap().set(&t)?;
        Ok(())
    }

    fn zero_biases(varmap: &VarMap) -> Result<()> {
        for (name, dim) in [
            ("enc.input.bias", 3usize),
            ("enc.hidden.bias", 3),
            ("enc.output.bias", 2),
        ] {
            set(varmap, name, Tensor::zeros(dim, DType::F32, &Device::Cpu)?)?;
        }
        Ok(())
    }

    #[test]
    fn test_output_shape() -> Result<()> {
        for mode in [ForwardMode::Sequential, ForwardMode::Passthrough] {
            let (_varmap, encoder) = build(mode)?;
            let xs = Tensor::new(&[[0.5f32, -1.0], [2.0, 0.1], [0.0, 0.0]], &Device::Cpu)?;
            assert_eq!(encoder.forward(&xs)?.dims(), &[3, 2]);
        }
        Ok(())
    }

    #[test]
    fn test_passthrough_zero_input() -> Result<()> {
        let (varmap, encoder) = build(ForwardMode::Passthrough)?;
        zero_biases(&varmap)?;
        let xs = Tensor::zeros((1, 2), DType::F32, &Device::Cpu)?;
        let ys: Vec<Vec<f32>> = encoder.forward(&xs)?.to_vec2()?;
        assert_eq!(ys, vec![vec![0f32, 0.0]]);
        Ok(())
    }

    #[test]
    fn test_passthrough_ignores_hidden_layers() -> Result<()> {
        let (varmap, encoder) = build(ForwardMode::Passthrough)?;
        let xs = Tensor::new(&[[0.7f32, -0.3]], &Device::Cpu)?;
        let ys1: Vec<Vec<f32>> = encoder.forward(&xs)?.to_vec2()?;

        set(&varmap, "enc.input.weight", Tensor::ones((3, 2), DType::F32, &Device::Cpu)?)?;
        set(&varmap, "enc.hidden.weight", Tensor::ones((3, 2), DType::F32, &Device::Cpu)?)?;
        let ys2: Vec<Vec<f32>> = encoder.forward(&xs)?.to_vec2()?;
        assert_eq!(ys1, ys2);

        // output(x) = W x + b
        let w = Tensor::new(&[[1f32, 2.0], [3.0, 4.0]], &Device::Cpu)?;
        set(&varmap, "enc.output.weight", w)?;
        zero_biases(&varmap)?;
        let ys3: Vec<Vec<f32>> = encoder.forward(&xs)?.to_vec2()?;
        assert!((ys3[0][0] - 0.1).abs() < 1e-6);
        assert!((ys3[0][1] - 0.9).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_sequential_uses_hidden_layers() -> Result<()> {
        let (varmap, encoder) = build(ForwardMode::Sequential)?;
        zero_biases(&varmap)?;
        set(&varmap, "enc.input.weight", Tensor::ones((3, 2), DType::F32, &Device::Cpu)?)?;
        set(&varmap, "enc.hidden.weight", Tensor::ones((3, 3), DType::F32, &Device::Cpu)?)?;
        set(&varmap, "enc.output.weight", Tensor::ones((2, 3), DType::F32, &Device::Cpu)?)?;

        // input: 3 x (1 + 1) = [2, 2, 2], hidden: [6, 6, 6], output: [18, 18]
        let xs = Tensor::new(&[[1f32, 1.0]], &Device::Cpu)?;
        let ys1: Vec<Vec<f32>> = encoder.forward(&xs)?.to_vec2()?;
        assert_eq!(ys1, vec![vec![18f32, 18.0]]);

        let hidden = (Tensor::ones((3, 3), DType::F32, &Device::Cpu)? * 2.0)?;
        set(&varmap, "enc.hidden.weight", hidden)?;
        let ys2: Vec<Vec<f32>> = encoder.forward(&xs)?.to_vec2()?;
        assert_eq!(ys2, vec![vec![36f32, 36.0]]);
        Ok(())
    }
}
