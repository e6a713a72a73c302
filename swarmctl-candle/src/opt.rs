//! Optimizers.
use anyhow::Result;
use candle_core::{backprop::GradStore, Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training the fusion model.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Stochastic gradient descent with momentum, see [`MomentumSgd`].
    Sgd {
        /// Learning rate.
        lr: f64,
        /// Momentum factor.
        #[serde(default = "default_momentum")]
        momentum: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },

    /// AdamW optimizer.
    AdamW {
        /// Learning rate.
        lr: f64,
        /// Decay of the first moment estimate.
        #[serde(default = "default_beta1")]
        beta1: f64,
        /// Decay of the second moment estimate.
        #[serde(default = "default_beta2")]
        beta2: f64,
        /// Added to the denominator.
        #[serde(default = "default_eps")]
        eps: f64,
        /// Decoupled weight decay.
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },
}

fn default_momentum() -> f64 {
    ParamsMomentumSgd::default().momentum
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

impl OptimizerConfig {
    /// Constructs an optimizer over `vars`.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::Sgd { lr, momentum } => {
                let params = ParamsMomentumSgd {
                    lr: *lr,
                    momentum: *momentum,
                };
                Ok(Optimizer::Sgd(MomentumSgd::new(vars, params)?))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                Ok(Optimizer::Adam(Adam::new(vars, params)?))
            }
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                Ok(Optimizer::AdamW(AdamW::new(vars, params)?))
            }
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::Sgd { momentum, .. } => Self::Sgd { lr, momentum },
            Self::Adam { .. } => Self::Adam { lr },
            Self::AdamW {
                beta1,
                beta2,
                eps,
                weight_decay,
                ..
            } => Self::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            },
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let params = ParamsMomentumSgd::default();
        Self::Sgd {
            lr: params.lr,
            momentum: params.momentum,
        }
    }
}

/// Optimizers.
pub enum Optimizer {
    /// SGD with momentum.
    Sgd(MomentumSgd),

    /// Adam optimizer.
    Adam(Adam),

    /// AdamW optimizer.
    AdamW(AdamW),
}

impl Optimizer {
    /// Computes gradients of `loss` and applies an update step.
    ///
    /// Gradients live in a [`GradStore`] created by this call and dropped at
    /// its end, so nothing accumulates across steps.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            Self::Sgd(opt) => Ok(opt.backward_step(loss)?),
            Self::Adam(opt) => Ok(opt.backward_step(loss)?),
            Self::AdamW(opt) => Ok(opt.backward_step(loss)?),
        }
    }
}

/// Parameters of [`MomentumSgd`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamsMomentumSgd {
    /// Learning rate.
    pub lr: f64,

    /// Momentum factor.
    pub momentum: f64,
}

impl Default for ParamsMomentumSgd {
    fn default() -> Self {
        Self {
            lr: 0.01,
            momentum: 0.9,
        }
    }
}

#[derive(Debug)]
struct VarVelocity {
    var: Var,
    velocity: Tensor,
}

/// Stochastic gradient descent with momentum.
///
/// Every parameter `p` has a velocity buffer `v`, zero at construction.
/// A step with gradient `g` does
///
/// ```text
/// v = momentum * v + g
/// p = p - lr * v
/// ```
///
/// Parameters without a gradient in the [`GradStore`] are skipped and their
/// velocity is kept.
#[derive(Debug)]
pub struct MomentumSgd {
    vars: Vec<VarVelocity>,
    params: ParamsMomentumSgd,
}

impl MomentumSgd {
    /// Returns the velocity of `var`, if it is optimized by this optimizer.
    pub fn velocity(&self, var: &Var) -> Option<&Tensor> {
        self.vars
            .iter()
            .find(|v| v.var.as_tensor().id() == var.as_tensor().id())
            .map(|v| &v.velocity)
    }
}

impl candle_nn::Optimizer for MomentumSgd {
    type Config = ParamsMomentumSgd;

    fn new(vars: Vec<Var>, params: ParamsMomentumSgd) -> candle_core::Result<Self> {
        let vars = vars
            .into_iter()
            .filter(|var| var.dtype().is_float())
            .map(|var| {
                let velocity = var.zeros_like()?;
                Ok(VarVelocity { var, velocity })
            })
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Self { vars, params })
    }

    fn learning_rate(&self) -> f64 {
        self.params.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.params.lr = lr
    }

    fn step(&mut self, grads: &GradStore) -> candle_core::Result<()> {
        let ParamsMomentumSgd { lr, momentum } = self.params;

        for v in self.vars.iter_mut() {
            if let Some(grad) = grads.get(v.var.as_tensor()) {
                let velocity = (v.velocity.affine(momentum, 0.)? + grad)?.detach();
                v.var.set(&v.var.sub(&velocity.affine(lr, 0.)?)?)?;
                v.velocity = velocity;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::Optimizer as _;

    #[test]
    fn test_momentum_sgd_update() -> Result<()> {
        // loss = sum(w * x), so the gradient of w is x at every step
        let w = Var::new(&[1f32, -2.0], &Device::Cpu)?;
        let x = Tensor::new(&[0.5f32, 2.0], &Device::Cpu)?;
        let params = ParamsMomentumSgd {
            lr: 0.1,
            momentum: 0.9,
        };
        let mut opt = MomentumSgd::new(vec![w.clone()], params)?;

        let loss = (w.as_tensor() * &x)?.sum_all()?;
        opt.backward_step(&loss)?;
        // v1 = x, w1 = w0 - 0.1 x
        let w1: Vec<f32> = w.as_tensor().to_vec1()?;
        assert!((w1[0] - 0.95).abs() < 1e-6);
        assert!((w1[1] - -2.2).abs() < 1e-6);

        let loss = (w.as_tensor() * &x)?.sum_all()?;
        opt.backward_step(&loss)?;
        // v2 = 0.9 x + x = 1.9 x, w2 = w1 - 0.19 x
        let w2: Vec<f32> = w.as_tensor().to_vec1()?;
        assert!((w2[0] - 0.855).abs() < 1e-6);
        assert!((w2[1] - -2.58).abs() < 1e-6);

        let v: Vec<f32> = opt.velocity(&w).unwrap().to_vec1()?;
        assert!((v[0] - 0.95).abs() < 1e-6);
        assert!((v[1] - 3.8).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_momentum_sgd_skips_vars_without_grad() -> Result<()> {
        let w = Var::new(&[1f32, 2.0], &Device::Cpu)?;
        let unused = Var::ones(2, DType::F32, &Device::Cpu)?;
        let mut opt = MomentumSgd::new(vec![w.clone(), unused.clone()], Default::default())?;

        let loss = w.as_tensor().sum_all()?;
        opt.backward_step(&loss)?;

        let u: Vec<f32> = unused.as_tensor().to_vec1()?;
        assert_eq!(u, vec![1.0, 1.0]);
        let v: Vec<f32> = opt.velocity(&unused).unwrap().to_vec1()?;
        assert_eq!(v, vec![0.0, 0.0]);
        Ok(())
    }

    /// Takes one step on `loss = sum(w * x)` from `w = [1, -2]` with
    /// `x = [0.5, 2]`.
    fn first_step(config: OptimizerConfig) -> Result<Vec<f32>> {
        let w = Var::new(&[1f32, -2.0], &Device::Cpu)?;
        let x = Tensor::new(&[0.5f32, 2.0], &Device::Cpu)?;
        let mut opt = config.build(vec![w.clone()])?;
        let loss = (w.as_tensor() * &x)?.sum_all()?;
        opt.backward_step(&loss)?;
        Ok(w.as_tensor().to_vec1()?)
    }

    #[test]
    fn test_adam_step() -> Result<()> {
        // The first Adam step moves every parameter by about lr against the
        // sign of its gradient
        let w = first_step(OptimizerConfig::Adam { lr: 0.1 })?;
        assert!((w[0] - 0.9).abs() < 1e-3);
        assert!((w[1] - -2.1).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn test_adamw_step() -> Result<()> {
        let config: OptimizerConfig = serde_yaml::from_str("AdamW:\n  lr: 0.1\n")?;
        assert!(matches!(
            config,
            OptimizerConfig::AdamW { weight_decay, .. } if weight_decay == ParamsAdamW::default().weight_decay
        ));
        let w = first_step(config)?;
        // Weight decay shrinks the parameters slightly on top of the Adam step
        assert!((w[0] - 0.9).abs() < 1e-2);
        assert!((w[1] - -2.1).abs() < 1e-2);

        let w = first_step(OptimizerConfig::AdamW {
            lr: 0.1,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        })?;
        assert!((w[0] - 0.9).abs() < 1e-3);
        assert!((w[1] - -2.1).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn test_learning_rate_override() {
        let config = OptimizerConfig::default().learning_rate(0.5);
        assert_eq!(
            config,
            OptimizerConfig::Sgd {
                lr: 0.5,
                momentum: 0.9
            }
        );
        assert_eq!(
            OptimizerConfig::Adam { lr: 1e-3 }.learning_rate(0.5),
            OptimizerConfig::Adam { lr: 0.5 }
        );
    }

    #[test]
    fn test_serde_default_momentum() -> Result<()> {
        let config: OptimizerConfig = serde_yaml::from_str("Sgd:\n  lr: 0.02\n")?;
        assert_eq!(
            config,
            OptimizerConfig::Sgd {
                lr: 0.02,
                momentum: 0.9
            }
        );
        Ok(())
    }
}
