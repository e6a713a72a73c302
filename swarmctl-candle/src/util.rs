//! Utilities.
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::{Init, Linear, VarBuilder, VarMap};
use swarmctl_core::record::{Record, RecordValue};

/// Creates a linear layer with Xavier-uniform weights.
///
/// Weights are drawn from `U(-a, a)`, `a = sqrt(6 / (in_dim + out_dim))`.
/// Biases are drawn from `U(-b, b)`, `b = 1 / sqrt(in_dim)`, the usual
/// default of a linear layer. The parameters are named `weight` and `bias`
/// under the prefix of `vb`.
pub fn xavier_linear(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Linear> {
    let bound = (6.0 / (in_dim + out_dim) as f64).sqrt();
    let init_ws = Init::Uniform {
        lo: -bound,
        up: bound,
    };
    let ws = vb.get_with_hints((out_dim, in_dim), "weight", init_ws)?;

    let bound = 1.0 / (in_dim as f64).sqrt();
    let init_bs = Init::Uniform {
        lo: -bound,
        up: bound,
    };
    let bs = vb.get_with_hints(out_dim, "bias", init_bs)?;

    Ok(Linear::new(ws, Some(bs)))
}

/// Returns the standard deviation of a tensor.
pub fn std(t: &Tensor) -> Result<f32> {
    Ok(t
        .broadcast_sub(&t.mean_all()?)?
        .powf(2f64)?
        .mean_all()?
        .sqrt()?
        .to_vec0::<f32>()?)
}

/// Returns the mean and standard deviation of the parameters.
pub fn param_stats(varmap: &VarMap) -> Result<Record> {
    let mut record = Record::empty();

    for (k, v) in varmap.all_named_vars()? {
        let m: f32 = v.mean_all()?.to_vec0()?;
        record.insert(format!("{}_mean", &k), RecordValue::Scalar(m));
        record.insert(format!("{}_std", &k), RecordValue::Scalar(std(v.as_tensor())?));
    }

    Ok(record)
}

/// Trait extension for collecting named variables of a [`VarMap`].
pub trait NamedVars {
    /// Returns `(name, var)` pairs sorted by name.
    fn all_named_vars(&self) -> Result<Vec<(String, candle_core::Var)>>;
}

impl NamedVars for VarMap {
    fn all_named_vars(&self) -> Result<Vec<(String, candle_core::Var)>> {
        let data = self
            .data()
            .lock()
            .map_err(|_| anyhow::anyhow!("VarMap lock is poisoned"))?;
        let mut vars: Vec<_> = data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        vars.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(vars)
    }
}
