//! Evaluate [`FusionModel`] on a held-out subset.
use crate::{fusion::FusionModel, tensor_batch::RowBatch};
use anyhow::{ensure, Result};
use log::{debug, info};
use std::path::Path;
use swarmctl_core::{
    error::SwarmError,
    record::{Record, RecordValue},
    Subset, TrainerConfig,
};

/// Result of [`Evaluator::evaluate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Model outputs in the order of the subset.
    pub predictions: Vec<[f32; 2]>,

    /// Targets in the order of the subset.
    pub actuals: Vec<[f32; 2]>,

    /// Mean over all rows and both components of the squared error.
    pub mse: f64,

    /// Square root of `mse`.
    pub rmse: f64,
}

impl Evaluation {
    /// Computes the error metrics of `predictions` against `actuals`.
    ///
    /// # Errors
    ///
    /// Fails if the two lists differ in length or are empty.
    pub fn new(predictions: Vec<[f32; 2]>, actuals: Vec<[f32; 2]>) -> Result<Self> {
        ensure!(
            predictions.len() == actuals.len(),
            "{} predictions for {} targets",
            predictions.len(),
            actuals.len()
        );
        ensure!(!predictions.is_empty(), "no prediction to evaluate");

        let n = 2 * predictions.len();
        let sum: f64 = predictions
            .iter()
            .zip(actuals.iter())
            .flat_map(|(p, a)| p.iter().zip(a.iter()))
            .map(|(&p, &a)| (p as f64 - a as f64).powi(2))
            .sum();
        let mse = sum / n as f64;

        Ok(Self {
            predictions,
            actuals,
            mse,
            rmse: mse.sqrt(),
        })
    }

    /// The number of evaluated rows.
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    /// Returns `true` if no row was evaluated.
    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    /// Returns `"mse"`, `"rmse"` and the predictions as an `[n, 2]` array
    /// under `"predictions"`.
    pub fn record(&self) -> Record {
        let data = self.predictions.iter().flatten().cloned().collect();
        Record::from_slice(&[
            ("mse", RecordValue::Scalar(self.mse as f32)),
            ("rmse", RecordValue::Scalar(self.rmse as f32)),
            ("predictions", RecordValue::Array2(data, [self.len(), 2])),
        ])
    }

    /// Writes `pred_ux, pred_uy, ux, uy` per row, without a header.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        for (p, a) in self.predictions.iter().zip(self.actuals.iter()) {
            wtr.serialize((p[0], p[1], a[0], a[1]))?;
        }
        wtr.flush()?;
        info!("Save predictions to {:?}", path);
        Ok(())
    }
}

/// Runs a trained model over a subset without updating it.
///
/// Rows are visited in order, in batches of at most `batch_size` rows.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    batch_size: usize,
}

impl Evaluator {
    /// Creates an evaluator.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn new(batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        Self { batch_size }
    }

    /// Creates an evaluator with `config.eval_batch_size`.
    pub fn from_config(config: &TrainerConfig) -> Self {
        Self::new(config.eval_batch_size)
    }

    /// Evaluates `model` on `subset`.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::EmptyDataset`] if `subset` has no row.
    pub fn evaluate(&self, subset: &Subset, model: &FusionModel) -> Result<Evaluation> {
        if subset.is_empty() {
            return Err(SwarmError::EmptyDataset.into());
        }

        let mut predictions = Vec::with_capacity(subset.len());
        let mut actuals = Vec::with_capacity(subset.len());

        let positions: Vec<usize> = (0..subset.len()).collect();
        for positions in positions.chunks(self.batch_size) {
            let rows = subset.gather(positions);
            let batch = RowBatch::from_rows(&rows, model.device())?;
            let pred = model
                .forward(&batch.m, &batch.phi)?
                .detach()
                .to_vec2::<f32>()?;
            for (p, row) in pred.iter().zip(rows.iter()) {
                predictions.push([p[0], p[1]]);
                actuals.push(row.u);
            }
        }

        debug!("predictions: {:?}", predictions);
        let evaluation = Evaluation::new(predictions, actuals)?;
        info!(
            "Evaluated {} rows: mse = {:.6}, rmse = {:.6}",
            evaluation.len(),
            evaluation.mse,
            evaluation.rmse
        );

        Ok(evaluation)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fusion::FusionModelConfig;
    use candle_core::Device;
    use swarmctl_core::{Row, TrajectoryDataset};
    use tempdir::TempDir;

    fn dataset(n: usize) -> TrajectoryDataset {
        let rows = (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                Row::new([t, -t], [0.5 - t, t], [t, 0.5])
            })
            .collect();
        TrajectoryDataset::from_rows(rows)
    }

    #[test]
    fn test_metrics() -> Result<()> {
        let evaluation =
            Evaluation::new(vec![[1.0, 2.0], [0.0, 0.0]], vec![[0.0, 0.0], [1.0, 1.0]])?;
        // (1 + 4 + 1 + 1) / 4
        assert!((evaluation.mse - 1.75).abs() < 1e-12);
        assert!((evaluation.rmse - 1.75f64.sqrt()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_metrics_reject_unmatched_lists() {
        assert!(Evaluation::new(vec![[1.0, 2.0], [0.0, 0.0]], vec![[0.0, 0.0]]).is_err());
        assert!(Evaluation::new(vec![[1.0, 2.0]], vec![[0.0, 0.0], [1.0, 1.0]]).is_err());
        assert!(Evaluation::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_evaluate_matches_predict() -> Result<()> {
        let dataset = dataset(30);
        let subset = dataset.subset((0..30).rev().collect());
        let model = FusionModel::build(FusionModelConfig::default(), Device::Cpu)?;
        let evaluation = Evaluator::new(1024).evaluate(&subset, &model)?;

        assert_eq!(evaluation.len(), 30);
        let mut sum = 0f64;
        for (i, row) in subset.iter().enumerate() {
            let u = model.predict(row.input())?;
            assert!((u[0] - evaluation.predictions[i][0]).abs() < 1e-5);
            assert!((u[1] - evaluation.predictions[i][1]).abs() < 1e-5);
            assert_eq!(evaluation.actuals[i], row.u);
            sum += (u[0] as f64 - row.u[0] as f64).powi(2) + (u[1] as f64 - row.u[1] as f64).powi(2);
        }
        assert!((evaluation.mse - sum / 60.0).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_batch_size_invariance() -> Result<()> {
        let dataset = dataset(50);
        let subset = dataset.subset((0..50).collect());
        let model = FusionModel::build(FusionModelConfig::default(), Device::Cpu)?;
        let e1 = Evaluator::new(1024).evaluate(&subset, &model)?;
        let e2 = Evaluator::new(7).evaluate(&subset, &model)?;

        assert_eq!(e1.actuals, e2.actuals);
        for (p1, p2) in e1.predictions.iter().zip(e2.predictions.iter()) {
            assert!((p1[0] - p2[0]).abs() < 1e-6);
            assert!((p1[1] - p2[1]).abs() < 1e-6);
        }
        assert!((e1.mse - e2.mse).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_evaluate_empty_subset() -> Result<()> {
        let dataset = dataset(5);
        let subset = dataset.subset(vec![]);
        let model = FusionModel::build(FusionModelConfig::default(), Device::Cpu)?;
        assert!(Evaluator::new(8).evaluate(&subset, &model).is_err());
        Ok(())
    }

    #[test]
    fn test_record_and_csv() -> Result<()> {
        let evaluation =
            Evaluation::new(vec![[0.5, -0.5], [1.0, 2.0]], vec![[0.0, 0.0], [1.0, 2.0]])?;
        let record = evaluation.record();
        assert_eq!(record.get_scalar("mse")?, 0.125);
        assert_eq!(record.get_array2("predictions")?.1, [2, 2]);

        let dir = TempDir::new("evaluation")?;
        let path = dir.path().join("predictions.csv");
        evaluation.write_csv(&path)?;
        let content = std::fs::read_to_string(&path)?;
        assert_eq!(content, "0.5,-0.5,0.0,0.0\n1.0,2.0,1.0,2.0\n");
        Ok(())
    }
}
