//! Configuration of the training and evaluation loops.
use crate::error::SwarmError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of the trainer and the evaluator.
///
/// Defaults: 150 epochs, mini-batches of 32 training rows, evaluation
/// batches of 1024 rows and 30% of the rows held out for testing.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct TrainerConfig {
    /// The number of passes over the training subset.
    pub epochs: usize,

    /// Mini-batch size for training.
    pub batch_size: usize,

    /// Batch size for evaluation.
    pub eval_batch_size: usize,

    /// Fraction of rows held out for testing.
    pub test_fraction: f64,

    /// Seed of the split and of the shuffling. Fresh entropy if `None`.
    pub seed: Option<u64>,

    /// Interval of logging epoch summaries, in epochs.
    pub record_interval: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 150,
            batch_size: 32,
            eval_batch_size: 1024,
            test_fraction: 0.3,
            seed: None,
            record_interval: 10,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of epochs.
    pub fn epochs(mut self, v: usize) -> Self {
        self.epochs = v;
        self
    }

    /// Sets the mini-batch size for training.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the batch size for evaluation.
    pub fn eval_batch_size(mut self, v: usize) -> Self {
        self.eval_batch_size = v;
        self
    }

    /// Sets the fraction of test rows.
    pub fn test_fraction(mut self, v: f64) -> Self {
        self.test_fraction = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = Some(v);
        self
    }

    /// Sets the interval of logging epoch summaries.
    pub fn record_interval(mut self, v: usize) -> Self {
        self.record_interval = v;
        self
    }

    /// Checks the values that deserialization alone cannot reject.
    ///
    /// # Errors
    ///
    /// * [`SwarmError::InvalidConfig`] if `epochs`, `batch_size` or
    ///   `eval_batch_size` is zero.
    /// * [`SwarmError::InvalidFraction`] if `test_fraction` is not in `(0, 1)`.
    pub fn validate(&self) -> Result<(), SwarmError> {
        for (name, v) in [
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("eval_batch_size", self.eval_batch_size),
        ] {
            if v == 0 {
                return Err(SwarmError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(SwarmError::InvalidFraction(self.test_fraction));
        }
        Ok(())
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
