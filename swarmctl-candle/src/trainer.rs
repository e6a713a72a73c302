//! Train [`FusionModel`].
use crate::{fusion::FusionModel, tensor_batch::RowBatch};
use anyhow::Result;
use log::{info, trace};
use rand::{rngs::SmallRng, SeedableRng};
use std::time::SystemTime;
use swarmctl_core::{
    error::SwarmError,
    record::{Record, RecordStorage, RecordValue::Scalar, Recorder},
    BatchSampler, Subset, TrainerConfig,
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop of a [`FusionModel`].
///
/// # Training loop
///
/// 0. Given a training [`Subset`], a [`FusionModel`] and a [`Recorder`].
/// 1. For each of `epochs` epochs:
///     1. Draw a fresh permutation of the subset and cut it into mini-batches of
///        `batch_size` rows, the last one possibly shorter.
///     2. For each mini-batch, compute the mean squared error between the
///        model output and the targets, backpropagate it and take an
///        optimizer step. The loss is stored as `"loss"`.
///     3. Aggregate the stored losses into an epoch record holding `"epoch"`
///        (1-based), `"loss_mean"`, `"loss_min"`, `"loss_max"`,
///        `"loss_median"` and `"epoch_secs"`, and write it to the recorder.
///     4. If `epoch % record_interval == 0` or it is the last epoch, log the
///        epoch record.
/// 2. Return the mean batch loss of the last epoch.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Subset]-->|BatchSampler|B[RowBatch]
///     B -->|M, Phi|C[FusionModel]
///     C -->|U, loss|D[RecordStorage]
///     D -->|Record|E[Recorder]
/// ```
pub struct Trainer {
    /// The number of passes over the training subset.
    epochs: usize,

    /// Interval of logging in epochs.
    record_interval: usize,

    sampler: BatchSampler,

    /// Random generator for shuffling.
    rng: SmallRng,
}

impl Trainer {
    /// Constructs a trainer.
    ///
    /// Shuffling is reproducible when `config.seed` is set.
    pub fn build(config: &TrainerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        Self {
            epochs: config.epochs,
            record_interval: config.record_interval.max(1),
            sampler: BatchSampler::new(config.batch_size, true),
            rng,
        }
    }

    /// Runs one epoch and returns the mean batch loss.
    fn train_epoch(
        &mut self,
        subset: &Subset,
        model: &mut FusionModel,
        storage: &mut RecordStorage,
    ) -> Result<f32> {
        let mut loss_sum = 0f32;
        let batches = self.sampler.batches(subset.len(), &mut self.rng);
        let n_batches = batches.len();

        for (i, positions) in batches.into_iter().enumerate() {
            let batch = RowBatch::from_rows(&subset.gather(&positions), model.device())?;
            let pred = model.forward(&batch.m, &batch.phi)?;
            let loss = candle_nn::loss::mse(&pred, &batch.u)?;
            model.backward_step(&loss)?;

            let loss = loss.to_scalar::<f32>()?;
            trace!("batch {}/{}: loss = {}", i + 1, n_batches, loss);
            loss_sum += loss;
            storage.store(Record::from_scalar("loss", loss));
        }

        Ok(loss_sum / n_batches as f32)
    }

    /// Trains `model` on `subset` and returns the mean batch loss of the last
    /// epoch.
    ///
    /// # Errors
    ///
    /// Returns [`SwarmError::EmptyDataset`] if `subset` has no row.
    pub fn train(
        &mut self,
        subset: &Subset,
        model: &mut FusionModel,
        recorder: &mut dyn Recorder,
    ) -> Result<f32> {
        if subset.is_empty() {
            return Err(SwarmError::EmptyDataset.into());
        }

        let mut storage = RecordStorage::new();
        let mut loss = f32::NAN;
        info!(
            "Start training: {} rows, {} batches per epoch, {} epochs",
            subset.len(),
            self.sampler.n_batches(subset.len()),
            self.epochs
        );

        for epoch in 1..=self.epochs {
            let timer = SystemTime::now();
            loss = self.train_epoch(subset, model, &mut storage)?;
            let secs = timer.elapsed()?.as_secs_f32();

            let mut record = storage.aggregate();
            record.insert("epoch", Scalar(epoch as f32));
            record.insert("loss_mean", Scalar(loss));
            record.insert("epoch_secs", Scalar(secs));

            if epoch % self.record_interval == 0 || epoch == self.epochs {
                info!("Epoch {}/{}: loss = {:.6}", epoch, self.epochs, loss);
            }
            recorder.write(record);
        }

        Ok(loss)
    }
}
