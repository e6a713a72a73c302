//! Train a fusion controller from recorded trajectories.
//!
//! [`run`] sequences the whole pipeline:
//!
//! 0. [`TrainerConfig::validate`] rejects unusable settings,
//! 1. [`load_dataset`] reads rows `Mx, My, Phix, Phiy, Ux, Uy`,
//! 2. [`split_dataset`] holds out `test_fraction` of them,
//! 3. [`build_model`] creates a [`FusionModel`],
//! 4. [`train`] fits it on the training rows,
//! 5. [`evaluate`] computes the error on the held-out rows,
//! 6. [`save_results`] records the metrics and writes the parameters to
//!    `model_path`.
//!
//! Each step is usable on its own.
use anyhow::{Context, Result};
use log::info;
use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};
use swarmctl_candle::{
    fusion::{FusionModel, FusionModelConfig},
    Device, Evaluation, Evaluator, Trainer,
};
use swarmctl_core::{
    record::{NullRecorder, Record, RecordValue, Recorder},
    Split, Subset, TrainerConfig, TrajectoryDataset,
};
use swarmctl_tensorboard::TensorboardRecorder;

/// Default path of the saved parameters.
pub const DEFAULT_MODEL_PATH: &str = "model.pth";

/// Configuration of a training run.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct RunConfig {
    /// Headerless CSV file of rows.
    pub data_path: Option<PathBuf>,

    /// Where the trained parameters are saved.
    pub model_path: PathBuf,

    /// If set, predictions on the test rows are written to this file.
    pub predictions_path: Option<PathBuf>,

    /// If set, epoch records are written as TFRecord into this directory.
    pub tensorboard_dir: Option<PathBuf>,

    /// Device on which the model is trained.
    pub device: Device,

    /// Configuration of training and evaluation loops.
    pub trainer: TrainerConfig,

    /// Configuration of the model.
    pub model: FusionModelConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            predictions_path: None,
            tensorboard_dir: None,
            device: Device::default(),
            trainer: TrainerConfig::default(),
            model: FusionModelConfig::default(),
        }
    }
}

impl RunConfig {
    /// Sets the data file.
    pub fn data_path(mut self, v: impl Into<PathBuf>) -> Self {
        self.data_path = Some(v.into());
        self
    }

    /// Sets the path of the saved parameters.
    pub fn model_path(mut self, v: impl Into<PathBuf>) -> Self {
        self.model_path = v.into();
        self
    }

    /// Sets the configuration of training and evaluation loops.
    pub fn trainer(mut self, v: TrainerConfig) -> Self {
        self.trainer = v;
        self
    }

    /// Sets the configuration of the model.
    pub fn model(mut self, v: FusionModelConfig) -> Self {
        self.model = v;
        self
    }

    /// Constructs [`RunConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path_))?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load run config from {:?}", path_);
        Ok(b)
    }

    /// Saves [`RunConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save run config into {:?}", path_);
        Ok(())
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The number of training rows.
    pub train_size: usize,

    /// The number of test rows.
    pub test_size: usize,

    /// Mean batch loss of the last epoch.
    pub train_loss: f32,

    /// Result of evaluation on the test rows.
    pub evaluation: Evaluation,
}

/// Random generator of a run, reproducible when `seed` is set.
pub fn create_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// Loads the rows of the run.
pub fn load_dataset(config: &RunConfig) -> Result<TrajectoryDataset> {
    let path = config
        .data_path
        .as_ref()
        .context("Data path is not set")?;
    Ok(TrajectoryDataset::load(path)?)
}

/// Randomly holds out `test_fraction` of the rows.
pub fn split_dataset(
    dataset: &TrajectoryDataset,
    config: &TrainerConfig,
    rng: &mut SmallRng,
) -> Result<Split> {
    let split = dataset.split(config.test_fraction, rng)?;
    info!(
        "Split {} rows into {} train and {} test rows",
        dataset.len(),
        split.train_size(),
        split.test_size()
    );
    Ok(split)
}

/// Builds a model with freshly initialized parameters.
pub fn build_model(config: &RunConfig) -> Result<FusionModel> {
    let device: candle_core::Device = config.device.try_into()?;
    info!("Device is {:?}", device);
    FusionModel::build(config.model.clone(), device)
}

/// Creates the recorder of epoch records.
pub fn create_recorder(config: &RunConfig) -> Box<dyn Recorder> {
    match &config.tensorboard_dir {
        Some(dir) => {
            info!("Write records to {:?}", dir);
            Box::new(TensorboardRecorder::new(dir))
        }
        None => Box::new(NullRecorder::new()),
    }
}

/// Trains `model` on `subset`.
pub fn train(
    subset: &Subset,
    model: &mut FusionModel,
    config: &TrainerConfig,
    recorder: &mut dyn Recorder,
) -> Result<f32> {
    let mut trainer = Trainer::build(config);
    trainer.train(subset, model, recorder)
}

/// Evaluates `model` on `subset`.
pub fn evaluate(subset: &Subset, model: &FusionModel, config: &TrainerConfig) -> Result<Evaluation> {
    Evaluator::from_config(config).evaluate(subset, model)
}

/// Writes the evaluation record, the optional predictions file and the
/// trained parameters.
pub fn save_results(
    config: &RunConfig,
    model: &FusionModel,
    evaluation: &Evaluation,
    recorder: &mut dyn Recorder,
) -> Result<()> {
    let mut record = Record::from_scalar("epoch", config.trainer.epochs as f32);
    record.insert("eval_mse", RecordValue::Scalar(evaluation.mse as f32));
    record.insert("eval_rmse", RecordValue::Scalar(evaluation.rmse as f32));
    recorder.write(record);

    if let Some(path) = &config.predictions_path {
        evaluation.write_csv(path)?;
    }
    model.save(&config.model_path)
}

/// Runs the whole pipeline and saves the trained parameters.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.trainer.validate()?;
    let dataset = load_dataset(config)?;
    let mut rng = create_rng(config.trainer.seed);
    let split = split_dataset(&dataset, &config.trainer, &mut rng)?;
    let (train_size, test_size) = (split.train_size(), split.test_size());
    let (train_subset, test_subset) = split.into_subsets(&dataset);

    let mut model = build_model(config)?;
    let mut recorder = create_recorder(config);
    let train_loss = train(&train_subset, &mut model, &config.trainer, recorder.as_mut())?;

    let evaluation = evaluate(&test_subset, &model, &config.trainer)?;
    save_results(config, &model, &evaluation, recorder.as_mut())?;

    Ok(RunSummary {
        train_size,
        test_size,
        train_loss,
        evaluation,
    })
}
