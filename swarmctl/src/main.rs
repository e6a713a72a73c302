use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use swarmctl::RunConfig;
use swarmctl_candle::encoder::ForwardMode;

/// Train a fusion controller on recorded trajectories and report its error on
/// held-out rows
#[derive(Clone, Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML run configuration. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Headerless CSV file with rows `Mx, My, Phix, Phiy, Ux, Uy`
    #[arg(long)]
    data: Option<PathBuf>,

    /// Where the trained parameters are saved [default: model.pth]
    #[arg(long)]
    model: Option<PathBuf>,

    /// Seed of the split and of the shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// The number of epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Write predictions on the test rows to this CSV file
    #[arg(long)]
    predictions: Option<PathBuf>,

    /// Write epoch records for Tensorboard into this directory
    #[arg(long)]
    tensorboard: Option<PathBuf>,

    /// Encoders return `output(x)` of their raw input instead of passing it
    /// through all of their layers
    #[arg(long, default_value_t = false)]
    passthrough: bool,

    /// Write the resolved run configuration to this YAML file and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

impl Args {
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };

        if let Some(data) = &self.data {
            config.data_path = Some(data.clone());
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(seed) = self.seed {
            config.trainer.seed = Some(seed);
        }
        if let Some(epochs) = self.epochs {
            config.trainer.epochs = epochs;
        }
        if let Some(predictions) = &self.predictions {
            config.predictions_path = Some(predictions.clone());
        }
        if let Some(tensorboard) = &self.tensorboard {
            config.tensorboard_dir = Some(tensorboard.clone());
        }
        if self.passthrough {
            config.model.encoder.forward_mode = ForwardMode::Passthrough;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.run_config()?;

    if let Some(path) = &args.write_config {
        return config.save(path);
    }

    config.trainer.validate()?;
    let dataset = swarmctl::load_dataset(&config)?;
    let mut rng = swarmctl::create_rng(config.trainer.seed);
    let split = swarmctl::split_dataset(&dataset, &config.trainer, &mut rng)?;
    println!(
        "Train size: {}, Test size: {}",
        split.train_size(),
        split.test_size()
    );
    let (train_subset, test_subset) = split.into_subsets(&dataset);

    let mut model = swarmctl::build_model(&config)?;
    let mut recorder = swarmctl::create_recorder(&config);
    swarmctl::train(&train_subset, &mut model, &config.trainer, recorder.as_mut())?;

    let evaluation = swarmctl::evaluate(&test_subset, &model, &config.trainer)?;
    println!("{:?}", evaluation.predictions);
    swarmctl::save_results(&config, &model, &evaluation, recorder.as_mut())?;
    println!("MSE: {:.3}, RMSE: {:.3}", evaluation.mse, evaluation.rmse);

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_flags_override_yaml() -> Result<()> {
        let dir = TempDir::new("swarmctl_args")?;
        let path = dir.path().join("run.yaml");
        std::fs::write(
            &path,
            "data_path: yaml.csv\nmodel_path: yaml.pth\ntrainer:\n  epochs: 3\n  seed: 9\n",
        )?;
        let path = path.to_string_lossy().into_owned();
        let path = path.as_str();

        // Values from the file win over defaults
        let config = Args::parse_from(["swarmctl", "--config", path]).run_config()?;
        assert_eq!(config.data_path, Some(PathBuf::from("yaml.csv")));
        assert_eq!(config.model_path, PathBuf::from("yaml.pth"));
        assert_eq!(config.trainer.epochs, 3);
        assert_eq!(config.trainer.seed, Some(9));
        assert_eq!(config.trainer.batch_size, 32);
        assert_eq!(config.model.encoder.forward_mode, ForwardMode::Sequential);

        // Flags win over the file
        let args = Args::parse_from([
            "swarmctl",
            "--config",
            path,
            "--data",
            "flag.csv",
            "--epochs",
            "5",
            "--seed",
            "1",
            "--tensorboard",
            "logs",
            "--passthrough",
        ]);
        let config = args.run_config()?;
        assert_eq!(config.data_path, Some(PathBuf::from("flag.csv")));
        assert_eq!(config.model_path, PathBuf::from("yaml.pth"));
        assert_eq!(config.trainer.epochs, 5);
        assert_eq!(config.trainer.seed, Some(1));
        assert_eq!(config.tensorboard_dir, Some(PathBuf::from("logs")));
        assert_eq!(config.model.encoder.forward_mode, ForwardMode::Passthrough);
        Ok(())
    }

    #[test]
    fn test_defaults_without_config() -> Result<()> {
        let config = Args::parse_from(["swarmctl", "--model", "out.pth"]).run_config()?;
        assert_eq!(config, RunConfig::default().model_path("out.pth"));
        Ok(())
    }
}
