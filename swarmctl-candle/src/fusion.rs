//! Fusion of the position-error and heading-error encoders.
mod config;
mod model;
mod net;

pub use config::FusionModelConfig;
pub use model::FusionModel;
pub use net::FusionNet;
