#![warn(missing_docs)]
//! Backend-independent parts of swarmctl.
//!
//! A controller for one robot of a fully connected graph is learned from
//! recorded rows `Mx, My, Phix, Phiy, Ux, Uy`, where `M` is the position error,
//! `Phi` the heading error and `U` the control applied. This crate loads those
//! rows, splits them into train and test subsets, samples mini-batches and
//! keeps the records produced while training.
pub mod error;
pub mod record;

mod batch;
mod config;
mod dataset;
pub use batch::BatchSampler;
pub use config::TrainerConfig;
pub use dataset::{Row, Split, Subset, TrajectoryDataset, N_FIELDS, N_INPUTS, N_TARGETS};
