//! Fusion controller model, training loop and evaluation implemented with
//! [candle](https://crates.io/crates/candle-core).
//!
//! The model maps a position error `M` and a heading error `Phi` to a control
//! `U`. Two encoders of identical structure consume `M` and `Phi`
//! respectively; their outputs are concatenated and passed through a fusion
//! head:
//!
//! ```text
//! M   -> Encoder A --\
//!                     cat -> linear(4, 3) -> ReLU -> linear(3, 2) -> U
//! Phi -> Encoder B --/
//! ```
pub mod encoder;
mod evaluator;
pub mod fusion;
pub mod model;
pub mod opt;
mod tensor_batch;
mod trainer;
pub mod util;
pub use evaluator::{Evaluation, Evaluator};
use serde::{Deserialize, Serialize};
pub use tensor_batch::RowBatch;
pub use trainer::Trainer;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}
