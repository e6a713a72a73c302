//! Types and traits for recording training metrics.
//!
//! * [`Record`] - key-value pairs of [`RecordValue`]s
//! * [`Recorder`] - destination of records, e.g. TFRecord files or a buffer
//! * [`RecordStorage`] - aggregation of many records, e.g. the per-batch
//!   losses of an epoch
//! * [`BufferedRecorder`] - keeps records in memory
//! * [`NullRecorder`] - discards all records
//!
//! ```rust
//! use swarmctl_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("epoch", 1.0);
//! record.insert("loss_mean", RecordValue::Scalar(0.25));
//! assert_eq!(record.get_scalar("loss_mean").unwrap(), 0.25);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
pub use storage::RecordStorage;
