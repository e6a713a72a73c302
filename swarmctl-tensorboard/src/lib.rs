//! Write training records of swarmctl as TFRecord for Tensorboard.
use log::warn;
use std::path::Path;
use swarmctl_core::record::{Record, RecordValue, Recorder};
use tensorboard_rs::summary_writer::SummaryWriter;

const STEP_KEY: &str = "epoch";

/// Write records to TFRecord.
///
/// Each record is written at the step given by its `"epoch"` scalar.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
        }
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [Record] into a TFRecord.
    ///
    /// Only [RecordValue::Scalar] values are written, other values are skipped.
    /// A record without a scalar step is skipped.
    fn write(&mut self, record: Record) {
        let step = match record.get(STEP_KEY) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            _ => {
                warn!("Record without scalar {:?} is skipped", STEP_KEY);
                return;
            }
        };

        for (k, v) in record.iter() {
            if k != STEP_KEY {
                if let RecordValue::Scalar(v) = v {
                    self.writer.add_scalar(k, *v, step);
                }
            }
        }
    }
}

impl Drop for TensorboardRecorder {
    fn drop(&mut self) {
        self.writer.flush();
    }
}
