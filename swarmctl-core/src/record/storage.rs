//! Record storage and aggregation.
use super::{Record, RecordValue};
use std::collections::HashSet;
use xxhash_rust::xxh3::Xxh3Builder;

/// A storage of records with aggregation.
///
/// Scalars stored under the same key are summarized by min, max, mean and
/// median, written as `{key}_min`, `{key}_max`, `{key}_mean` and
/// `{key}_median` even when a single value was stored. For the other value
/// types, the most recent value is kept.
#[derive(Default)]
pub struct RecordStorage {
    data: Vec<Record>,
}

fn min(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().cloned().fold(f32::INFINITY, f32::min))
}

fn max(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().cloned().fold(f32::NEG_INFINITY, f32::max))
}

fn mean(vs: &[f32]) -> RecordValue {
    RecordValue::Scalar(vs.iter().sum::<f32>() / vs.len() as f32)
}

/// Sorts its input.
fn median(mut vs: Vec<f32>) -> RecordValue {
    vs.sort_by(|x, y| x.total_cmp(y));
    RecordValue::Scalar(vs[vs.len() / 2])
}

impl RecordStorage {
    /// Creates a new empty record storage.
    pub fn new() -> Self {
        Self { data: vec![] }
    }

    fn get_keys(&self) -> HashSet<String, Xxh3Builder> {
        let mut keys = HashSet::<String, Xxh3Builder>::default();
        for record in self.data.iter() {
            for k in record.keys() {
                keys.insert(k.clone());
            }
        }
        keys
    }

    /// The most recent non-scalar value of `key`.
    fn latest(&self, key: &str) -> Record {
        self.data
            .iter()
            .rev()
            .find_map(|record| record.get(key))
            .map(|value| Record::from_slice(&[(key, value.clone())]))
            .unwrap_or_else(Record::empty)
    }

    fn scalar(&self, key: &str) -> Record {
        let vs: Vec<f32> = self
            .data
            .iter()
            .filter_map(|record| match record.get(key) {
                Some(RecordValue::Scalar(v)) => Some(*v),
                _ => None,
            })
            .collect();

        Record::from_slice(&[
            (format!("{}_min", key), min(&vs)),
            (format!("{}_max", key), max(&vs)),
            (format!("{}_mean", key), mean(&vs)),
            (format!("{}_median", key), median(vs)),
        ])
    }

    /// Stores a record.
    pub fn store(&mut self, record: Record) {
        self.data.push(record);
    }

    /// The number of stored records.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Aggregates all stored records and clears the storage.
    pub fn aggregate(&mut self) -> Record {
        let mut record = Record::empty();

        for key in self.get_keys().iter() {
            let is_scalar = self
                .data
                .iter()
                .find_map(|r| r.get(key))
                .map_or(false, |v| matches!(v, RecordValue::Scalar(_)));
            let r = match is_scalar {
                true => self.scalar(key),
                false => self.latest(key),
            };
            record.merge_inplace(r);
        }

        self.data = vec![];

        record
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_aggregate() {
        let mut storage = RecordStorage::new();
        for loss in [4.0, 1.0, 3.0, 2.0, 5.0] {
            storage.store(Record::from_scalar("loss", loss));
        }
        storage.store(Record::from_slice(&[(
            "phase",
            RecordValue::String("train".to_string()),
        )]));
        assert_eq!(storage.len(), 6);

        let record = storage.aggregate();
        assert_eq!(record.get_scalar("loss_min").unwrap(), 1.0);
        assert_eq!(record.get_scalar("loss_max").unwrap(), 5.0);
        assert_eq!(record.get_scalar("loss_mean").unwrap(), 3.0);
        assert_eq!(record.get_scalar("loss_median").unwrap(), 3.0);
        assert_eq!(record.get_string("phase").unwrap(), "train");
        assert!(storage.is_empty());
        assert!(storage.aggregate().is_empty());
    }

    #[test]
    fn test_aggregate_single_value() {
        let mut storage = RecordStorage::new();
        storage.store(Record::from_scalar("loss", 0.5));

        let record = storage.aggregate();
        assert_eq!(record.len(), 4);
        assert!(record.get("loss").is_none());
        for key in ["loss_min", "loss_max", "loss_mean", "loss_median"] {
            assert_eq!(record.get_scalar(key).unwrap(), 0.5);
        }
    }
}
