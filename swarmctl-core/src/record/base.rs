//! Base implementation of records for logging.
use crate::error::SwarmError;
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// Represents possible types of values that can be stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// A single floating-point value, typically a loss or an error metric.
    Scalar(f32),

    /// A 2-dimensional array in row-major order with its shape.
    Array2(Vec<f32>, [usize; 2]),

    /// A text value.
    String(String),
}

/// A container for storing key-value pairs of various data types.
///
/// # Examples
///
/// ```rust
/// use swarmctl_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("mse", 0.5);
/// record.insert("rmse", RecordValue::Scalar(0.5f32.sqrt()));
/// let mse = record.get_scalar("mse").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Returns an iterator that consumes the record.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges another record into this one in place.
    ///
    /// If both records contain the same key, the value from `record` wins.
    pub fn merge_inplace(&mut self, record: Record) {
        for (k, v) in record.into_iter_in_record() {
            self.0.insert(k, v);
        }
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or the value is not a scalar.
    pub fn get_scalar(&self, k: &str) -> Result<f32, SwarmError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(SwarmError::RecordValueTypeError("Scalar".to_string())),
            None => Err(SwarmError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 2-dimensional array and its shape from the record.
    pub fn get_array2(&self, k: &str) -> Result<(Vec<f32>, [usize; 2]), SwarmError> {
        match self.0.get(k) {
            Some(RecordValue::Array2(v, s)) => Ok((v.clone(), *s)),
            Some(_) => Err(SwarmError::RecordValueTypeError("Array2".to_string())),
            None => Err(SwarmError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, SwarmError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(SwarmError::RecordValueTypeError("String".to_string())),
            None => Err(SwarmError::RecordKeyError(k.to_string())),
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_getters() {
        let record = Record::from_slice(&[
            ("mse", RecordValue::Scalar(0.25)),
            ("pred", RecordValue::Array2(vec![1.0, 2.0, 3.0, 4.0], [2, 2])),
            ("name", RecordValue::String("fusion".to_string())),
        ]);

        assert_eq!(record.get_scalar("mse").unwrap(), 0.25);
        assert_eq!(record.get_array2("pred").unwrap().1, [2, 2]);
        assert_eq!(record.get_string("name").unwrap(), "fusion");
        assert!(matches!(
            record.get_scalar("name"),
            Err(SwarmError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            record.get_array2("missing"),
            Err(SwarmError::RecordKeyError(_))
        ));
    }

    #[test]
    fn test_merge() {
        let r1 = Record::from_slice(&[
            ("a", RecordValue::Scalar(1.0)),
            ("b", RecordValue::Scalar(2.0)),
        ]);
        let mut r3 = r1.clone();
        r3.merge_inplace(Record::from_scalar("b", 3.0));
        assert_eq!(r3.get_scalar("a").unwrap(), 1.0);
        assert_eq!(r3.get_scalar("b").unwrap(), 3.0);
        assert_eq!(r3.len(), 2);

        r3.merge_inplace(Record::from_scalar("c", 4.0));
        assert_eq!(r3.len(), 3);
        assert!(Record::empty().is_empty());
    }
}
