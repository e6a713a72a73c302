//! Rows of recorded trajectories and the dataset accessor.
use crate::error::SwarmError;
use log::info;
use rand::{seq::SliceRandom, Rng};
use std::{io::Read, path::Path};

/// Number of input fields of a row, `Mx, My, Phix, Phiy`.
pub const N_INPUTS: usize = 4;

/// Number of target fields of a row, `Ux, Uy`.
pub const N_TARGETS: usize = 2;

/// Number of fields of a row.
pub const N_FIELDS: usize = N_INPUTS + N_TARGETS;

/// A recorded sample: position error, heading error and the applied control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    /// Position error `(Mx, My)`.
    pub m: [f32; 2],

    /// Heading error `(Phix, Phiy)`.
    pub phi: [f32; 2],

    /// Control `(Ux, Uy)`, the regression target.
    pub u: [f32; 2],
}

impl Row {
    /// Creates a row.
    pub fn new(m: [f32; 2], phi: [f32; 2], u: [f32; 2]) -> Self {
        Self { m, phi, u }
    }

    /// Returns the input features `Mx, My, Phix, Phiy`.
    pub fn input(&self) -> [f32; N_INPUTS] {
        [self.m[0], self.m[1], self.phi[0], self.phi[1]]
    }

    fn parse(row: usize, record: &csv::StringRecord) -> Result<Self, SwarmError> {
        if record.len() != N_FIELDS {
            return Err(SwarmError::Shape {
                row,
                expected: N_FIELDS,
                found: record.len(),
            });
        }

        let mut v = [0f32; N_FIELDS];
        for (column, field) in record.iter().enumerate() {
            v[column] = field.parse::<f32>().map_err(|e| SwarmError::Format {
                row,
                column,
                msg: format!("{:?}: {}", field, e),
            })?;
        }

        Ok(Self::new([v[0], v[1]], [v[2], v[3]], [v[4], v[5]]))
    }
}

/// Rows loaded from a headerless delimited file.
///
/// The dataset is immutable once loaded. Use [`TrajectoryDataset::split`] to
/// partition its indices and [`Split::into_subsets`] to obtain views for
/// training and evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryDataset {
    rows: Vec<Row>,
}

impl TrajectoryDataset {
    /// Loads rows from a comma separated file without a header.
    ///
    /// # Errors
    ///
    /// * [`SwarmError::Io`] if the file cannot be read.
    /// * [`SwarmError::Shape`] if a row does not have [`N_FIELDS`] fields.
    /// * [`SwarmError::Format`] if a field is not a number.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SwarmError> {
        let path = path.as_ref();
        let rdr = Self::reader_builder()
            .from_path(path)
            .map_err(|e| match e.into_kind() {
                csv::ErrorKind::Io(source) => SwarmError::Io {
                    path: path.to_owned(),
                    source,
                },
                kind => SwarmError::Format {
                    row: 0,
                    column: 0,
                    msg: format!("{:?}", kind),
                },
            })?;
        let dataset = Self::read_rows(rdr)?;
        info!("Loaded {} rows from {:?}", dataset.len(), path);
        Ok(dataset)
    }

    /// Parses rows from a reader, see [`TrajectoryDataset::load`].
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, SwarmError> {
        Self::read_rows(Self::reader_builder().from_reader(rdr))
    }

    fn reader_builder() -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All);
        builder
    }

    fn read_rows<R: Read>(mut rdr: csv::Reader<R>) -> Result<Self, SwarmError> {
        let mut rows = Vec::new();

        for (i, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| SwarmError::Format {
                row: i,
                column: 0,
                msg: e.to_string(),
            })?;
            rows.push(Row::parse(i, &record)?);
        }

        Ok(Self { rows })
    }

    /// Creates a dataset from rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there is no row.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row at `index`.
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// All rows in file order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the number of test rows for a dataset of `n` rows.
    ///
    /// `round(fraction * n)`, where halves are rounded to the even integer.
    pub fn test_size_for(n: usize, fraction: f64) -> Result<usize, SwarmError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(SwarmError::InvalidFraction(fraction));
        }
        Ok((fraction * n as f64).round_ties_even() as usize)
    }

    /// Randomly partitions row indices into train and test sets.
    ///
    /// The indices are permuted with `rng`; the first `n - test_size` of the
    /// permutation go to the train set and the rest to the test set.
    pub fn split<R: Rng + ?Sized>(&self, fraction: f64, rng: &mut R) -> Result<Split, SwarmError> {
        let n = self.len();
        let test_size = Self::test_size_for(n, fraction)?;
        let mut train: Vec<usize> = (0..n).collect();
        train.shuffle(rng);
        let test = train.split_off(n - test_size);

        Ok(Split { train, test })
    }

    /// Returns a view of the rows at `indices`.
    pub fn subset(&self, indices: Vec<usize>) -> Subset<'_> {
        debug_assert!(indices.iter().all(|&i| i < self.len()));
        Subset {
            dataset: self,
            indices,
        }
    }
}

/// Disjoint train and test indices covering a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    /// Indices of training rows.
    pub train: Vec<usize>,

    /// Indices of test rows.
    pub test: Vec<usize>,
}

impl Split {
    /// The number of training rows.
    pub fn train_size(&self) -> usize {
        self.train.len()
    }

    /// The number of test rows.
    pub fn test_size(&self) -> usize {
        self.test.len()
    }

    /// Returns train and test views of `dataset`.
    pub fn into_subsets(self, dataset: &TrajectoryDataset) -> (Subset<'_>, Subset<'_>) {
        (dataset.subset(self.train), dataset.subset(self.test))
    }
}

/// Rows of a [`TrajectoryDataset`] selected by index.
#[derive(Debug, Clone)]
pub struct Subset<'a> {
    dataset: &'a TrajectoryDataset,
    indices: Vec<usize>,
}

impl<'a> Subset<'a> {
    /// The number of rows in the subset.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if the subset has no row.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the `i`-th row of the subset.
    pub fn get(&self, i: usize) -> Option<&'a Row> {
        self.indices.get(i).and_then(|&ix| self.dataset.get(ix))
    }

    /// Indices into the underlying dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Iterates over the rows of the subset in order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Row> + '_ {
        self.indices.iter().map(move |&ix| &self.dataset.rows[ix])
    }

    /// Returns the rows at the given positions of the subset.
    ///
    /// # Panics
    ///
    /// Panics if a position is out of range.
    pub fn gather(&self, positions: &[usize]) -> Vec<Row> {
        positions
            .iter()
            .map(|&p| self.dataset.rows[self.indices[p]])
            .collect()
    }
}
