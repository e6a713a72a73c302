use anyhow::Result;
use candle_core::{Device, Tensor};
use swarmctl_core::Row;

/// A mini-batch of rows as tensors of shape `[batch, 2]`.
pub struct RowBatch {
    /// Position errors.
    pub m: Tensor,

    /// Heading errors.
    pub phi: Tensor,

    /// Controls.
    pub u: Tensor,
}

impl RowBatch {
    /// Stacks `rows` into tensors on `device`.
    pub fn from_rows(rows: &[Row], device: &Device) -> Result<Self> {
        let n = rows.len();
        let mut m = Vec::with_capacity(2 * n);
        let mut phi = Vec::with_capacity(2 * n);
        let mut u = Vec::with_capacity(2 * n);
        for row in rows {
            m.extend_from_slice(&row.m);
            phi.extend_from_slice(&row.phi);
            u.extend_from_slice(&row.u);
        }

        Ok(Self {
            m: Tensor::from_vec(m, (n, 2), device)?,
            phi: Tensor::from_vec(phi, (n, 2), device)?,
            u: Tensor::from_vec(u, (n, 2), device)?,
        })
    }

    /// The number of rows in the batch.
    pub fn len(&self) -> usize {
        self.u.dims()[0]
    }

    /// Returns `true` if the batch has no row.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_rows() -> Result<()> {
        let rows = vec![
            Row::new([1.0, 2.0], [3.0, 4.0], [5.0, 6.0]),
            Row::new([-1.0, -2.0], [-3.0, -4.0], [-5.0, -6.0]),
        ];
        let batch = RowBatch::from_rows(&rows, &Device::Cpu)?;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.m.to_vec2::<f32>()?, vec![vec![1.0, 2.0], vec![-1.0, -2.0]]);
        assert_eq!(batch.phi.to_vec2::<f32>()?, vec![vec![3.0, 4.0], vec![-3.0, -4.0]]);
        assert_eq!(batch.u.to_vec2::<f32>()?, vec![vec![5.0, 6.0], vec![-5.0, -6.0]]);
        Ok(())
    }
}
