//! Connection-cost matrix between left/right grammatical ids.
use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{Result, ComugiError};

pub trait ConnectorView {
    /// Returns maximum number of left connection ids.
    fn num_left(&self) -> usize;

    /// Returns maximum number of right connection ids.
    fn num_right(&self) -> usize;
}

pub trait ConnectorCost: ConnectorView {
    /// Gets the value of the connection matrix.
    fn cost(&self, right_id: u16, left_id: u16) -> i32;
}

/// A dense row-major connection matrix, `data[right_id * num_left + left_id]`.
#[derive(Archive, Serialize, Deserialize)]
pub struct MatrixConnector {
    data: Vec<i16>,
    num_right: usize,
    num_left: usize,
}

impl MatrixConnector {
    pub fn new(data: Vec<i16>, num_right: usize, num_left: usize) -> Result<Self> {
        if data.len() != num_right * num_left {
            return Err(ComugiError::invalid_format(
                "matrix_def",
                format!(
                    "expected {} entries ({num_right} x {num_left}), found {}",
                    num_right * num_left,
                    data.len()
                ),
            ));
        }
        Ok(Self { data, num_right, num_left })
    }
}

impl ConnectorView for MatrixConnector {
    #[inline(always)]
    fn num_left(&self) -> usize {
        self.num_left
    }
    #[inline(always)]
    fn num_right(&self) -> usize {
        self.num_right
    }
}

impl ConnectorCost for MatrixConnector {
    #[inline(always)]
    fn cost(&self, right_id: u16, left_id: u16) -> i32 {
        i32::from(self.data[usize::from(right_id) * self.num_left + usize::from(left_id)])
    }
}

impl ConnectorView for ArchivedMatrixConnector {
    #[inline(always)]
    fn num_left(&self) -> usize {
        self.num_left.to_native() as usize
    }
    #[inline(always)]
    fn num_right(&self) -> usize {
        self.num_right.to_native() as usize
    }
}

impl ConnectorCost for ArchivedMatrixConnector {
    #[inline(always)]
    fn cost(&self, right_id: u16, left_id: u16) -> i32 {
        let num_left = self.num_left.to_native() as usize;
        i32::from(self.data[usize::from(right_id) * num_left + usize::from(left_id)].to_native())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_indexes_row_major() {
        let m = MatrixConnector::new(vec![0, 1, 2, 3, 4, 5], 2, 3).unwrap();
        assert_eq!(m.cost(0, 0), 0);
        assert_eq!(m.cost(0, 2), 2);
        assert_eq!(m.cost(1, 0), 3);
        assert_eq!(m.cost(1, 2), 5);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        assert!(MatrixConnector::new(vec![0, 1, 2], 2, 3).is_err());
    }
}
