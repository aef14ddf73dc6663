//! Augmented matrices over [`Rational`] and Gauss-Jordan row reduction

use std::fmt;
use std::ops::{Index, IndexMut};

use thiserror::Error;

use crate::rational::{Rational, RationalError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatrixError {
    #[error("matrix has no rows")]
    Empty,

    #[error("matrix is not of the form N x M: row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("system is inconsistent: row {row} reduces to 0 = {constant}")]
    Inconsistent { row: usize, constant: Rational },

    #[error("system is underdetermined: column {column} has no pivot")]
    Underdetermined { column: usize },

    #[error(transparent)]
    Arithmetic(#[from] RationalError),
}

/// A dense row-major matrix whose last column holds the constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    shape: (usize, usize),
    data: Vec<Rational>,
}

impl Matrix {
    /// Build a matrix from rows, validating that every row has the same length.
    pub fn from_rows(rows: Vec<Vec<Rational>>) -> Result<Matrix, MatrixError> {
        let cols = rows.first().map(Vec::len).ok_or(MatrixError::Empty)?;
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != cols)
        {
            return Err(MatrixError::Ragged {
                row,
                expected: cols,
                found,
            });
        }

        Ok(Matrix {
            shape: (rows.len(), cols),
            data: rows.into_iter().flatten().collect(),
        })
    }

    #[cfg(test)]
    pub fn from_integers(rows: &[&[i64]]) -> Result<Matrix, MatrixError> {
        Matrix::from_rows(
            rows.iter()
                .map(|row| row.iter().copied().map(Rational::from).collect())
                .collect(),
        )
    }

    pub fn rows(&self) -> usize {
        self.shape.0
    }

    pub fn cols(&self) -> usize {
        self.shape.1
    }

    pub fn row(&self, row: usize) -> &[Rational] {
        let cols = self.cols();
        &self.data[row * cols..(row + 1) * cols]
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        let cols = self.cols();
        for col in 0..cols {
            self.data.swap(a * cols + col, b * cols + col);
        }
    }

    /// Reduce the matrix to reduced row echelon form in place.
    ///
    /// Columns without any non-zero entry at or below the current row are
    /// skipped rather than treated as an error, so free columns survive the
    /// reduction. With `trace` set, every intermediate matrix is logged.
    pub fn row_reduce(&mut self, trace: bool) -> Result<(), MatrixError> {
        let (rows, cols) = self.shape;
        if trace {
            tracing::debug!("starting matrix\n{}", self);
        }

        let (mut row, mut col) = (0, 0);
        while row < rows && col < cols {
            if self[(row, col)].is_zero() {
                match (row + 1..rows).find(|&r| !self[(r, col)].is_zero()) {
                    Some(other) => {
                        self.swap_rows(row, other);
                        if trace {
                            tracing::debug!("swapped rows {} and {}\n{}", row, other, self);
                        }
                    }
                    None => col += 1,
                }
                continue;
            }

            let pivot = self[(row, col)];
            if !pivot.is_one() {
                let inverse = pivot.inverse()?;
                for c in 0..cols {
                    self[(row, c)] = self[(row, c)].checked_mul(inverse)?;
                }
                if trace {
                    tracing::debug!("scaled row {} to a unit pivot\n{}", row, self);
                }
            }

            for other in 0..rows {
                let factor = self[(other, col)];
                if other == row || factor.is_zero() {
                    continue;
                }
                for c in 0..cols {
                    let delta = self[(row, c)].checked_mul(factor)?;
                    self[(other, c)] = self[(other, c)].checked_sub(delta)?;
                }
                if trace {
                    tracing::debug!("eliminated column {} from row {}\n{}", col, other, self);
                }
            }

            row += 1;
            col += 1;
        }

        Ok(())
    }

    /// The pivot column of each row of a reduced matrix, `None` for zero rows.
    /// The constant column never counts as a pivot.
    pub fn pivot_columns(&self) -> Vec<Option<usize>> {
        let variables = self.cols().saturating_sub(1);
        (0..self.rows())
            .map(|row| self.row(row)[..variables].iter().position(|v| !v.is_zero()))
            .collect()
    }

    /// Read the value of every variable from a reduced matrix.
    ///
    /// Fails when a zero row carries a non-zero constant or when a variable
    /// has no pivot row.
    pub fn solutions(&self) -> Result<Vec<Rational>, MatrixError> {
        let variables = self.cols().saturating_sub(1);
        let mut values = vec![None; variables];

        for (row, pivot) in self.pivot_columns().into_iter().enumerate() {
            let constant = self[(row, variables)];
            match pivot {
                Some(column) => values[column] = Some(constant),
                None if !constant.is_zero() => {
                    return Err(MatrixError::Inconsistent { row, constant });
                }
                None => {}
            }
        }

        values
            .into_iter()
            .enumerate()
            .map(|(column, value)| value.ok_or(MatrixError::Underdetermined { column }))
            .collect()
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Rational;

    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[row * self.shape.1 + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Rational {
        &mut self.data[row * self.shape.1 + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.data.iter().map(Rational::to_string).collect();
        let widths: Vec<usize> = (0..self.cols())
            .map(|col| {
                (0..self.rows())
                    .map(|row| cells[row * self.cols() + col].len())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        for row in 0..self.rows() {
            if row > 0 {
                writeln!(f)?;
            }
            for (col, width) in widths.iter().enumerate() {
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:<width$}", cells[row * self.cols() + col], width = width)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reduced(rows: &[&[i64]]) -> Matrix {
        let mut matrix = Matrix::from_integers(rows).unwrap();
        matrix.row_reduce(false).unwrap();
        matrix
    }

    #[test]
    fn reduces_with_a_free_column() {
        let matrix = reduced(&[&[0, 0, 1, -1, -2], &[2, -4, -2, 4, 18], &[-1, 2, 3, -5, -16]]);
        let expected = Matrix::from_integers(&[
            &[1, -2, 0, 0, 4],
            &[0, 0, 1, 0, 1],
            &[0, 0, 0, 1, 3],
        ])
        .unwrap();
        assert_eq!(matrix, expected);
        assert_eq!(matrix.pivot_columns(), vec![Some(0), Some(2), Some(3)]);
        assert_eq!(matrix.solutions(), Err(MatrixError::Underdetermined { column: 1 }));
    }

    #[test]
    fn solves_a_square_system() {
        let matrix = reduced(&[&[1, 2, 3, 6], &[2, -3, 2, 14], &[3, 1, -1, -2]]);
        let expected =
            Matrix::from_integers(&[&[1, 0, 0, 1], &[0, 1, 0, -2], &[0, 0, 1, 3]]).unwrap();
        assert_eq!(matrix, expected);
        assert_eq!(
            matrix.solutions().unwrap(),
            vec![Rational::from(1), Rational::from(-2), Rational::from(3)]
        );
    }

    #[test]
    fn detects_inconsistent_rows() {
        let matrix = reduced(&[&[1, 1, 2], &[3, 4, 5], &[4, 5, 9]]);
        let expected = Matrix::from_integers(&[&[1, 0, 0], &[0, 1, 0], &[0, 0, 1]]).unwrap();
        assert_eq!(matrix, expected);

        let inconsistent = reduced(&[&[1, 1, 2], &[2, 2, 5]]);
        assert!(matches!(
            inconsistent.solutions(),
            Err(MatrixError::Inconsistent { row: 1, .. })
        ));
    }

    #[test]
    fn keeps_fractions_exact() {
        let matrix = reduced(&[&[3, 0, 1], &[0, 7, 2]]);
        assert_eq!(
            matrix.solutions().unwrap(),
            vec![Rational::new(1, 3).unwrap(), Rational::new(2, 7).unwrap()]
        );
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Matrix::from_integers(&[&[1, 2, 3], &[1, 2]]).unwrap_err();
        assert_eq!(
            err,
            MatrixError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        );
        assert_eq!(Matrix::from_rows(Vec::new()), Err(MatrixError::Empty));
    }

    #[test]
    fn display_aligns_columns() {
        let matrix = Matrix::from_rows(vec![
            vec![Rational::new(1, 2).unwrap(), Rational::from(3)],
            vec![Rational::from(10), Rational::from(-1)],
        ])
        .unwrap();
        assert_eq!(matrix.to_string(), "1/2 3 \n10  -1");
    }

    proptest! {
        #[test]
        fn pivot_columns_are_unit_columns(
            entries in proptest::collection::vec(-6i64..6, 12),
        ) {
            let rows: Vec<&[i64]> = entries.chunks(4).collect();
            let matrix = reduced(&rows);
            for (row, pivot) in matrix.pivot_columns().into_iter().enumerate() {
                let Some(column) = pivot else { continue };
                for other in 0..matrix.rows() {
                    let expected = if other == row { Rational::ONE } else { Rational::ZERO };
                    prop_assert_eq!(matrix[(other, column)], expected);
                }
            }
        }
    }
}
