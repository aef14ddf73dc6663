//! Linear equations describing a resolved production graph
//!
//! Every linked recipe contributes one row tying its building count to its
//! first input, one row per input and one row per additional output tying
//! feed rates to each other through the recipe's throughputs. A final row
//! fixes the requested output rate. Coefficients landing in the same column
//! add up.

use crate::graph::{FeedKey, LinkedIo, LinkedRecipe, ProductionGraph};
use crate::matrix::Matrix;
use crate::rational::{Rational, RationalError};
use crate::solver::SolveError;

struct Row {
    coefficients: Vec<Rational>,
}

impl Row {
    fn new(variables: usize) -> Row {
        Row {
            coefficients: vec![Rational::ZERO; variables + 1],
        }
    }

    fn add(&mut self, column: usize, coefficient: Rational) -> Result<(), RationalError> {
        let cell = &mut self.coefficients[column];
        *cell = cell.checked_add(coefficient)?;
        Ok(())
    }

    /// Add `coefficient` to the column of every feed of `io`.
    fn add_feeds(&mut self, io: &LinkedIo<'_>, coefficient: Rational) -> Result<(), RationalError> {
        for feed in &io.feeds {
            self.add(feed.variable.column, coefficient)?;
        }
        Ok(())
    }

    fn with_constant(mut self, constant: Rational) -> Row {
        if let Some(last) = self.coefficients.last_mut() {
            *last = constant;
        }
        self
    }
}

fn per_minute(io: &LinkedIo<'_>) -> Result<Rational, RationalError> {
    io.io.throughput.inverse()
}

fn recipe_rows(
    node: &LinkedRecipe<'_>,
    variables: usize,
    rows: &mut Vec<Row>,
) -> Result<(), SolveError> {
    let first_output = node
        .outputs
        .first()
        .ok_or_else(|| SolveError::MalformedRecipe(node.id().to_string()))?;
    // recipes without inputs anchor on their first output
    let anchor = node.inputs.first().unwrap_or(first_output);
    let anchor_rate = per_minute(anchor)?;
    let output_rate = per_minute(first_output)?;

    let mut building = Row::new(variables);
    building.add(node.building.column, -Rational::ONE)?;
    building.add_feeds(anchor, anchor_rate)?;
    rows.push(building);

    for input in &node.inputs {
        let mut row = Row::new(variables);
        row.add_feeds(input, -per_minute(input)?)?;
        row.add_feeds(first_output, output_rate)?;
        rows.push(row);
    }

    for output in node.outputs.iter().skip(1) {
        let mut row = Row::new(variables);
        row.add_feeds(anchor, -anchor_rate)?;
        row.add_feeds(output, per_minute(output)?)?;
        rows.push(row);
    }

    Ok(())
}

/// Assemble the augmented matrix for `graph`, requiring `rate` per minute on
/// the `target` feed.
pub fn build_matrix(
    graph: &ProductionGraph<'_>,
    variables: usize,
    target: &FeedKey,
    rate: Rational,
) -> Result<Matrix, SolveError> {
    let mut rows = Vec::with_capacity(variables);
    for node in graph.nodes() {
        recipe_rows(node, variables, &mut rows)?;
    }

    let target_column = graph
        .feed(target)
        .map(|feed| feed.variable.column)
        .ok_or_else(|| SolveError::Internal(format!("missing target feed {target}")))?;
    let mut invariant = Row::new(variables);
    invariant.add(target_column, Rational::ONE)?;
    rows.push(invariant.with_constant(rate));

    if rows.len() != variables {
        return Err(SolveError::NotSquare {
            rows: rows.len(),
            columns: variables + 1,
        });
    }

    tracing::debug!(rows = rows.len(), columns = variables + 1, "assembled equation system");
    Ok(Matrix::from_rows(
        rows.into_iter().map(|row| row.coefficients).collect(),
    )?)
}
