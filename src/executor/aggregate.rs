//! Aggregate functions, accumulators, and the streaming group-by node.
//!
//! Accumulators follow a three-phase lifecycle: creation, `feed` per
//! value, `finish` for the final result. The [`AggregateNode`] assumes
//! its input is clustered by the group columns and emits one row per
//! group as each boundary passes, so memory stays proportional to one
//! group regardless of input size.

use crate::datum::Value;
use crate::tuple::{ColumnIndex, Row};

use super::error::ExecutorError;
use super::node::{compare_values, resolve, ExecutorNode};
use super::plan::AggregateSpec;

/// Supported aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// Counts rows.
    Count,
    /// Arithmetic mean of numeric values.
    Average,
    /// Sum of numeric values.
    Sum,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
}

impl AggregateFunction {
    /// Creates a fresh accumulator for one group.
    pub fn accumulator(self) -> Box<dyn Accumulator> {
        match self {
            AggregateFunction::Count => Box::new(CountAccumulator { count: 0 }),
            AggregateFunction::Average => Box::new(AverageAccumulator { sum: 0.0, count: 0 }),
            AggregateFunction::Sum => Box::new(SumAccumulator { sum: None }),
            AggregateFunction::Min => Box::new(MinMaxAccumulator {
                best: None,
                keep_min: true,
            }),
            AggregateFunction::Max => Box::new(MinMaxAccumulator {
                best: None,
                keep_min: false,
            }),
        }
    }
}

/// Stateful aggregate computation over one group's values.
pub trait Accumulator {
    /// Feeds a single value into the accumulator.
    fn feed(&mut self, value: &Value) -> Result<(), ExecutorError>;

    /// Produces the final aggregate result.
    fn finish(&self) -> Value;
}

/// Counts `feed` calls; the value itself is ignored.
struct CountAccumulator {
    count: i32,
}

impl Accumulator for CountAccumulator {
    fn feed(&mut self, _value: &Value) -> Result<(), ExecutorError> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or(ExecutorError::IntegerOverflow)?;
        Ok(())
    }

    fn finish(&self) -> Value {
        Value::Int(self.count)
    }
}

/// Tracks a running sum and count.
///
/// Accumulates in `f64` and narrows the final mean to the engine's
/// 32-bit float, which bounds the drift of long sums at the cost of one
/// rounding step at the end.
struct AverageAccumulator {
    sum: f64,
    count: i64,
}

impl Accumulator for AverageAccumulator {
    fn feed(&mut self, value: &Value) -> Result<(), ExecutorError> {
        let v = match value {
            Value::Int(n) => *n as f64,
            Value::Float(n) => *n as f64,
            Value::String(_) => {
                return Err(ExecutorError::TypeMismatch {
                    expected: "a numeric value".to_string(),
                    found: value.ty(),
                });
            }
        };
        self.sum += v;
        self.count += 1;
        Ok(())
    }

    fn finish(&self) -> Value {
        Value::Float((self.sum / self.count as f64) as f32)
    }
}

/// Sums numeric values, keeping the input's type.
///
/// Integer sums use checked arithmetic; a 32-bit overflow is an error,
/// not a wrap.
struct SumAccumulator {
    sum: Option<Value>,
}

impl Accumulator for SumAccumulator {
    fn feed(&mut self, value: &Value) -> Result<(), ExecutorError> {
        self.sum = Some(match (&self.sum, value) {
            (None, Value::Int(n)) => Value::Int(*n),
            (None, Value::Float(n)) => Value::Float(*n),
            (Some(Value::Int(a)), Value::Int(b)) => {
                Value::Int(a.checked_add(*b).ok_or(ExecutorError::IntegerOverflow)?)
            }
            (Some(Value::Float(a)), Value::Float(b)) => Value::Float(a + b),
            _ => {
                return Err(ExecutorError::TypeMismatch {
                    expected: "a numeric value matching the running sum".to_string(),
                    found: value.ty(),
                });
            }
        });
        Ok(())
    }

    fn finish(&self) -> Value {
        // groups are never empty, so the sum is always set by now
        self.sum.clone().unwrap_or(Value::Int(0))
    }
}

/// Tracks the minimum or maximum value seen.
struct MinMaxAccumulator {
    best: Option<Value>,
    keep_min: bool,
}

impl Accumulator for MinMaxAccumulator {
    fn feed(&mut self, value: &Value) -> Result<(), ExecutorError> {
        match &self.best {
            None => self.best = Some(value.clone()),
            Some(best) => {
                let ord = compare_values(value, best)?;
                let replace = if self.keep_min {
                    ord == std::cmp::Ordering::Less
                } else {
                    ord == std::cmp::Ordering::Greater
                };
                if replace {
                    self.best = Some(value.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        self.best.clone().unwrap_or(Value::Int(0))
    }
}

/// Streaming group-by over input clustered on the group columns.
pub struct AggregateNode {
    child: Box<ExecutorNode>,
    group_positions: Vec<usize>,
    specs: Vec<(AggregateFunction, usize)>,
    current_key: Option<Vec<Value>>,
    accumulators: Vec<Box<dyn Accumulator>>,
    done: bool,
    columns: ColumnIndex,
}

impl AggregateNode {
    pub(super) fn new(
        child: Box<ExecutorNode>,
        group_by: &[String],
        aggregates: Vec<AggregateSpec>,
    ) -> Result<Self, ExecutorError> {
        let group_positions = group_by
            .iter()
            .map(|name| resolve(child.columns(), name))
            .collect::<Result<Vec<_>, _>>()?;
        let specs = aggregates
            .iter()
            .map(|spec| Ok((spec.function, resolve(child.columns(), &spec.input)?)))
            .collect::<Result<Vec<_>, ExecutorError>>()?;

        let mut names = group_by.to_vec();
        names.extend(aggregates.into_iter().map(|spec| spec.output));
        Ok(Self {
            child,
            group_positions,
            specs,
            current_key: None,
            accumulators: Vec::new(),
            done: false,
            columns: ColumnIndex::new(names),
        })
    }

    pub(super) fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    fn key_of(&self, row: &Row) -> Vec<Value> {
        self.group_positions
            .iter()
            .map(|&position| row.values[position].clone())
            .collect()
    }

    fn fresh_accumulators(&self) -> Vec<Box<dyn Accumulator>> {
        self.specs
            .iter()
            .map(|(function, _)| function.accumulator())
            .collect()
    }

    fn feed(&mut self, row: &Row) -> Result<(), ExecutorError> {
        for ((_, position), accumulator) in self.specs.iter().zip(&mut self.accumulators) {
            accumulator.feed(&row.values[*position])?;
        }
        Ok(())
    }

    fn emit(&mut self, key: Vec<Value>) -> Row {
        let mut values = key;
        values.extend(self.accumulators.iter().map(|acc| acc.finish()));
        Row::new(values)
    }

    pub(super) fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        if self.done {
            return Ok(None);
        }
        loop {
            match self.child.next()? {
                Some(row) => {
                    let key = self.key_of(&row);
                    match &self.current_key {
                        None => {
                            self.current_key = Some(key);
                            self.accumulators = self.fresh_accumulators();
                            self.feed(&row)?;
                        }
                        Some(current) if *current == key => self.feed(&row)?,
                        Some(_) => {
                            // group boundary: finish the previous group,
                            // then start this row's group
                            let finished = self.current_key.replace(key);
                            let out = finished.map(|k| self.emit(k));
                            self.accumulators = self.fresh_accumulators();
                            self.feed(&row)?;
                            return Ok(out);
                        }
                    }
                }
                None => {
                    self.done = true;
                    let finished = self.current_key.take();
                    return Ok(finished.map(|k| self.emit(k)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::executor::env::Environment;
    use crate::executor::plan::Operator;

    fn sales_columns() -> ColumnIndex {
        ColumnIndex::new(vec!["city".into(), "amount".into()])
    }

    fn sale(city: &str, amount: i32) -> Row {
        Row::new(vec![Value::String(city.into()), Value::Int(amount)])
    }

    fn clustered_sales() -> Vec<Row> {
        vec![
            sale("Berlin", 10),
            sale("Berlin", 20),
            sale("Paris", 5),
            sale("Rome", 1),
            sale("Rome", 2),
            sale("Rome", 3),
        ]
    }

    fn build_aggregate(
        group_by: &[&str],
        aggregates: Vec<AggregateSpec>,
        rows: Vec<Row>,
    ) -> ExecutorNode {
        let mut env = Environment::new("/nonexistent");
        let input = ExecutorNode::values(sales_columns(), rows);
        ExecutorNode::build(
            Operator::aggregate(group_by.iter().copied(), aggregates),
            Some(input),
            &mut env,
        )
        .unwrap()
    }

    fn drain(mut node: ExecutorNode) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(row) = node.next().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_count_per_group() {
        let node = build_aggregate(
            &["city"],
            vec![AggregateSpec::new(AggregateFunction::Count, "amount", "n")],
            clustered_sales(),
        );
        assert_eq!(node.columns().names(), &["city", "n"]);
        assert_eq!(
            drain(node),
            vec![
                Row::new(vec![Value::String("Berlin".into()), Value::Int(2)]),
                Row::new(vec![Value::String("Paris".into()), Value::Int(1)]),
                Row::new(vec![Value::String("Rome".into()), Value::Int(3)]),
            ]
        );
    }

    #[test]
    fn test_average_yields_float() {
        let node = build_aggregate(
            &["city"],
            vec![AggregateSpec::new(
                AggregateFunction::Average,
                "amount",
                "avg",
            )],
            clustered_sales(),
        );
        assert_eq!(
            drain(node),
            vec![
                Row::new(vec![Value::String("Berlin".into()), Value::Float(15.0)]),
                Row::new(vec![Value::String("Paris".into()), Value::Float(5.0)]),
                Row::new(vec![Value::String("Rome".into()), Value::Float(2.0)]),
            ]
        );
    }

    #[test]
    fn test_sum_min_max() {
        let node = build_aggregate(
            &["city"],
            vec![
                AggregateSpec::new(AggregateFunction::Sum, "amount", "total"),
                AggregateSpec::new(AggregateFunction::Min, "amount", "lo"),
                AggregateSpec::new(AggregateFunction::Max, "amount", "hi"),
            ],
            clustered_sales(),
        );
        assert_eq!(node.columns().names(), &["city", "total", "lo", "hi"]);
        let rows = drain(node);
        assert_eq!(
            rows[2],
            Row::new(vec![
                Value::String("Rome".into()),
                Value::Int(6),
                Value::Int(1),
                Value::Int(3),
            ])
        );
    }

    #[test]
    fn test_empty_group_by_is_one_group() {
        let node = build_aggregate(
            &[],
            vec![AggregateSpec::new(AggregateFunction::Count, "city", "n")],
            clustered_sales(),
        );
        assert_eq!(node.columns().names(), &["n"]);
        assert_eq!(drain(node), vec![Row::new(vec![Value::Int(6)])]);
    }

    #[test]
    fn test_empty_input_emits_nothing() {
        let node = build_aggregate(
            &[],
            vec![AggregateSpec::new(AggregateFunction::Count, "city", "n")],
            vec![],
        );
        assert!(drain(node).is_empty());
    }

    #[test]
    fn test_unknown_source_column_is_eager() {
        let mut env = Environment::new("/nonexistent");
        let input = ExecutorNode::values(sales_columns(), clustered_sales());
        let result = ExecutorNode::build(
            Operator::aggregate(
                ["city"],
                vec![AggregateSpec::new(AggregateFunction::Sum, "price", "total")],
            ),
            Some(input),
            &mut env,
        );
        assert!(matches!(result, Err(ExecutorError::UnknownColumn(name)) if name == "price"));
    }

    #[test]
    fn test_average_of_strings_fails_at_iteration() {
        let mut node = build_aggregate(
            &[],
            vec![AggregateSpec::new(
                AggregateFunction::Average,
                "city",
                "avg",
            )],
            clustered_sales(),
        );
        assert!(matches!(
            node.next(),
            Err(ExecutorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unclustered_groups_reemit() {
        // clustering is the caller's contract; an interleaved input
        // simply yields one row per contiguous run
        let node = build_aggregate(
            &["city"],
            vec![AggregateSpec::new(AggregateFunction::Count, "amount", "n")],
            vec![sale("Rome", 1), sale("Paris", 2), sale("Rome", 3)],
        );
        assert_eq!(drain(node).len(), 3);
    }
}
