//! Plan model: operator descriptions consumed by node construction.
//!
//! A [`Plan`] is an ordered list of `(step key, operator chain)` pairs.
//! Operators are plain data; [`ExecutorNode::build`](super::ExecutorNode::build)
//! turns them into runnable nodes. Comparisons are a tagged enum
//! evaluated against decoded scalars.

use std::cmp::Ordering;
use std::fmt;

use crate::datum::Value;

use super::aggregate::AggregateFunction;

/// Reserved step key naming the chain the executor materializes.
pub const RESULT_KEY: &str = "__result__";

/// An ordered list of plan steps.
pub type Plan = Vec<(String, Vec<Operator>)>;

/// Comparison kind applied to two scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=`
    Eq,
    /// `!=`
    Ne,
}

impl CompareOp {
    /// Returns true if an ordering between two values satisfies this
    /// comparison.
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
        }
    }

    /// Returns true for the equality comparison, the only one the
    /// hash and sort-merge joins accept.
    pub fn is_equality(self) -> bool {
        self == CompareOp::Eq
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
        };
        write!(f, "{}", symbol)
    }
}

/// Logical connector between two selection predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// Both predicates must hold; the second is skipped when the first
    /// fails.
    And,
    /// Either predicate may hold; the second is skipped when the first
    /// holds.
    Or,
}

/// A selection predicate: `column <op> literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Comparison kind.
    pub op: CompareOp,
    /// Column resolved against the input's column index.
    pub column: String,
    /// Right-hand literal.
    pub literal: Value,
}

impl Predicate {
    /// Creates a predicate.
    pub fn new(op: CompareOp, column: impl Into<String>, literal: Value) -> Self {
        Self {
            op,
            column: column.into(),
            literal,
        }
    }
}

/// A join predicate: `left_column <op> right_column`.
///
/// The left column resolves against the joining chain's input; the right
/// column resolves against the referenced step's columns after
/// collision renaming.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPredicate {
    /// Comparison kind.
    pub op: CompareOp,
    /// Column of the left (current) input.
    pub left: String,
    /// Column of the right (referenced step) input.
    pub right: String,
}

impl JoinPredicate {
    /// Creates a join predicate.
    pub fn new(op: CompareOp, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            op,
            left: left.into(),
            right: right.into(),
        }
    }
}

/// One aggregate computation within an aggregate operator.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    /// Aggregate function to apply.
    pub function: AggregateFunction,
    /// Source column fed to the accumulator.
    pub input: String,
    /// Name of the produced output column.
    pub output: String,
}

impl AggregateSpec {
    /// Creates an aggregate spec.
    pub fn new(
        function: AggregateFunction,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            function,
            input: input.into(),
            output: output.into(),
        }
    }
}

/// A lazy relational operator, described as data.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Scan a table's CSV source; columns come from the header row.
    ScanCsv {
        /// Table name.
        table: String,
    },
    /// Scan a table's heap file.
    ScanHeap {
        /// Table name.
        table: String,
    },
    /// Keep only the named columns, preserving input order. Unknown
    /// names are silently excluded.
    Projection {
        /// Columns to retain.
        columns: Vec<String>,
    },
    /// Filter rows by one predicate, or two joined by a connector.
    Selection {
        /// First predicate.
        first: Predicate,
        /// Optional connector and second predicate.
        rest: Option<(Connector, Predicate)>,
    },
    /// Emit at most the first `count` rows.
    Limit {
        /// Row cap.
        count: usize,
    },
    /// Sort ascending by the lexicographic key tuple over `fields`.
    Sort {
        /// Key columns, most significant first.
        fields: Vec<String>,
    },
    /// Concatenate the input with the rows of another step.
    Merge {
        /// Step key of the appended side.
        step: String,
    },
    /// Cartesian-product join filtered by an arbitrary comparison.
    NestedLoopsJoin {
        /// Join predicate.
        predicate: JoinPredicate,
        /// Step key of the right side.
        step: String,
    },
    /// Equijoin via a build-side hash table.
    HashJoin {
        /// Join predicate; must be equality.
        predicate: JoinPredicate,
        /// Step key of the probe side.
        step: String,
    },
    /// Equijoin by merging two inputs sorted on their keys.
    SortMergeJoin {
        /// Join predicate; must be equality.
        predicate: JoinPredicate,
        /// Step key of the right side.
        step: String,
    },
    /// Streaming group-by over input clustered on the group columns.
    Aggregate {
        /// Grouping columns; empty means one group over all input.
        group_by: Vec<String>,
        /// Aggregates computed per group.
        aggregates: Vec<AggregateSpec>,
    },
}

impl Operator {
    /// Returns true for operators that open their own source and ignore
    /// the chain's current input.
    pub fn is_scan(&self) -> bool {
        matches!(self, Operator::ScanCsv { .. } | Operator::ScanHeap { .. })
    }

    /// Scan a table's CSV source.
    pub fn scan_csv(table: impl Into<String>) -> Self {
        Operator::ScanCsv {
            table: table.into(),
        }
    }

    /// Scan a table's heap file.
    pub fn scan_heap(table: impl Into<String>) -> Self {
        Operator::ScanHeap {
            table: table.into(),
        }
    }

    /// Keep only the named columns.
    pub fn projection<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Operator::Projection {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter by a single predicate.
    pub fn selection(first: Predicate) -> Self {
        Operator::Selection { first, rest: None }
    }

    /// Filter by two predicates joined with a connector.
    pub fn selection_pair(first: Predicate, connector: Connector, second: Predicate) -> Self {
        Operator::Selection {
            first,
            rest: Some((connector, second)),
        }
    }

    /// Emit at most `count` rows.
    pub fn limit(count: usize) -> Self {
        Operator::Limit { count }
    }

    /// Sort ascending by the given key columns.
    pub fn sort<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Operator::Sort {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Concatenate with another step's rows.
    pub fn merge(step: impl Into<String>) -> Self {
        Operator::Merge { step: step.into() }
    }

    /// Join with another step by nested loops.
    pub fn nested_loops_join(predicate: JoinPredicate, step: impl Into<String>) -> Self {
        Operator::NestedLoopsJoin {
            predicate,
            step: step.into(),
        }
    }

    /// Equijoin with another step via a hash table.
    pub fn hash_join(predicate: JoinPredicate, step: impl Into<String>) -> Self {
        Operator::HashJoin {
            predicate,
            step: step.into(),
        }
    }

    /// Equijoin with another step by sorted merge.
    pub fn sort_merge_join(predicate: JoinPredicate, step: impl Into<String>) -> Self {
        Operator::SortMergeJoin {
            predicate,
            step: step.into(),
        }
    }

    /// Group and aggregate clustered input.
    pub fn aggregate<S: Into<String>>(
        group_by: impl IntoIterator<Item = S>,
        aggregates: impl IntoIterator<Item = AggregateSpec>,
    ) -> Self {
        Operator::Aggregate {
            group_by: group_by.into_iter().map(Into::into).collect(),
            aggregates: aggregates.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_op_matches() {
        assert!(CompareOp::Lt.matches(Ordering::Less));
        assert!(!CompareOp::Lt.matches(Ordering::Equal));
        assert!(CompareOp::Le.matches(Ordering::Equal));
        assert!(CompareOp::Gt.matches(Ordering::Greater));
        assert!(CompareOp::Ge.matches(Ordering::Greater));
        assert!(CompareOp::Eq.matches(Ordering::Equal));
        assert!(CompareOp::Ne.matches(Ordering::Less));
        assert!(!CompareOp::Ne.matches(Ordering::Equal));
    }

    #[test]
    fn test_equality_detection() {
        assert!(CompareOp::Eq.is_equality());
        assert!(!CompareOp::Ne.is_equality());
        assert!(!CompareOp::Lt.is_equality());
    }

    #[test]
    fn test_scan_detection() {
        assert!(Operator::scan_csv("person").is_scan());
        assert!(Operator::scan_heap("dog").is_scan());
        assert!(!Operator::limit(1).is_scan());
        assert!(!Operator::projection(["name"]).is_scan());
    }
}
