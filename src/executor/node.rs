//! Executor nodes implementing the Volcano iterator model.
//!
//! Each node produces rows one at a time via [`ExecutorNode::next()`].
//! Nodes compose into a tree (e.g. Limit -> Selection -> Sort -> Scan)
//! where each parent pulls rows from its child; only sort, the hash-join
//! build side, and aggregate group boundaries buffer input.
//!
//! Uses enum dispatch instead of `dyn Trait`: the operator set is small
//! and fixed, and the match keeps construction and iteration in one
//! place.

use std::cmp::Ordering;
use std::fs::File;

use crate::catalog::{csv_path, heap_path, Catalog};
use crate::datum::{SchemaError, Type, Value};
use crate::heap::HeapScan;
use crate::tuple::{row_from_strings, ColumnIndex, Row};

use super::aggregate::AggregateNode;
use super::env::Environment;
use super::error::ExecutorError;
use super::join::{HashJoinNode, NestedLoopsJoinNode, SortMergeJoinNode};
use super::plan::{CompareOp, Connector, Operator, Predicate, RESULT_KEY};

/// Resolves a column name to its position, or fails with
/// `UnknownColumn`.
pub(crate) fn resolve(columns: &ColumnIndex, name: &str) -> Result<usize, ExecutorError> {
    columns
        .index_of(name)
        .ok_or_else(|| ExecutorError::UnknownColumn(name.to_string()))
}

/// Compares two row values, surfacing incomparable kinds as a type
/// mismatch.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Result<Ordering, ExecutorError> {
    left.compare(right)
        .ok_or_else(|| ExecutorError::TypeMismatch {
            expected: format!("a value comparable to {}", right.ty()),
            found: left.ty(),
        })
}

/// Unwraps a chain's current input, which every non-scan operator
/// requires.
fn require_input(input: Option<ExecutorNode>) -> Result<Box<ExecutorNode>, ExecutorError> {
    input
        .map(Box::new)
        .ok_or_else(|| ExecutorError::MissingStep(RESULT_KEY.to_string()))
}

/// A query executor node.
pub enum ExecutorNode {
    /// CSV file scan.
    CsvScan(CsvScan),
    /// Heap file scan.
    HeapScan(HeapScanNode),
    /// Fixed in-memory rows.
    Values(ValuesNode),
    /// Column projection.
    Projection(ProjectionNode),
    /// Predicate filter.
    Selection(SelectionNode),
    /// Row-count cap.
    Limit(LimitNode),
    /// Ascending sort.
    Sort(SortNode),
    /// Left-then-right concatenation.
    Merge(MergeNode),
    /// Join by filtered Cartesian product.
    NestedLoopsJoin(NestedLoopsJoinNode),
    /// Equijoin via a build-side hash table.
    HashJoin(HashJoinNode),
    /// Equijoin over sorted inputs.
    SortMergeJoin(SortMergeJoinNode),
    /// Streaming group-by.
    Aggregate(AggregateNode),
}

impl ExecutorNode {
    /// Builds a runnable node from an operator description.
    ///
    /// `input` is the chain's current node; scans ignore (and drop) it.
    /// Join and merge operators additionally take the referenced step's
    /// node out of `env`. Static validation (unknown columns, an
    /// unsupported join predicate, a missing step) happens here;
    /// data-dependent errors surface from [`next`](Self::next).
    pub fn build(
        op: Operator,
        input: Option<ExecutorNode>,
        env: &mut Environment,
    ) -> Result<ExecutorNode, ExecutorError> {
        match op {
            Operator::ScanCsv { table } => {
                drop(input);
                Ok(ExecutorNode::CsvScan(CsvScan::open(env.data_dir(), &table)?))
            }
            Operator::ScanHeap { table } => {
                drop(input);
                Ok(ExecutorNode::HeapScan(HeapScanNode::open(
                    env.data_dir(),
                    &table,
                )?))
            }
            Operator::Projection { columns } => Ok(ExecutorNode::Projection(ProjectionNode::new(
                require_input(input)?,
                &columns,
            ))),
            Operator::Selection { first, rest } => Ok(ExecutorNode::Selection(
                SelectionNode::new(require_input(input)?, first, rest)?,
            )),
            Operator::Limit { count } => Ok(ExecutorNode::Limit(LimitNode {
                child: require_input(input)?,
                remaining: count,
            })),
            Operator::Sort { fields } => Ok(ExecutorNode::Sort(SortNode::new(
                require_input(input)?,
                &fields,
            )?)),
            Operator::Merge { step } => {
                let left = require_input(input)?;
                let right = Box::new(env.take_step(&step)?);
                Ok(ExecutorNode::Merge(MergeNode {
                    left,
                    right,
                    on_right: false,
                }))
            }
            Operator::NestedLoopsJoin { predicate, step } => {
                let left = require_input(input)?;
                let right = Box::new(env.take_step(&step)?);
                Ok(ExecutorNode::NestedLoopsJoin(NestedLoopsJoinNode::new(
                    left, right, predicate, &step,
                )?))
            }
            Operator::HashJoin { predicate, step } => {
                let left = require_input(input)?;
                let right = Box::new(env.take_step(&step)?);
                Ok(ExecutorNode::HashJoin(HashJoinNode::new(
                    left, right, predicate, &step,
                )?))
            }
            Operator::SortMergeJoin { predicate, step } => {
                let left = require_input(input)?;
                let right = Box::new(env.take_step(&step)?);
                Ok(ExecutorNode::SortMergeJoin(SortMergeJoinNode::new(
                    left, right, predicate, &step,
                )?))
            }
            Operator::Aggregate {
                group_by,
                aggregates,
            } => Ok(ExecutorNode::Aggregate(AggregateNode::new(
                require_input(input)?,
                &group_by,
                aggregates,
            )?)),
        }
    }

    /// Creates a node over fixed in-memory rows.
    pub fn values(columns: ColumnIndex, rows: Vec<Row>) -> ExecutorNode {
        ExecutorNode::Values(ValuesNode {
            columns,
            rows: rows.into_iter(),
        })
    }

    /// Returns the next row, or `None` when exhausted.
    ///
    /// Follows the Volcano naming convention rather than
    /// `std::iter::Iterator` because it returns `Result<Option<_>>`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        match self {
            ExecutorNode::CsvScan(n) => n.next(),
            ExecutorNode::HeapScan(n) => n.next(),
            ExecutorNode::Values(n) => n.next(),
            ExecutorNode::Projection(n) => n.next(),
            ExecutorNode::Selection(n) => n.next(),
            ExecutorNode::Limit(n) => n.next(),
            ExecutorNode::Sort(n) => n.next(),
            ExecutorNode::Merge(n) => n.next(),
            ExecutorNode::NestedLoopsJoin(n) => n.next(),
            ExecutorNode::HashJoin(n) => n.next(),
            ExecutorNode::SortMergeJoin(n) => n.next(),
            ExecutorNode::Aggregate(n) => n.next(),
        }
    }

    /// Returns this node's output column index.
    pub fn columns(&self) -> &ColumnIndex {
        match self {
            ExecutorNode::CsvScan(n) => &n.columns,
            ExecutorNode::HeapScan(n) => &n.columns,
            ExecutorNode::Values(n) => &n.columns,
            ExecutorNode::Projection(n) => &n.columns,
            ExecutorNode::Selection(n) => n.child.columns(),
            ExecutorNode::Limit(n) => n.child.columns(),
            ExecutorNode::Sort(n) => n.child.columns(),
            ExecutorNode::Merge(n) => n.left.columns(),
            ExecutorNode::NestedLoopsJoin(n) => n.columns(),
            ExecutorNode::HashJoin(n) => n.columns(),
            ExecutorNode::SortMergeJoin(n) => n.columns(),
            ExecutorNode::Aggregate(n) => n.columns(),
        }
    }
}

/// CSV scan: the header row names the columns, the catalog types them.
pub struct CsvScan {
    columns: ColumnIndex,
    schema: Vec<Type>,
    records: csv::StringRecordsIntoIter<File>,
}

impl CsvScan {
    fn open(dir: &std::path::Path, table: &str) -> Result<Self, ExecutorError> {
        let catalog = Catalog::read(dir, table)?;
        let file = File::open(csv_path(dir, table))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.len() != catalog.arity() {
            return Err(SchemaError::ArityMismatch {
                expected: catalog.arity(),
                actual: headers.len(),
            }
            .into());
        }
        Ok(Self {
            columns: ColumnIndex::new(headers),
            schema: catalog.schema,
            records: reader.into_records(),
        })
    }

    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        match self.records.next() {
            None => Ok(None),
            Some(record) => {
                let record = record?;
                let fields: Vec<&str> = record.iter().collect();
                Ok(Some(row_from_strings(&self.schema, &fields)?))
            }
        }
    }
}

/// Heap file scan.
pub struct HeapScanNode {
    columns: ColumnIndex,
    scan: HeapScan<File>,
}

impl HeapScanNode {
    fn open(dir: &std::path::Path, table: &str) -> Result<Self, ExecutorError> {
        let catalog = Catalog::read(dir, table)?;
        let file = File::open(heap_path(dir, table))?;
        Ok(Self {
            columns: catalog.column_index(),
            scan: HeapScan::new(file, &catalog),
        })
    }

    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        Ok(self.scan.next().transpose()?)
    }
}

/// Fixed in-memory rows behind the node interface.
pub struct ValuesNode {
    columns: ColumnIndex,
    rows: std::vec::IntoIter<Row>,
}

impl ValuesNode {
    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        Ok(self.rows.next())
    }
}

/// Projection onto a subset of the input columns.
pub struct ProjectionNode {
    child: Box<ExecutorNode>,
    keep: Vec<usize>,
    columns: ColumnIndex,
}

impl ProjectionNode {
    fn new(child: Box<ExecutorNode>, requested: &[String]) -> Self {
        // Input order wins; names absent from the input are dropped.
        let mut keep = Vec::new();
        let mut names = Vec::new();
        for (position, name) in child.columns().names().iter().enumerate() {
            if requested.iter().any(|r| r == name) {
                keep.push(position);
                names.push(name.clone());
            }
        }
        Self {
            child,
            keep,
            columns: ColumnIndex::new(names),
        }
    }

    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        match self.child.next()? {
            Some(row) => {
                let values = self
                    .keep
                    .iter()
                    .map(|&position| row.values[position].clone())
                    .collect();
                Ok(Some(Row::new(values)))
            }
            None => Ok(None),
        }
    }
}

/// A predicate bound to a column position.
struct BoundPredicate {
    op: CompareOp,
    position: usize,
    literal: Value,
}

impl BoundPredicate {
    fn bind(columns: &ColumnIndex, predicate: Predicate) -> Result<Self, ExecutorError> {
        Ok(Self {
            op: predicate.op,
            position: resolve(columns, &predicate.column)?,
            literal: predicate.literal,
        })
    }

    fn eval(&self, row: &Row) -> Result<bool, ExecutorError> {
        let ord = compare_values(&row.values[self.position], &self.literal)?;
        Ok(self.op.matches(ord))
    }
}

/// Lazy predicate filter.
pub struct SelectionNode {
    child: Box<ExecutorNode>,
    first: BoundPredicate,
    rest: Option<(Connector, BoundPredicate)>,
}

impl SelectionNode {
    fn new(
        child: Box<ExecutorNode>,
        first: Predicate,
        rest: Option<(Connector, Predicate)>,
    ) -> Result<Self, ExecutorError> {
        let first = BoundPredicate::bind(child.columns(), first)?;
        let rest = match rest {
            Some((connector, second)) => {
                Some((connector, BoundPredicate::bind(child.columns(), second)?))
            }
            None => None,
        };
        Ok(Self { child, first, rest })
    }

    fn accepts(&self, row: &Row) -> Result<bool, ExecutorError> {
        let first = self.first.eval(row)?;
        match &self.rest {
            None => Ok(first),
            // short-circuit: the second predicate only runs when needed
            Some((Connector::And, second)) => Ok(first && second.eval(row)?),
            Some((Connector::Or, second)) => Ok(first || second.eval(row)?),
        }
    }

    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        loop {
            match self.child.next()? {
                Some(row) => {
                    if self.accepts(&row)? {
                        return Ok(Some(row));
                    }
                }
                None => return Ok(None),
            }
        }
    }
}

/// Emits at most the first `remaining` rows of its child.
pub struct LimitNode {
    child: Box<ExecutorNode>,
    remaining: usize,
}

impl LimitNode {
    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        if self.remaining == 0 {
            return Ok(None);
        }
        match self.child.next()? {
            Some(row) => {
                self.remaining -= 1;
                Ok(Some(row))
            }
            None => {
                self.remaining = 0;
                Ok(None)
            }
        }
    }
}

enum SortState {
    Accumulating,
    Emitting(std::vec::IntoIter<Row>),
}

/// Ascending sort by a lexicographic key tuple.
///
/// Accumulates its entire input on the first pull, then emits lazily in
/// order. Ordering of equal keys is not guaranteed.
pub struct SortNode {
    child: Box<ExecutorNode>,
    key: Vec<usize>,
    state: SortState,
}

impl SortNode {
    fn new(child: Box<ExecutorNode>, fields: &[String]) -> Result<Self, ExecutorError> {
        let key = fields
            .iter()
            .map(|field| resolve(child.columns(), field))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            child,
            key,
            state: SortState::Accumulating,
        })
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for &position in &self.key {
            let ord = a.values[position].total_order(&b.values[position]);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        if let SortState::Accumulating = self.state {
            let mut rows = Vec::new();
            while let Some(row) = self.child.next()? {
                rows.push(row);
            }
            rows.sort_unstable_by(|a, b| self.compare(a, b));
            self.state = SortState::Emitting(rows.into_iter());
        }
        match &mut self.state {
            SortState::Emitting(rows) => Ok(rows.next()),
            SortState::Accumulating => unreachable!("sort state set above"),
        }
    }
}

/// Left-then-right concatenation of two inputs.
///
/// Duplicates are preserved; the left side's column index names the
/// output.
pub struct MergeNode {
    left: Box<ExecutorNode>,
    right: Box<ExecutorNode>,
    on_right: bool,
}

impl MergeNode {
    fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        if !self.on_right {
            if let Some(row) = self.left.next()? {
                return Ok(Some(row));
            }
            self.on_right = true;
        }
        self.right.next()
    }
}
