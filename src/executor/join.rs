//! Join nodes: nested loops, hash, and sorted merge.
//!
//! All three emit concatenated rows whose column index is the left
//! input's columns followed by the right side's, with any right-side
//! name colliding with a left-side name renamed `<step>/<name>`. The
//! join predicate's left column resolves against the left input and its
//! right column against the post-rename right names.
//!
//! Cost profiles differ: nested loops materializes the right side and
//! accepts any comparison; hash join materializes the left side into a
//! multimap and probes lazily, equality only; sort-merge join holds only
//! the current equal-key group from each (pre-sorted) input.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::datum::Value;
use crate::tuple::{ColumnIndex, Row};

use super::error::ExecutorError;
use super::node::{compare_values, resolve, ExecutorNode};
use super::plan::{CompareOp, JoinPredicate};

/// Right-side output names: originals, except where they collide with a
/// left-side name.
fn renamed_right_names(left: &ColumnIndex, right: &ColumnIndex, step: &str) -> Vec<String> {
    right
        .names()
        .iter()
        .map(|name| {
            if left.contains(name) {
                format!("{}/{}", step, name)
            } else {
                name.clone()
            }
        })
        .collect()
}

/// Resolves a join predicate against both inputs and produces the
/// joined column index.
fn bind_join(
    left: &ExecutorNode,
    right: &ExecutorNode,
    predicate: &JoinPredicate,
    step: &str,
) -> Result<(usize, usize, ColumnIndex), ExecutorError> {
    let left_key = resolve(left.columns(), &predicate.left)?;
    let renamed = renamed_right_names(left.columns(), right.columns(), step);
    let right_key = renamed
        .iter()
        .position(|name| *name == predicate.right)
        .ok_or_else(|| ExecutorError::UnknownColumn(predicate.right.clone()))?;

    let mut names = left.columns().names().to_vec();
    names.extend(renamed);
    Ok((left_key, right_key, ColumnIndex::new(names)))
}

fn concat_rows(left: &Row, right: &Row) -> Row {
    let mut values = left.values.clone();
    values.extend(right.values.iter().cloned());
    Row::new(values)
}

/// Join by filtered Cartesian product.
///
/// Lazy over the left input; the right side is materialized once on the
/// first pull (and its node dropped, closing its resources). Output
/// order follows the left input, each left row paired with matching
/// right rows in right order.
pub struct NestedLoopsJoinNode {
    left: Box<ExecutorNode>,
    right: Option<Box<ExecutorNode>>,
    right_rows: Vec<Row>,
    current: Option<Row>,
    pos: usize,
    op: CompareOp,
    left_key: usize,
    right_key: usize,
    columns: ColumnIndex,
}

impl NestedLoopsJoinNode {
    pub(super) fn new(
        left: Box<ExecutorNode>,
        right: Box<ExecutorNode>,
        predicate: JoinPredicate,
        step: &str,
    ) -> Result<Self, ExecutorError> {
        let (left_key, right_key, columns) = bind_join(&left, &right, &predicate, step)?;
        Ok(Self {
            left,
            right: Some(right),
            right_rows: Vec::new(),
            current: None,
            pos: 0,
            op: predicate.op,
            left_key,
            right_key,
            columns,
        })
    }

    pub(super) fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub(super) fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        if let Some(mut right) = self.right.take() {
            while let Some(row) = right.next()? {
                self.right_rows.push(row);
            }
        }
        loop {
            if self.current.is_none() {
                match self.left.next()? {
                    Some(row) => {
                        self.current = Some(row);
                        self.pos = 0;
                    }
                    None => return Ok(None),
                }
            }
            if let Some(left_row) = &self.current {
                while self.pos < self.right_rows.len() {
                    let right_row = &self.right_rows[self.pos];
                    self.pos += 1;
                    let ord = compare_values(
                        &left_row.values[self.left_key],
                        &right_row.values[self.right_key],
                    )?;
                    if self.op.matches(ord) {
                        return Ok(Some(concat_rows(left_row, right_row)));
                    }
                }
            }
            self.current = None;
        }
    }
}

/// Hash-table key over a single value.
///
/// Floats hash and compare by bit pattern (NaN equals NaN) so the
/// `Eq`/`Hash` contract holds. Join keys are expected to share a type;
/// numeric coercion is the comparison operators' business, not the
/// hash table's.
#[derive(Debug, Clone)]
struct HashKey(Value);

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }
}

impl Eq for HashKey {}

impl Hash for HashKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::String(s) => {
                state.write_u8(0);
                s.hash(state);
            }
            Value::Int(n) => {
                state.write_u8(1);
                n.hash(state);
            }
            Value::Float(f) => {
                state.write_u8(2);
                f.to_bits().hash(state);
            }
        }
    }
}

/// Equijoin via a build-side hash table.
///
/// The left input is drained into a multimap on the first pull; the
/// right side probes lazily, so output follows probe order, each probe
/// row expanded by its build-side matches.
pub struct HashJoinNode {
    build: Option<Box<ExecutorNode>>,
    probe: Box<ExecutorNode>,
    table: HashMap<HashKey, Vec<Row>>,
    pending: std::vec::IntoIter<Row>,
    left_key: usize,
    right_key: usize,
    columns: ColumnIndex,
}

impl HashJoinNode {
    pub(super) fn new(
        left: Box<ExecutorNode>,
        right: Box<ExecutorNode>,
        predicate: JoinPredicate,
        step: &str,
    ) -> Result<Self, ExecutorError> {
        if !predicate.op.is_equality() {
            return Err(ExecutorError::UnsupportedOp {
                operator: "hash join",
                op: predicate.op,
            });
        }
        let (left_key, right_key, columns) = bind_join(&left, &right, &predicate, step)?;
        Ok(Self {
            build: Some(left),
            probe: right,
            table: HashMap::new(),
            pending: Vec::new().into_iter(),
            left_key,
            right_key,
            columns,
        })
    }

    pub(super) fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    pub(super) fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        if let Some(mut build) = self.build.take() {
            while let Some(row) = build.next()? {
                let key = HashKey(row.values[self.left_key].clone());
                self.table.entry(key).or_default().push(row);
            }
        }
        loop {
            if let Some(row) = self.pending.next() {
                return Ok(Some(row));
            }
            match self.probe.next()? {
                None => return Ok(None),
                Some(probe_row) => {
                    let key = HashKey(probe_row.values[self.right_key].clone());
                    if let Some(matches) = self.table.get(&key) {
                        let joined: Vec<Row> = matches
                            .iter()
                            .map(|build_row| concat_rows(build_row, &probe_row))
                            .collect();
                        self.pending = joined.into_iter();
                    }
                }
            }
        }
    }
}

/// Equijoin over two inputs sorted ascending by their join keys.
///
/// Classic merge: advance the lesser side; on a key match, materialize
/// the equal-key group from both sides and emit their cross product.
/// Memory stays proportional to the current groups.
pub struct SortMergeJoinNode {
    left: Box<ExecutorNode>,
    right: Box<ExecutorNode>,
    left_peek: Option<Row>,
    right_peek: Option<Row>,
    primed: bool,
    output: std::vec::IntoIter<Row>,
    left_key: usize,
    right_key: usize,
    columns: ColumnIndex,
}

impl SortMergeJoinNode {
    pub(super) fn new(
        left: Box<ExecutorNode>,
        right: Box<ExecutorNode>,
        predicate: JoinPredicate,
        step: &str,
    ) -> Result<Self, ExecutorError> {
        if !predicate.op.is_equality() {
            return Err(ExecutorError::UnsupportedOp {
                operator: "sort-merge join",
                op: predicate.op,
            });
        }
        let (left_key, right_key, columns) = bind_join(&left, &right, &predicate, step)?;
        Ok(Self {
            left,
            right,
            left_peek: None,
            right_peek: None,
            primed: false,
            output: Vec::new().into_iter(),
            left_key,
            right_key,
            columns,
        })
    }

    pub(super) fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    fn collect_left_group(&mut self, key: &Value) -> Result<Vec<Row>, ExecutorError> {
        let mut group = Vec::new();
        if let Some(row) = self.left_peek.take() {
            group.push(row);
        }
        loop {
            match self.left.next()? {
                Some(row) if row.values[self.left_key].total_order(key) == Ordering::Equal => {
                    group.push(row);
                }
                other => {
                    self.left_peek = other;
                    break;
                }
            }
        }
        Ok(group)
    }

    fn collect_right_group(&mut self, key: &Value) -> Result<Vec<Row>, ExecutorError> {
        let mut group = Vec::new();
        if let Some(row) = self.right_peek.take() {
            group.push(row);
        }
        loop {
            match self.right.next()? {
                Some(row) if row.values[self.right_key].total_order(key) == Ordering::Equal => {
                    group.push(row);
                }
                other => {
                    self.right_peek = other;
                    break;
                }
            }
        }
        Ok(group)
    }

    pub(super) fn next(&mut self) -> Result<Option<Row>, ExecutorError> {
        loop {
            if let Some(row) = self.output.next() {
                return Ok(Some(row));
            }
            if !self.primed {
                self.left_peek = self.left.next()?;
                self.right_peek = self.right.next()?;
                self.primed = true;
            }
            let (Some(left_row), Some(right_row)) = (&self.left_peek, &self.right_peek) else {
                return Ok(None);
            };
            match left_row.values[self.left_key].total_order(&right_row.values[self.right_key]) {
                Ordering::Less => self.left_peek = self.left.next()?,
                Ordering::Greater => self.right_peek = self.right.next()?,
                Ordering::Equal => {
                    let key = left_row.values[self.left_key].clone();
                    let left_group = self.collect_left_group(&key)?;
                    let right_group = self.collect_right_group(&key)?;
                    let mut joined = Vec::with_capacity(left_group.len() * right_group.len());
                    for l in &left_group {
                        for r in &right_group {
                            joined.push(concat_rows(l, r));
                        }
                    }
                    self.output = joined.into_iter();
                }
            }
        }
    }
}
