//! Pull-based query executor.
//!
//! This module implements the Volcano iterator model over the heap and
//! CSV scans. Each operator is a node with a `next()` method returning
//! one row at a time, so composed pipelines never materialize an
//! intermediate relation unless an operator's semantics require it
//! (sort, the hash-join build side, aggregate group boundaries).
//!
//! A plan is an ordered list of `(step key, operator chain)` pairs. Each
//! chain is composed left to right into a node tree and bound in a
//! result environment under its key; join and merge operators pull the
//! other side's node out of the environment by key. The reserved key
//! `__result__` names the chain the executor materializes and returns.
//!
//! Scan nodes own their file handles and every node owns its children,
//! so dropping the terminal node (on success, error, or early abandon)
//! closes every resource exactly once.

mod aggregate;
mod env;
mod error;
mod join;
mod node;
mod plan;
mod runner;

pub use aggregate::{Accumulator, AggregateFunction, AggregateNode};
pub use env::Environment;
pub use error::ExecutorError;
pub use join::{HashJoinNode, NestedLoopsJoinNode, SortMergeJoinNode};
pub use node::{
    CsvScan, ExecutorNode, HeapScanNode, LimitNode, MergeNode, ProjectionNode, SelectionNode,
    SortNode, ValuesNode,
};
pub use plan::{
    AggregateSpec, CompareOp, Connector, JoinPredicate, Operator, Plan, Predicate, RESULT_KEY,
};
pub use runner::execute;
