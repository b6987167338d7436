//! A minimal file-backed relational query engine.
//!
//! Two tightly coupled subsystems:
//!
//! - [`heap`]: a paged heap-file storage engine. Fixed 4096-byte pages
//!   in a slotted layout, grouped into sections whose first page is a
//!   free-space directory, with lazy full scans and appending inserts
//!   that rewrite only the affected pages.
//! - [`executor`]: a pull-based (Volcano) query executor. Lazy
//!   relational operators (scan, projection, selection, limit, sort,
//!   merge, three join strategies, streaming aggregation) composed by
//!   plans of `(step key, operator chain)` pairs.
//!
//! Tables are described by a small [`catalog`] document and read either
//! from CSV sources or from the heap file. The engine is a synchronous,
//! single-threaded library: pipelines suspend at row boundaries and the
//! only blocking is file I/O inside scans.
//!
//! # Example
//!
//! ```no_run
//! use quern::datum::Value;
//! use quern::executor::{execute, CompareOp, Operator, Predicate, RESULT_KEY};
//!
//! let plan = vec![(
//!     RESULT_KEY.to_string(),
//!     vec![
//!         Operator::scan_csv("person"),
//!         Operator::selection(Predicate::new(CompareOp::Gt, "age", Value::Int(30))),
//!         Operator::sort(["age"]),
//!         Operator::limit(2),
//!     ],
//! )];
//! let rows = execute("./data", plan)?;
//! # Ok::<(), quern::executor::ExecutorError>(())
//! ```

pub mod catalog;
pub mod codec;
pub mod datum;
pub mod executor;
pub mod heap;
pub mod tuple;
