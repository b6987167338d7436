//! Plan execution.
//!
//! [`execute`] walks a plan's steps in order, composes each operator
//! chain into a node tree, binds it in the environment under its key,
//! and finally materializes the `__result__` chain into named rows.
//!
//! Materialization is the only point that drives the pipeline; every
//! upstream node runs exactly as far as the terminal node pulls it.
//! When this function returns, or bails on an error, the environment
//! and the terminal node are dropped, which closes every file handle
//! opened by any scan, consumed or not.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::datum::Value;

use super::env::Environment;
use super::error::ExecutorError;
use super::node::ExecutorNode;
use super::plan::{Plan, RESULT_KEY};

/// Executes a plan against the table files in `data_dir`.
///
/// Returns the terminal chain's rows as `{column name: value}` maps,
/// keyed by the final column index.
///
/// # Errors
///
/// Static plan problems (unknown columns, an unsupported join
/// predicate, missing steps) surface while the offending chain is
/// built; data-dependent problems surface during materialization.
pub fn execute(
    data_dir: impl AsRef<Path>,
    plan: Plan,
) -> Result<Vec<HashMap<String, Value>>, ExecutorError> {
    let mut env = Environment::new(data_dir.as_ref());

    for (key, chain) in plan {
        debug!(step = %key, operators = chain.len(), "composing chain");
        let mut node: Option<ExecutorNode> = None;
        for (position, op) in chain.into_iter().enumerate() {
            let input = if position == 0 && !op.is_scan() {
                // a chain led by a non-scan operator continues the
                // current result
                Some(env.take_step(RESULT_KEY)?)
            } else {
                node.take()
            };
            node = Some(ExecutorNode::build(op, input, &mut env)?);
        }
        // an empty chain re-binds the current result under a new key
        let node = match node {
            Some(node) => node,
            None => env.take_step(RESULT_KEY)?,
        };
        env.bind(&key, node);
    }

    let mut terminal = env.take_step(RESULT_KEY)?;
    let columns = terminal.columns().clone();
    let mut rows = Vec::new();
    while let Some(row) = terminal.next()? {
        rows.push(
            columns
                .names()
                .iter()
                .cloned()
                .zip(row.values)
                .collect::<HashMap<_, _>>(),
        );
    }
    debug!(rows = rows.len(), "materialized result");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::catalog::Catalog;
    use crate::datum::Type;
    use crate::executor::plan::{CompareOp, Operator, Predicate};
    use crate::heap::write_rows;
    use crate::tuple::Row;

    use std::fs::OpenOptions;
    use tempfile::tempdir;

    fn setup_heap_table(dir: &Path, table: &str, catalog: &Catalog, rows: Vec<Row>) {
        catalog.write(dir, table).unwrap();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(crate::catalog::heap_path(dir, table))
            .unwrap();
        write_rows(&mut file, catalog, rows).unwrap();
    }

    fn setup_csv_table(dir: &Path, table: &str, catalog: &Catalog, body: &str) {
        catalog.write(dir, table).unwrap();
        std::fs::write(crate::catalog::csv_path(dir, table), body).unwrap();
    }

    fn person_catalog() -> Catalog {
        Catalog::new(
            vec!["name".into(), "age".into()],
            vec![Type::String, Type::Int],
        )
        .unwrap()
    }

    #[test]
    fn test_execute_scan_csv() {
        let dir = tempdir().unwrap();
        setup_csv_table(
            dir.path(),
            "person",
            &person_catalog(),
            "name,age\nAna,80\nBob,40\n",
        );

        let rows = execute(
            dir.path(),
            vec![(RESULT_KEY.to_string(), vec![Operator::scan_csv("person")])],
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], Value::String("Ana".into()));
        assert_eq!(rows[0]["age"], Value::Int(80));
    }

    #[test]
    fn test_execute_scan_heap() {
        let dir = tempdir().unwrap();
        let catalog = person_catalog();
        setup_heap_table(
            dir.path(),
            "person",
            &catalog,
            vec![
                Row::new(vec![Value::String("Ana".into()), Value::Int(80)]),
                Row::new(vec![Value::String("Bob".into()), Value::Int(40)]),
            ],
        );

        let rows = execute(
            dir.path(),
            vec![(
                RESULT_KEY.to_string(),
                vec![
                    Operator::scan_heap("person"),
                    Operator::selection(Predicate::new(CompareOp::Lt, "age", Value::Int(50))),
                ],
            )],
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::String("Bob".into()));
    }

    #[test]
    fn test_execute_without_result_binding() {
        let dir = tempdir().unwrap();
        setup_csv_table(
            dir.path(),
            "person",
            &person_catalog(),
            "name,age\nAna,80\n",
        );

        let result = execute(
            dir.path(),
            vec![("people".to_string(), vec![Operator::scan_csv("person")])],
        );
        assert!(matches!(
            result,
            Err(ExecutorError::MissingStep(key)) if key == RESULT_KEY
        ));
    }

    #[test]
    fn test_execute_chain_without_leading_scan_needs_result() {
        let dir = tempdir().unwrap();
        let result = execute(
            dir.path(),
            vec![(RESULT_KEY.to_string(), vec![Operator::limit(1)])],
        );
        assert!(matches!(
            result,
            Err(ExecutorError::MissingStep(key)) if key == RESULT_KEY
        ));
    }

    #[test]
    fn test_execute_rebinds_result_across_steps() {
        let dir = tempdir().unwrap();
        setup_csv_table(
            dir.path(),
            "person",
            &person_catalog(),
            "name,age\nAna,80\nBob,40\nEve,70\n",
        );

        // first chain scans and binds __result__; the second continues
        // it without a scan
        let rows = execute(
            dir.path(),
            vec![
                (RESULT_KEY.to_string(), vec![Operator::scan_csv("person")]),
                (
                    RESULT_KEY.to_string(),
                    vec![Operator::sort(["age"]), Operator::limit(1)],
                ),
            ],
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::String("Bob".into()));
    }

    #[test]
    fn test_execute_missing_table() {
        let dir = tempdir().unwrap();
        let result = execute(
            dir.path(),
            vec![(RESULT_KEY.to_string(), vec![Operator::scan_csv("ghost")])],
        );
        assert!(matches!(result, Err(ExecutorError::Catalog(_))));
    }
}
