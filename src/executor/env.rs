//! The result environment shared across a plan's steps.
//!
//! Every evaluated chain binds its node under its step key; joins and
//! merges remove the referenced node when they attach it as a child.
//! Bindings are single-use because nodes are single-pass iterators: a
//! second reference to a consumed step is a `MissingStep` error, not a
//! silent rescan.
//!
//! The reserved `__result__` binding is an explicit slot rather than a
//! map entry; all other keys live in the side map.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::error::ExecutorError;
use super::node::ExecutorNode;
use super::plan::RESULT_KEY;

/// Step-key to node bindings plus the data directory scans resolve
/// their table files against.
pub struct Environment {
    data_dir: PathBuf,
    result: Option<ExecutorNode>,
    steps: HashMap<String, ExecutorNode>,
}

impl Environment {
    /// Creates an empty environment rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            result: None,
            steps: HashMap::new(),
        }
    }

    /// Directory containing the table files.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Removes and returns the current `__result__` node, if any.
    pub fn take_result(&mut self) -> Option<ExecutorNode> {
        self.result.take()
    }

    /// Removes and returns the node bound under `key`.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::MissingStep` if the key was never bound
    /// or its node was already consumed.
    pub fn take_step(&mut self, key: &str) -> Result<ExecutorNode, ExecutorError> {
        let node = if key == RESULT_KEY {
            self.result.take()
        } else {
            self.steps.remove(key)
        };
        node.ok_or_else(|| ExecutorError::MissingStep(key.to_string()))
    }

    /// Binds `node` under `key`, replacing any previous binding.
    pub fn bind(&mut self, key: &str, node: ExecutorNode) {
        if key == RESULT_KEY {
            self.result = Some(node);
        } else {
            self.steps.insert(key.to_string(), node);
        }
    }
}
