//! Tree Structure
//!
//! Flat binary tree in the exported array form: node `i` splits on
//! `feature[i]` at `threshold[i]`, `x <= threshold` goes left. A node whose
//! left child is `-1` is a leaf.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub const TREE_LEAF: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeStructure {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
}

/// Where a row landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafHit {
    pub node: usize,
    /// Number of edges walked from the root
    pub depth: usize,
}

impl TreeStructure {
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    /// Structural checks, run once at load so `apply` can index freely.
    ///
    /// `n_inputs` is the width of the row the tree will see.
    pub fn validate(&self, n_inputs: usize) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if self.children_right.len() != n || self.feature.len() != n || self.threshold.len() != n {
            return Err(format!(
                "tree arrays disagree: {} left, {} right, {} feature, {} threshold",
                n,
                self.children_right.len(),
                self.feature.len(),
                self.threshold.len()
            ));
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == TREE_LEAF {
                if right != TREE_LEAF {
                    return Err(format!("node {} has only a right child", i));
                }
                continue;
            }
            // Children always come after their parent in the exported order,
            // which also rules out cycles
            for child in [left, right] {
                if child <= i as i64 || child >= n as i64 {
                    return Err(format!("node {} has invalid child {}", i, child));
                }
            }
            let feature = self.feature[i];
            if feature < 0 || feature >= n_inputs as i64 {
                return Err(format!("node {} splits on invalid feature {}", i, feature));
            }
            if self.threshold[i].is_nan() {
                return Err(format!("node {} has NaN threshold", i));
            }
        }

        Ok(())
    }

    /// Walk a row down to its leaf. Assumes `validate` passed.
    pub fn apply(&self, row: &Array1<f64>) -> LeafHit {
        let mut node = 0usize;
        let mut depth = 0usize;

        while self.children_left[node] != TREE_LEAF {
            let value = row[self.feature[node] as usize];
            node = if value <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
            depth += 1;
        }

        LeafHit { node, depth }
    }
}
