// =============================================================================
// Second-order regression tree (one boosting step for one class)
// =============================================================================
//
// Fitted on per-row gradients g and hessians h:
//
//   leaf weight  w    = -G / (H + lambda)
//   split gain        = 1/2 * [ GL^2/(HL+lambda) + GR^2/(HR+lambda) - G^2/(H+lambda) ]
//
// Exact greedy search over every distinct value of every candidate feature.
// A split is only taken when both children carry at least
// `min_child_weight` hessian mass and the gain is positive.  Rows with
// x[feature] <= threshold go left.
// =============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub lambda: f64,
    /// Multiplies every leaf weight (learning rate).
    pub shrinkage: f64,
}

/// Gradient statistics of one training problem.
pub struct GradientSet<'a> {
    pub x: &'a [Vec<f64>],
    pub grad: &'a [f64],
    pub hess: &'a [f64],
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub root: Node,
}

impl RegressionTree {
    /// Fit on the rows in `rows`, searching splits over `features` only.
    /// Split gains are added to `importance[feature]`.
    pub fn fit(
        data: &GradientSet<'_>,
        rows: Vec<usize>,
        features: &[usize],
        params: &TreeParams,
        importance: &mut [f64],
    ) -> Self {
        let root = build(data, rows, features, params, 0, importance);
        Self { root }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        fn count(n: &Node) -> usize {
            match n {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => count(left) + count(right),
            }
        }
        count(&self.root)
    }

    pub fn depth(&self) -> usize {
        fn depth(n: &Node) -> usize {
            match n {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

fn build(
    data: &GradientSet<'_>,
    rows: Vec<usize>,
    features: &[usize],
    params: &TreeParams,
    depth: usize,
    importance: &mut [f64],
) -> Node {
    let g_sum: f64 = rows.iter().map(|&r| data.grad[r]).sum();
    let h_sum: f64 = rows.iter().map(|&r| data.hess[r]).sum();
    let leaf = Node::Leaf {
        weight: -g_sum / (h_sum + params.lambda) * params.shrinkage,
    };

    if depth >= params.max_depth || rows.len() < 2 {
        return leaf;
    }

    let parent = score(g_sum, h_sum, params.lambda);
    let mut best: Option<BestSplit> = None;
    let mut sorted = rows.clone();

    for &f in features {
        sorted.sort_by(|&a, &b| data.x[a][f].total_cmp(&data.x[b][f]));
        let (mut gl, mut hl) = (0.0, 0.0);
        for i in 0..sorted.len() - 1 {
            let r = sorted[i];
            gl += data.grad[r];
            hl += data.hess[r];
            let here = data.x[r][f];
            if here == data.x[sorted[i + 1]][f] {
                continue;
            }
            let (gr, hr) = (g_sum - gl, h_sum - hl);
            if hl < params.min_child_weight || hr < params.min_child_weight {
                continue;
            }
            let gain = 0.5 * (score(gl, hl, params.lambda) + score(gr, hr, params.lambda) - parent);
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(BestSplit {
                    feature: f,
                    threshold: here,
                    gain,
                });
            }
        }
    }

    let Some(split) = best else {
        return leaf;
    };
    importance[split.feature] += split.gain;

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .into_iter()
        .partition(|&r| data.x[r][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build(data, left_rows, features, params, depth + 1, importance)),
        right: Box::new(build(data, right_rows, features, params, depth + 1, importance)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(depth: usize) -> TreeParams {
        TreeParams {
            max_depth: depth,
            min_child_weight: 0.0,
            lambda: 0.0,
            shrinkage: 1.0,
        }
    }

    #[test]
    fn splits_on_informative_feature() {
        // Feature 1 separates the gradients perfectly; feature 0 is noise.
        let x = vec![vec![0.3, 1.0], vec![0.1, 2.0], vec![0.2, 8.0], vec![0.4, 9.0]];
        let grad = vec![1.0, 1.0, -1.0, -1.0];
        let hess = vec![1.0; 4];
        let data = GradientSet { x: &x, grad: &grad, hess: &hess };
        let mut imp = vec![0.0; 2];
        let tree = RegressionTree::fit(&data, (0..4).collect(), &[0, 1], &params(1), &mut imp);

        match &tree.root {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 1);
                assert_eq!(*threshold, 2.0);
            }
            Node::Leaf { .. } => panic!("expected a split"),
        }
        assert!((tree.predict(&[0.0, 1.5]) + 1.0).abs() < 1e-12);
        assert!((tree.predict(&[0.0, 9.0]) - 1.0).abs() < 1e-12);
        assert!(imp[1] > 0.0 && imp[0] == 0.0);
    }

    #[test]
    fn depth_zero_is_a_single_newton_leaf() {
        let x = vec![vec![1.0], vec![2.0]];
        let grad = vec![0.5, 0.3];
        let hess = vec![0.25, 0.25];
        let data = GradientSet { x: &x, grad: &grad, hess: &hess };
        let p = TreeParams { lambda: 1.0, shrinkage: 0.1, ..params(0) };
        let tree = RegressionTree::fit(&data, vec![0, 1], &[0], &p, &mut [0.0]);
        assert_eq!(tree.n_leaves(), 1);
        // -0.8 / (0.5 + 1) * 0.1
        assert!((tree.predict(&[5.0]) + 0.8 / 1.5 * 0.1).abs() < 1e-12);
    }

    #[test]
    fn min_child_weight_blocks_small_children() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let grad = vec![5.0, -1.0, -1.0];
        let hess = vec![1.0; 3];
        let data = GradientSet { x: &x, grad: &grad, hess: &hess };
        let p = TreeParams { min_child_weight: 2.0, ..params(3) };
        let tree = RegressionTree::fit(&data, vec![0, 1, 2], &[0], &p, &mut [0.0]);
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn constant_feature_never_splits() {
        let x = vec![vec![7.0]; 6];
        let grad = vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let hess = vec![1.0; 6];
        let data = GradientSet { x: &x, grad: &grad, hess: &hess };
        let tree = RegressionTree::fit(&data, (0..6).collect(), &[0], &params(4), &mut [0.0]);
        assert_eq!(tree.depth(), 0);
    }
}
