use std::cell::RefCell;
use std::fmt;

use crate::autograd::var::Var;
use crate::math::matrix::Matrix;

/// A recorded operation. Operands are tape indices.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Op {
    Leaf,
    Add(usize, usize),
    Sub(usize, usize),
    Mul(usize, usize),
    Div(usize, usize),
    Neg(usize),
    Scale(usize, f64),
    AddScalar(usize, f64),
    MatMul(usize, usize),
    Transpose(usize),
    /// Matrix plus a `1×cols` row broadcast over every row.
    AddRow(usize, usize),
    ConcatCols(usize, usize),
    SliceCols { input: usize, start: usize, end: usize },
    SumRows(usize),
    BroadcastRows { input: usize, rows: usize },
    SumAll(usize),
    BroadcastScalar { input: usize, rows: usize, cols: usize },
    Tanh(usize),
    Sigmoid(usize),
    Relu(usize),
    Exp(usize),
    Ln(usize),
    Sqrt(usize),
    NormCdf(usize),
    NormPdf(usize),
    Minimum(usize, usize),
}

impl Op {
    pub(crate) fn operands(&self) -> [Option<usize>; 2] {
        use Op::*;
        match *self {
            Leaf => [None, None],
            Add(a, b) | Sub(a, b) | Mul(a, b) | Div(a, b) | MatMul(a, b) | AddRow(a, b)
            | ConcatCols(a, b) | Minimum(a, b) => [Some(a), Some(b)],
            Neg(a) | Scale(a, _) | AddScalar(a, _) | Transpose(a) | SumRows(a) | SumAll(a)
            | Tanh(a) | Sigmoid(a) | Relu(a) | Exp(a) | Ln(a) | Sqrt(a) | NormCdf(a)
            | NormPdf(a) => [Some(a), None],
            SliceCols { input, .. }
            | BroadcastRows { input, .. }
            | BroadcastScalar { input, .. } => [Some(input), None],
        }
    }
}

pub(crate) struct Node {
    pub(crate) value: Matrix,
    pub(crate) op: Op,
    /// True when the node is a tracked leaf or depends on one.
    pub(crate) tracked: bool,
}

/// Define-by-run record of matrix operations.
///
/// Every node stays alive until the tape is dropped, so gradients can be
/// requested any number of times and gradients of gradients are possible.
/// The training loop builds one tape per loss evaluation.
pub struct Tape {
    pub(crate) nodes: RefCell<Vec<Node>>,
}

impl Tape {
    pub fn new() -> Tape {
        Tape {
            nodes: RefCell::new(Vec::new()),
        }
    }

    /// Leaf with gradient tracking enabled.
    pub fn var(&self, value: Matrix) -> Var<'_> {
        self.push_node(value, Op::Leaf, true)
    }

    /// Leaf without gradient tracking.
    pub fn constant(&self, value: Matrix) -> Var<'_> {
        self.push_node(value, Op::Leaf, false)
    }

    /// Leaf whose tracking is decided by the caller.
    pub fn leaf(&self, value: Matrix, tracked: bool) -> Var<'_> {
        self.push_node(value, Op::Leaf, tracked)
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    pub(crate) fn push(&self, value: Matrix, op: Op) -> Var<'_> {
        let tracked = {
            let nodes = self.nodes.borrow();
            op.operands()
                .iter()
                .flatten()
                .any(|&i| nodes[i].tracked)
        };
        self.push_node(value, op, tracked)
    }

    fn push_node(&self, value: Matrix, op: Op, tracked: bool) -> Var<'_> {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node { value, op, tracked });
        Var::new(self, nodes.len() - 1)
    }

    pub(crate) fn with_value<R>(&self, index: usize, f: impl FnOnce(&Matrix) -> R) -> R {
        f(&self.nodes.borrow()[index].value)
    }

    pub(crate) fn with_values<R>(
        &self,
        a: usize,
        b: usize,
        f: impl FnOnce(&Matrix, &Matrix) -> R,
    ) -> R {
        let nodes = self.nodes.borrow();
        f(&nodes[a].value, &nodes[b].value)
    }

    pub(crate) fn op(&self, index: usize) -> Op {
        self.nodes.borrow()[index].op
    }

    pub(crate) fn shape(&self, index: usize) -> (usize, usize) {
        self.nodes.borrow()[index].value.shape()
    }

    pub(crate) fn is_tracked(&self, index: usize) -> bool {
        self.nodes.borrow()[index].tracked
    }
}

impl Default for Tape {
    fn default() -> Self {
        Tape::new()
    }
}

impl fmt::Debug for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tape").field("nodes", &self.len()).finish()
    }
}
