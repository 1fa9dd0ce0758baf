//! Reverse-mode automatic differentiation over a define-by-run tape.
//!
//! Gradients are built out of the same recorded operations as the forward
//! pass, which is what lets the PDE operator take second derivatives of a
//! network and then differentiate the resulting residual with respect to the
//! network's parameters.

mod backward;
pub mod tape;
pub mod var;

pub use tape::Tape;
pub use var::Var;
