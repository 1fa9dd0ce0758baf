//! The Black-Scholes differential operator applied to an approximator.

pub mod operator;

pub use operator::{delta, partials, pde_residual, Partials};
