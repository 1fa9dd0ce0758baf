pub mod dense;

pub use dense::{BoundLayer, Layer};
