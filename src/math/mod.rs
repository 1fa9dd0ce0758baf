pub mod matrix;
pub mod normal;

pub use matrix::Matrix;
