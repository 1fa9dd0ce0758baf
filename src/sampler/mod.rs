pub mod batch;
pub mod domain;
pub mod noise;

pub use batch::{BatchKind, SampleBatch};
pub use domain::{
    boundary_call_batch, boundary_put_batch, collocation_batch, evaluation_grid,
    terminal_call_batch, terminal_put_batch,
};
pub use noise::LabelNoise;
