pub mod loop_fn;
pub mod strategy;
pub mod train_config;

pub use loop_fn::train_loop;
pub use strategy::{AmericanPutPinn, EuropeanPinn, OptionStyle, PinnCore, PinnStrategy, Strategy};
pub use train_config::TrainConfig;
