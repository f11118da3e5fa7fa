pub mod details;
pub mod evaluator;
pub mod log_builder;
pub mod matcher;
