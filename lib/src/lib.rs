pub mod amdahl;
pub mod core;
pub mod dag_creator;
pub mod error;
pub mod graph_extension;
pub mod homogeneous;
pub mod level_analyzer;
pub mod output_log;
pub mod simulator;
pub mod util;
