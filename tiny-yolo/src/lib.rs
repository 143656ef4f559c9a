//! Target assignment, loss and data preparation for the tiny two-scale YOLO detector.

mod common;
pub mod config;
pub mod dataset;
pub mod loss;
pub mod processor;

pub use config::Config;
