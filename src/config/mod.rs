// src/config/mod.rs
pub mod ai;
pub mod monitor;

pub use ai::AiConfig;
pub use monitor::{MonitorConfig, PacingSettings, PipelineSettings};
