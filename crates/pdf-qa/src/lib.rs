pub mod config;
pub mod document;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use config::Settings;
pub use pipeline::{PipelineDriver, PipelineReport};
pub use utils::error::PipelineError;
