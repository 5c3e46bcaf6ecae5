pub mod error;
pub mod logger;
pub mod metrics;
pub mod retry;
pub mod similarity;
