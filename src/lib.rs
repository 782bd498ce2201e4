// Cleaning, validation, feature derivation and aggregation for the NYC 311
// service-request export.

pub mod config;
pub mod error;
pub mod features;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod reports;
pub mod types;
pub mod util;
pub mod validate;

pub use config::PipelineConfig;
pub use error::PipelineError;
