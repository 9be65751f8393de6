pub mod cli;
pub mod dashboard;
pub mod detector;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod notifier;
pub mod pipeline;
pub mod statistics;
pub mod store;

pub use error::{FuelError, Result};
