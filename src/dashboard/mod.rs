//! Box-plot dashboard over a price log.

pub mod boxplot;
pub mod render;
pub mod server;

pub use server::{Dashboard, serve};
