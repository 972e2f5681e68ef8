pub mod cli;
pub mod domain;
pub mod infra;
pub mod services;

// Make test_support available for integration tests
pub mod test_support;

pub use domain::{Container, Image, ImageRegistry, ImageRuntime, Inventory, RetentionPolicy};
pub use infra::PodmanAdapter;
pub use services::{CleanOptions, Cleaner, Disposition, classify};
