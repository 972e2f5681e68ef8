use super::{Container, Image};
use anyhow::Result;
use std::fmt::Debug;

/// Trait for the image store operations the cleaner depends on
pub trait ImageRuntime: Send + Sync + Debug {
    /// List every image in the store, intermediate layers included
    fn list_images(&self) -> Result<Vec<Image>>;

    /// List every container, running or stopped
    fn list_containers(&self) -> Result<Vec<Container>>;

    /// Resolve the id of the image a container was created from
    fn inspect_container_image(&self, container_id: &str) -> Result<String>;

    /// Remove one image reference (a tag or a raw id)
    fn remove_image(&self, reference: &str) -> Result<()>;

    /// Check if the runtime binary is reachable
    fn is_available(&self) -> bool;
}
