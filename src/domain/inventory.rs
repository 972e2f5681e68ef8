use super::{Container, ImageRegistry};
use std::collections::HashSet;

/// Point-in-time view of the image store taken at the start of a run.
#[derive(Debug, Default)]
pub struct Inventory {
    pub registry: ImageRegistry,
    /// Containers with their resolved image ids.
    pub containers: Vec<Container>,
}

impl Inventory {
    pub fn new(registry: ImageRegistry, containers: Vec<Container>) -> Self {
        Self {
            registry,
            containers,
        }
    }

    pub fn container_image_ids(&self) -> HashSet<&str> {
        self.containers
            .iter()
            .map(|c| c.image_id.as_str())
            .filter(|id| !id.is_empty())
            .collect()
    }
}
