use crate::domain::{Container, Image, ImageRuntime};
use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::RwLock;

/// In-memory image store that behaves like podman for the operations the
/// cleaner uses, recording every call.
///
/// Removal follows `podman rmi --no-prune`: the untagged parents of a removed
/// image stay in the store.
#[derive(Debug)]
pub struct MockRuntime {
    images: RwLock<Vec<Image>>,
    containers: RwLock<Vec<Container>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<Option<String>>,
    failing_inspections: RwLock<HashSet<String>>,
    failing_removals: RwLock<HashSet<String>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(Vec::new()),
            containers: RwLock::new(Vec::new()),
            commands: RwLock::new(Vec::new()),
            fail_on: RwLock::new(None),
            failing_inspections: RwLock::new(HashSet::new()),
            failing_removals: RwLock::new(HashSet::new()),
        }
    }

    pub fn add_image(&self, image: Image) {
        self.images.write().unwrap().push(image);
    }

    pub fn add_container(&self, container: Container) {
        self.containers.write().unwrap().push(container);
    }

    /// Makes every call of `operation` fail (`list_images`, `list_containers`, ...).
    pub fn set_fail_on(&self, operation: &str) {
        *self.fail_on.write().unwrap() = Some(operation.to_string());
    }

    pub fn fail_inspection_of(&self, container_id: &str) {
        self.failing_inspections
            .write()
            .unwrap()
            .insert(container_id.to_string());
    }

    pub fn fail_removal_of(&self, reference: &str) {
        self.failing_removals
            .write()
            .unwrap()
            .insert(reference.to_string());
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    pub fn removals(&self) -> Vec<String> {
        self.get_commands()
            .into_iter()
            .filter_map(|c| c.strip_prefix("remove:").map(str::to_string))
            .collect()
    }

    pub fn image_exists(&self, id: &str) -> bool {
        self.images.read().unwrap().iter().any(|i| i.id == id)
    }

    pub fn image_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .images
            .read()
            .unwrap()
            .iter()
            .map(|i| i.id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str) -> Result<()> {
        if let Some(ref fail_on) = *self.fail_on.read().unwrap() {
            if fail_on == operation {
                bail!("Mock failure on: {}", operation);
            }
        }
        Ok(())
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageRuntime for MockRuntime {
    fn list_images(&self) -> Result<Vec<Image>> {
        self.record_command("list_images");
        self.check_fail("list_images")?;
        Ok(self.images.read().unwrap().clone())
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        self.record_command("list_containers");
        self.check_fail("list_containers")?;
        Ok(self.containers.read().unwrap().clone())
    }

    fn inspect_container_image(&self, container_id: &str) -> Result<String> {
        self.record_command(&format!("inspect:{}", container_id));
        self.check_fail("inspect")?;

        if self.failing_inspections.read().unwrap().contains(container_id) {
            bail!("no such container {}", container_id);
        }

        match self
            .containers
            .read()
            .unwrap()
            .iter()
            .find(|c| c.id == container_id)
        {
            Some(container) => Ok(container.image_id.clone()),
            None => bail!("no such container {}", container_id),
        }
    }

    fn remove_image(&self, reference: &str) -> Result<()> {
        self.record_command(&format!("remove:{}", reference));
        self.check_fail("remove")?;

        if self.failing_removals.read().unwrap().contains(reference) {
            bail!("Mock failure removing {}", reference);
        }

        let mut images = self.images.write().unwrap();
        let Some(pos) = images
            .iter()
            .position(|i| i.id == reference || i.repo_tags.iter().any(|t| t == reference))
        else {
            bail!("{}: image not known", reference);
        };

        let by_tag = images[pos].id != reference;
        if by_tag && images[pos].real_tags().count() > 1 {
            images[pos].repo_tags.retain(|t| t != reference);
            return Ok(());
        }

        let id = images[pos].id.clone();
        if images.iter().any(|i| i.parent_id == id) {
            bail!("image {} has dependent child images", id);
        }
        if self
            .containers
            .read()
            .unwrap()
            .iter()
            .any(|c| c.image_id == id)
        {
            bail!("image {} is in use by a container", id);
        }

        images.remove(pos);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.record_command("is_available");
        true
    }
}
