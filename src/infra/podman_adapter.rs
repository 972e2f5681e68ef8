use crate::domain::{Container, Image, ImageRuntime};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::process::{Command, Stdio};
use tracing::debug;

pub const DEFAULT_PODMAN_BINARY: &str = "podman";

#[derive(Debug, Clone)]
pub struct PodmanAdapter {
    binary: String,
}

impl PodmanAdapter {
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_PODMAN_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn output<I, S>(&self, args: I, context: &str) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.binary)
            .args(args.into_iter().map(|item| item.as_ref().to_os_string()))
            .stdin(Stdio::null())
            .output()
            .with_context(|| context.to_string())?;

        if !output.status.success() {
            bail!(
                "{} retornou status {:?} ({context}): {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn json<T, I, S>(&self, args: I, context: &str) -> Result<T>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let stdout = self.output(args, context)?;
        parse_json_list(&stdout).with_context(|| format!("parse do JSON ({context})"))
    }
}

impl Default for PodmanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageRuntime for PodmanAdapter {
    fn list_images(&self) -> Result<Vec<Image>> {
        let images: Vec<PodmanImage> = self.json(
            ["images", "--all", "--format", "json"],
            "listando todas as imagens",
        )?;
        Ok(images.into_iter().map(Image::from).collect())
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        let containers: Vec<PodmanContainer> = self.json(
            ["ps", "--all", "--format", "json"],
            "listando containers",
        )?;
        Ok(containers.into_iter().map(Container::from).collect())
    }

    fn inspect_container_image(&self, container_id: &str) -> Result<String> {
        let stdout = self.output(
            ["container", "inspect", "--format", "{{.Image}}", container_id],
            &format!("inspecionando container {container_id}"),
        )?;
        let image_id = stdout.trim();
        if image_id.is_empty() {
            bail!("container {container_id} sem imagem associada");
        }
        Ok(image_id.to_string())
    }

    fn remove_image(&self, reference: &str) -> Result<()> {
        debug!("{} rmi --no-prune {reference}", self.binary);
        self.output(rmi_args(reference), &format!("removendo imagem {reference}"))
            .map(|_| ())
    }

    fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Dangling parents are left alone: the cleaner removes them itself, children
/// first, and a pruned parent would make its own later removal fail.
fn rmi_args(reference: &str) -> [&str; 3] {
    ["rmi", "--no-prune", reference]
}

/// Older podman releases print nothing instead of `[]` for empty listings.
fn parse_json_list<T: DeserializeOwned>(stdout: &str) -> serde_json::Result<T> {
    let trimmed = stdout.trim();
    serde_json::from_str(if trimmed.is_empty() { "[]" } else { trimmed })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PodmanImage {
    #[serde(alias = "ID")]
    id: String,
    #[serde(default, alias = "ParentID")]
    parent_id: Option<String>,
    #[serde(default)]
    repo_tags: Option<Vec<String>>,
    #[serde(default)]
    names: Option<Vec<String>>,
    #[serde(default)]
    repo_digests: Option<Vec<String>>,
    #[serde(default)]
    created: i64,
}

impl From<PodmanImage> for Image {
    fn from(raw: PodmanImage) -> Self {
        // podman reports tags under `Names` and usually leaves `RepoTags` null.
        let tags = match raw.repo_tags {
            Some(tags) if !tags.is_empty() => tags,
            _ => raw.names.unwrap_or_default(),
        };

        Image::new(raw.id, raw.parent_id.unwrap_or_default(), raw.created)
            .with_tags(tags)
            .with_digests(raw.repo_digests.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PodmanContainer {
    #[serde(alias = "ID")]
    id: String,
    #[serde(default, rename = "ImageID")]
    image_id: Option<String>,
}

impl From<PodmanContainer> for Container {
    fn from(raw: PodmanContainer) -> Self {
        Container::new(raw.id, raw.image_id.unwrap_or_default())
    }
}
