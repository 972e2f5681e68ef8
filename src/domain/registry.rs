use super::Image;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("imagem {0} não encontrada no inventário")]
    NotFound(String),
}

/// Index of an image inside an [`ImageRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey(usize);

/// Immutable index of every image in one inventory snapshot.
///
/// Images live in a single table; parent links are resolved once into
/// [`ImageKey`]s so ancestry walks never go through the id map again.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: Vec<Image>,
    by_id: HashMap<String, ImageKey>,
    parents: Vec<Option<ImageKey>>,
    has_children: Vec<bool>,
}

impl ImageRegistry {
    pub fn new(images: Vec<Image>) -> Self {
        let mut unique = Vec::with_capacity(images.len());
        let mut by_id = HashMap::with_capacity(images.len());

        for image in images {
            if by_id.contains_key(&image.id) {
                warn!("Imagem duplicada no inventário ignorada: {}", image.id);
                continue;
            }
            by_id.insert(image.id.clone(), ImageKey(unique.len()));
            unique.push(image);
        }

        let parents: Vec<Option<ImageKey>> = unique
            .iter()
            .map(|image| {
                if image.is_orphan() {
                    None
                } else {
                    by_id.get(&image.parent_id).copied()
                }
            })
            .collect();

        let mut has_children = vec![false; unique.len()];
        for parent in parents.iter().flatten() {
            has_children[parent.0] = true;
        }

        Self {
            images: unique,
            by_id,
            parents,
            has_children,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn key(&self, id: &str) -> Option<ImageKey> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Image> {
        self.key(id).map(|key| self.image(key))
    }

    pub fn lookup(&self, id: &str) -> Result<&Image, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn image(&self, key: ImageKey) -> &Image {
        &self.images[key.0]
    }

    /// Parent of `key`, or `None` for roots and parents outside the snapshot.
    pub fn parent(&self, key: ImageKey) -> Option<ImageKey> {
        self.parents[key.0]
    }

    pub fn all(&self) -> impl Iterator<Item = &Image> {
        self.images.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = ImageKey> + '_ {
        (0..self.images.len()).map(ImageKey)
    }

    /// Walks from the parent of `key` towards the root.
    pub fn ancestors(&self, key: ImageKey) -> Ancestors<'_> {
        Ancestors {
            registry: self,
            next: self.parent(key),
            // A well-formed chain never visits more images than the snapshot holds.
            remaining: self.images.len(),
        }
    }

    pub fn depth(&self, key: ImageKey) -> usize {
        self.ancestors(key).count()
    }

    /// True when the image would show up in the top-level image listing:
    /// it carries a name, or nothing in the snapshot is built on top of it.
    pub fn is_leaf(&self, key: ImageKey) -> bool {
        let image = self.image(key);
        !image.is_dangling() || !self.has_children[key.0]
    }
}

pub struct Ancestors<'a> {
    registry: &'a ImageRegistry,
    next: Option<ImageKey>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = ImageKey;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.registry.parent(current);
        Some(current)
    }
}
