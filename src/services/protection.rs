use crate::domain::{Image, ImageRegistry};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Why an image must be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtectionReason {
    Excluded,
    TooRecent,
    InUse,
    TaggedParent,
    AncestorOfKept,
}

impl fmt::Display for ProtectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excluded => "excluída",
            Self::TooRecent => "recente demais",
            Self::InUse => "em uso por container",
            Self::TaggedParent => "pai com tag",
            Self::AncestorOfKept => "ancestral de imagem mantida",
        };
        f.write_str(label)
    }
}

/// Accumulator of must-keep image ids and the reasons behind each one.
///
/// Only grows: there is no way to unprotect an image within a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectionSet {
    reasons: HashMap<String, BTreeSet<ProtectionReason>>,
}

impl ProtectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `reason` for `id`. Returns true the first time `id` is protected.
    pub fn protect(&mut self, id: &str, reason: ProtectionReason) -> bool {
        match self.reasons.get_mut(id) {
            Some(reasons) => {
                reasons.insert(reason);
                false
            }
            None => {
                self.reasons
                    .insert(id.to_string(), BTreeSet::from([reason]));
                true
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.reasons.contains_key(id)
    }

    pub fn reasons(&self, id: &str) -> Option<&BTreeSet<ProtectionReason>> {
        self.reasons.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.reasons.keys().map(String::as_str)
    }

    pub fn merge(&mut self, other: ProtectionSet) {
        for (id, reasons) in other.reasons {
            self.reasons.entry(id).or_default().extend(reasons);
        }
    }
}

/// A predicate that protects images on its own, independent of ancestry.
pub trait ProtectionRule {
    fn reason(&self) -> ProtectionReason;

    fn protects(&self, image: &Image) -> bool;

    fn evaluate(&self, registry: &ImageRegistry) -> ProtectionSet {
        let mut set = ProtectionSet::new();
        for image in registry.all().filter(|image| self.protects(image)) {
            debug!("Protegendo {image}: {}", self.reason());
            set.protect(&image.id, self.reason());
        }
        set
    }
}

/// Protects images carrying a tag from the user's exclude list.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRule {
    excluded: HashSet<String>,
}

impl ExclusionRule {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: tags.into_iter().map(Into::into).collect(),
        }
    }
}

impl ProtectionRule for ExclusionRule {
    fn reason(&self) -> ProtectionReason {
        ProtectionReason::Excluded
    }

    fn protects(&self, image: &Image) -> bool {
        image.real_tags().any(|tag| self.excluded.contains(tag))
    }
}

/// Protects images created less than `window` before `now`.
#[derive(Debug, Clone, Copy)]
pub struct SafetyWindowRule {
    now: i64,
    window_secs: i64,
}

impl SafetyWindowRule {
    /// `now` is in unix seconds and must be sampled once per run.
    pub fn new(now: i64, window: Duration) -> Self {
        Self {
            now,
            window_secs: i64::try_from(window.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

impl ProtectionRule for SafetyWindowRule {
    fn reason(&self) -> ProtectionReason {
        ProtectionReason::TooRecent
    }

    fn protects(&self, image: &Image) -> bool {
        self.now.saturating_sub(image.created) < self.window_secs
    }
}

/// Protects images a container was created from.
#[derive(Debug, Clone, Default)]
pub struct InUseRule {
    image_ids: HashSet<String>,
}

impl InUseRule {
    pub fn new<I, S>(image_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            image_ids: image_ids.into_iter().map(Into::into).collect(),
        }
    }
}

impl ProtectionRule for InUseRule {
    fn reason(&self) -> ProtectionReason {
        ProtectionReason::InUse
    }

    fn protects(&self, image: &Image) -> bool {
        self.image_ids.contains(&image.id)
    }
}

/// Closes a [`ProtectionSet`] over image ancestry.
pub struct AncestorPropagator<'a> {
    registry: &'a ImageRegistry,
}

impl<'a> AncestorPropagator<'a> {
    pub fn new(registry: &'a ImageRegistry) -> Self {
        Self { registry }
    }

    pub fn propagate(&self, mut set: ProtectionSet) -> ProtectionSet {
        self.protect_tagged_parents(&mut set);
        self.protect_ancestors(&mut set);
        set
    }

    /// Keeps the nearest named ancestor of every leaf image.
    fn protect_tagged_parents(&self, set: &mut ProtectionSet) {
        for leaf in self.registry.keys().filter(|&key| self.registry.is_leaf(key)) {
            let tagged = self
                .registry
                .ancestors(leaf)
                .map(|key| self.registry.image(key))
                .find(|image| !image.is_dangling());

            if let Some(parent) = tagged {
                if set.protect(&parent.id, ProtectionReason::TaggedParent) {
                    debug!("Mantendo pai com tag {parent}");
                }
            }
        }
    }

    fn protect_ancestors(&self, set: &mut ProtectionSet) {
        let seeds: Vec<String> = set.ids().map(str::to_string).collect();

        for seed in seeds {
            let Some(key) = self.registry.key(&seed) else {
                continue;
            };

            for ancestor in self.registry.ancestors(key) {
                let image = self.registry.image(ancestor);
                // An already protected ancestor is either a seed or was reached
                // by an earlier walk; its own chain is covered either way.
                if !set.protect(&image.id, ProtectionReason::AncestorOfKept) {
                    break;
                }
                debug!("Mantendo ancestral {image} de {}", crate::domain::short_id(&seed));
            }
        }
    }
}
