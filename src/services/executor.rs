use super::classifier::Disposition;
use crate::domain::{Image, ImageRuntime, short_id};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteCategory {
    Dangling,
    Leaf,
}

impl DeleteCategory {
    pub fn from_disposition(disposition: Disposition) -> Option<Self> {
        match disposition {
            Disposition::Keep => None,
            Disposition::DeleteAsDangling => Some(Self::Dangling),
            Disposition::DeleteAsLeaf => Some(Self::Leaf),
        }
    }
}

impl fmt::Display for DeleteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dangling => f.write_str("dangling"),
            Self::Leaf => f.write_str("leaf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionOutcome {
    pub image_id: String,
    pub category: DeleteCategory,
    /// References passed (or that would be passed) to the runtime.
    pub targets: Vec<String>,
    pub dry_run: bool,
    /// Child image that stays in this pass and keeps this one from being removed.
    pub blocked_by: Option<String>,
    /// `(target, error)` for every reference the runtime refused to remove.
    pub errors: Vec<(String, String)>,
}

impl DeletionOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub outcomes: Vec<DeletionOutcome>,
}

impl DeletionReport {
    pub fn push(&mut self, outcome: DeletionOutcome) {
        self.outcomes.push(outcome);
    }

    /// Ids reported in dry-run mode.
    pub fn planned(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.dry_run)
            .map(|o| o.image_id.as_str())
            .collect()
    }

    /// Ids actually handed to the runtime, successfully or not.
    pub fn attempted(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.dry_run)
            .map(|o| o.image_id.as_str())
            .collect()
    }

    pub fn removed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.dry_run && o.is_success())
            .map(|o| o.image_id.as_str())
            .collect()
    }

    /// Outcomes held back because a child image stays in the store.
    pub fn held(&self) -> Vec<&DeletionOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.blocked_by.is_some())
            .collect()
    }

    pub fn failed(&self) -> Vec<&DeletionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }
}

/// References to pass to the runtime for `image`.
///
/// Every real tag when there are several, so each one gets untagged; the raw id
/// otherwise.
pub fn removal_targets(image: &Image) -> Vec<String> {
    let tags: Vec<&str> = image.real_tags().collect();
    if tags.len() > 1 {
        tags.into_iter().map(str::to_string).collect()
    } else {
        vec![image.id.clone()]
    }
}

pub struct DeletionExecutor {
    runtime: Arc<dyn ImageRuntime>,
}

impl DeletionExecutor {
    pub fn new(runtime: Arc<dyn ImageRuntime>) -> Self {
        Self { runtime }
    }

    /// Removes `image`, or only reports it when `really_delete` is false.
    ///
    /// Never fails: runtime errors are recorded in the outcome.
    pub fn execute(
        &self,
        category: DeleteCategory,
        image: &Image,
        really_delete: bool,
    ) -> DeletionOutcome {
        let targets = removal_targets(image);
        let mut outcome = DeletionOutcome {
            image_id: image.id.clone(),
            category,
            targets: targets.clone(),
            dry_run: !really_delete,
            blocked_by: None,
            errors: Vec::new(),
        };

        if !really_delete {
            info!("Removeria imagem {category} {image}");
            return outcome;
        }

        info!("Removendo imagem {category} {image}");
        for target in targets {
            if let Err(e) = self.runtime.remove_image(&target) {
                error!("Falha ao remover imagem {category} {target}: {e:#}");
                outcome.errors.push((target, format!("{e:#}")));
            }
        }

        outcome
    }

    /// Reports `image` without removing it because `child` is built on top of
    /// it and stays in the store.
    pub fn hold(&self, category: DeleteCategory, image: &Image, child: &str) -> DeletionOutcome {
        info!(
            "Removeria imagem {category} {image}, mas está bloqueada pela imagem filha {}",
            short_id(child)
        );
        DeletionOutcome {
            image_id: image.id.clone(),
            category,
            targets: removal_targets(image),
            dry_run: true,
            blocked_by: Some(child.to_string()),
            errors: Vec::new(),
        }
    }
}
