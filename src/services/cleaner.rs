use super::classifier::{Classification, ClassificationSummary, classify};
use super::executor::{DeleteCategory, DeletionExecutor, DeletionReport};
use crate::domain::{Container, ImageRegistry, ImageRuntime, Inventory, RetentionPolicy};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Everything one cleaning pass needs besides the inventory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanOptions {
    pub policy: RetentionPolicy,
    pub delete_dangling: bool,
    pub delete_leaf: bool,
}

impl CleanOptions {
    pub fn really_delete(&self, category: DeleteCategory) -> bool {
        match category {
            DeleteCategory::Dangling => self.delete_dangling,
            DeleteCategory::Leaf => self.delete_leaf,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub summary: ClassificationSummary,
    pub deletions: DeletionReport,
}

/// Current time in whole unix seconds.
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Runs fetch, classify and delete against an image runtime
pub struct Cleaner {
    runtime: Arc<dyn ImageRuntime>,
    executor: DeletionExecutor,
}

impl Cleaner {
    pub fn new(runtime: Arc<dyn ImageRuntime>) -> Self {
        let executor = DeletionExecutor::new(runtime.clone());
        Self { runtime, executor }
    }

    /// Takes the inventory snapshot. Listing failures abort the run.
    pub fn snapshot(&self) -> Result<Inventory> {
        let images = self.runtime.list_images().context("listando imagens")?;
        let registry = ImageRegistry::new(images);

        let listed = self
            .runtime
            .list_containers()
            .context("listando containers")?;

        let mut containers = Vec::with_capacity(listed.len());
        for container in listed {
            match self.runtime.inspect_container_image(&container.id) {
                Ok(image_id) => containers.push(Container::new(container.id, image_id)),
                Err(e) if !container.image_id.is_empty() => {
                    warn!(
                        "Falha ao inspecionar container {}: {e:#}. Usando imagem {} da listagem",
                        container.id, container.image_id
                    );
                    containers.push(container);
                }
                Err(e) => {
                    error!(
                        "Falha ao inspecionar container {}: {e:#}. Container ignorado",
                        container.id
                    );
                }
            }
        }

        debug!(
            "Inventário: {} imagens, {} containers",
            registry.len(),
            containers.len()
        );

        Ok(Inventory::new(registry, containers))
    }

    pub fn plan<'a>(
        &self,
        inventory: &'a Inventory,
        options: &CleanOptions,
        now: i64,
    ) -> Classification<'a> {
        classify(inventory, &options.policy, now)
    }

    /// Acts on a classification. Removal failures are collected, not raised.
    ///
    /// An image is only handed to the runtime when every child built on it is
    /// removed in the same pass; otherwise it is reported as held by that child.
    pub fn apply(
        &self,
        classification: &Classification<'_>,
        options: &CleanOptions,
    ) -> DeletionReport {
        let mut report = DeletionReport::default();
        // parent id -> a child of it that stays in the store
        let mut held: HashMap<&str, &str> = HashMap::new();

        // Verdicts come children first, so `held` is complete for an image
        // by the time its own verdict is reached.
        for verdict in classification.verdicts() {
            let image = verdict.image;
            let stays = match DeleteCategory::from_disposition(verdict.disposition) {
                None => {
                    info!("Mantendo imagem {image}: {}", verdict.reason());
                    true
                }
                Some(category) => {
                    let outcome = match held.get(image.id.as_str()) {
                        Some(child) if options.really_delete(category) => {
                            self.executor.hold(category, image, child)
                        }
                        _ => self.executor.execute(
                            category,
                            image,
                            options.really_delete(category),
                        ),
                    };
                    let stays = outcome.dry_run || !outcome.is_success();
                    report.push(outcome);
                    stays
                }
            };

            if stays && !image.is_orphan() {
                held.entry(image.parent_id.as_str()).or_insert(image.id.as_str());
            }
        }

        report
    }

    /// One full pass: snapshot, classify, delete.
    pub fn run(&self, options: &CleanOptions) -> Result<RunReport> {
        self.run_at(options, now_unix())
    }

    pub fn run_at(&self, options: &CleanOptions, now: i64) -> Result<RunReport> {
        info!("Analisando imagens...");

        let inventory = self.snapshot()?;
        let classification = self.plan(&inventory, options, now);
        let summary = classification.summary();

        info!(
            "{} imagens: {} mantidas, {} dangling, {} leaf",
            inventory.registry.len(),
            summary.kept,
            summary.dangling,
            summary.leaf
        );

        let deletions = self.apply(&classification, options);

        let failed = deletions.failed().len();
        if failed > 0 {
            warn!("{failed} imagem(ns) não puderam ser removidas");
        }

        Ok(RunReport { summary, deletions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Image;
    use crate::test_support::MockRuntime;

    fn create_test_cleaner() -> (Cleaner, Arc<MockRuntime>) {
        let mock = Arc::new(MockRuntime::new());
        let cleaner = Cleaner::new(mock.clone());
        (cleaner, mock)
    }

    #[test]
    fn test_snapshot_fails_when_listing_fails() {
        let (cleaner, mock) = create_test_cleaner();
        mock.set_fail_on("list_images");

        assert!(cleaner.snapshot().is_err());
    }

    #[test]
    fn test_snapshot_falls_back_to_listed_image() {
        let (cleaner, mock) = create_test_cleaner();
        mock.add_image(Image::new("img", "", 0));
        mock.add_container(Container::new("c1", "img"));
        mock.fail_inspection_of("c1");

        let inventory = cleaner.snapshot().unwrap();

        assert_eq!(inventory.containers, vec![Container::new("c1", "img")]);
    }

    #[test]
    fn test_snapshot_skips_unknown_container() {
        let (cleaner, mock) = create_test_cleaner();
        mock.add_container(Container::new("c1", ""));
        mock.fail_inspection_of("c1");

        let inventory = cleaner.snapshot().unwrap();

        assert!(inventory.containers.is_empty());
    }

    #[test]
    fn test_really_delete_toggles_are_independent() {
        let options = CleanOptions {
            delete_dangling: true,
            ..CleanOptions::default()
        };

        assert!(options.really_delete(DeleteCategory::Dangling));
        assert!(!options.really_delete(DeleteCategory::Leaf));
    }

    #[test]
    fn test_dangling_only_run_holds_layer_under_kept_leaf() {
        let (cleaner, mock) = create_test_cleaner();
        mock.add_image(Image::new("layer", "", 0));
        mock.add_image(Image::new("app", "layer", 0).with_tags(["app:v1"]));

        let options = CleanOptions {
            policy: RetentionPolicy {
                exclude: vec![],
                safety_duration: std::time::Duration::ZERO,
            },
            delete_dangling: true,
            delete_leaf: false,
        };
        let report = cleaner.run_at(&options, 1_000_000).unwrap();

        assert_eq!(report.deletions.planned(), vec!["app", "layer"]);
        assert!(report.deletions.attempted().is_empty());
        assert!(report.deletions.failed().is_empty());
        assert_eq!(
            report.deletions.outcomes[1].blocked_by.as_deref(),
            Some("app")
        );
        assert!(mock.removals().is_empty());
        assert!(mock.image_exists("layer"));
    }

    #[test]
    fn test_failed_child_removal_holds_parent() {
        let (cleaner, mock) = create_test_cleaner();
        mock.add_image(Image::new("layer", "", 0));
        mock.add_image(Image::new("app", "layer", 0).with_tags(["app:v1"]));
        mock.fail_removal_of("app");

        let options = CleanOptions {
            policy: RetentionPolicy {
                exclude: vec![],
                safety_duration: std::time::Duration::ZERO,
            },
            delete_dangling: true,
            delete_leaf: true,
        };
        let report = cleaner.run_at(&options, 1_000_000).unwrap();

        assert_eq!(report.deletions.attempted(), vec!["app"]);
        assert_eq!(report.deletions.planned(), vec!["layer"]);
        assert_eq!(mock.removals(), vec!["app"]);
    }

    #[test]
    fn test_run_deletes_only_enabled_category() {
        let (cleaner, mock) = create_test_cleaner();
        mock.add_image(Image::new("loose", "", 0));
        mock.add_image(Image::new("named", "", 0).with_tags(["app:v1"]));

        let options = CleanOptions {
            policy: RetentionPolicy::default(),
            delete_dangling: true,
            delete_leaf: false,
        };
        let report = cleaner.run_at(&options, 1_000_000).unwrap();

        assert_eq!(report.deletions.removed(), vec!["loose"]);
        assert_eq!(report.deletions.planned(), vec!["named"]);
        assert!(!mock.image_exists("loose"));
        assert!(mock.image_exists("named"));
    }
}
