use anyhow::Result;
use podsweep::domain::{Container, Image, RetentionPolicy};
use podsweep::services::{CleanOptions, Cleaner, Disposition};
use podsweep::test_support::MockRuntime;
use std::sync::Arc;
use std::time::Duration;

const NOW: i64 = 1_700_000_000;

fn delete_everything() -> CleanOptions {
    CleanOptions {
        policy: RetentionPolicy {
            exclude: vec![],
            safety_duration: Duration::ZERO,
        },
        delete_dangling: true,
        delete_leaf: true,
    }
}

#[test]
fn test_inventory_failure_aborts_before_any_removal() {
    for operation in ["list_images", "list_containers"] {
        let mock = Arc::new(MockRuntime::new());
        mock.add_image(Image::new("loose", "", 0));
        mock.set_fail_on(operation);

        let result = Cleaner::new(mock.clone()).run_at(&delete_everything(), NOW);

        assert!(result.is_err(), "falha em {operation} deveria abortar");
        assert!(mock.removals().is_empty());
        assert!(mock.image_exists("loose"));
    }
}

#[test]
fn test_removal_failure_does_not_stop_the_rest() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());
    mock.add_image(Image::new("a", "", 0));
    mock.add_image(Image::new("b", "", 0));
    mock.add_image(Image::new("c", "", 0).with_tags(["c:1"]));
    mock.fail_removal_of("b");

    let report = Cleaner::new(mock.clone()).run_at(&delete_everything(), NOW)?;

    assert_eq!(report.deletions.attempted(), vec!["a", "b", "c"]);
    assert_eq!(report.deletions.removed(), vec!["a", "c"]);

    let failed = report.deletions.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].image_id, "b");
    assert!(mock.image_exists("b"));

    Ok(())
}

#[test]
fn test_inspection_failure_falls_back_to_listing() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());
    mock.add_image(Image::new("base", "", 0));
    mock.add_image(Image::new("app", "base", 0).with_tags(["app:v1"]));
    mock.add_container(Container::new("web", "app"));
    mock.fail_inspection_of("web");

    let cleaner = Cleaner::new(mock.clone());
    let report = cleaner.run_at(&delete_everything(), NOW)?;

    assert!(report.deletions.outcomes.is_empty());
    assert_eq!(report.summary.kept, 2);
    assert!(mock.removals().is_empty());

    Ok(())
}

#[test]
fn test_uninspectable_container_without_image_is_skipped() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());
    mock.add_image(Image::new("kept", "", 0));
    mock.add_image(Image::new("loose", "", 0));
    mock.add_container(Container::new("ok", "kept"));
    mock.add_container(Container::new("broken", ""));
    mock.fail_inspection_of("broken");

    let cleaner = Cleaner::new(mock.clone());
    let inventory = cleaner.snapshot()?;
    let classification = cleaner.plan(&inventory, &delete_everything(), NOW);

    assert_eq!(inventory.containers, vec![Container::new("ok", "kept")]);
    assert_eq!(classification.disposition("kept"), Some(Disposition::Keep));
    assert_eq!(
        classification.disposition("loose"),
        Some(Disposition::DeleteAsDangling)
    );

    Ok(())
}

#[test]
fn test_parent_outside_snapshot_is_not_an_error() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());
    mock.add_image(Image::new("child", "sha256:missing", 0).with_tags(["app:v1"]));
    mock.add_container(Container::new("c", "child"));

    let report = Cleaner::new(mock.clone()).run_at(&delete_everything(), NOW)?;

    assert_eq!(report.summary.kept, 1);
    assert!(report.deletions.outcomes.is_empty());

    Ok(())
}

#[test]
fn test_empty_store() -> Result<()> {
    let mock = Arc::new(MockRuntime::new());

    let report = Cleaner::new(mock).run_at(&delete_everything(), NOW)?;

    assert_eq!(report.summary.kept, 0);
    assert!(report.deletions.outcomes.is_empty());

    Ok(())
}
