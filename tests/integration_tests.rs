use podsweep::domain::{Container, Image, ImageRegistry, Inventory, RetentionPolicy};
use podsweep::services::{Disposition, ProtectionReason, classify, protection_set};
use std::time::Duration;

const NOW: i64 = 1_700_000_000;
const HOUR: i64 = 3600;

fn policy(exclude: &[&str], window: Duration) -> RetentionPolicy {
    RetentionPolicy {
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
        safety_duration: window,
    }
}

fn inventory(images: Vec<Image>, containers: Vec<Container>) -> Inventory {
    Inventory::new(ImageRegistry::new(images), containers)
}

/// leaf1 (app:v1) on top of an untagged root base1.
fn scenario_a_images() -> Vec<Image> {
    vec![
        Image::new("leaf1", "base1", NOW - 2 * HOUR).with_tags(["app:v1"]),
        Image::new("base1", "", NOW - 3 * HOUR),
    ]
}

/// A mixed store: two lineages, a stray layer with a parent outside the
/// snapshot and a pulled image known only by digest.
fn mixed_store() -> Vec<Image> {
    vec![
        Image::new("os", "", NOW - 100 * HOUR).with_tags(["fedora:40"]),
        Image::new("os-l1", "os", NOW - 50 * HOUR),
        Image::new("runtime", "os-l1", NOW - 40 * HOUR).with_tags(["runtime:1"]),
        Image::new("app-l1", "runtime", NOW - 10 * HOUR),
        Image::new("app", "app-l1", NOW - 9 * HOUR).with_tags(["app:v1", "app:latest"]),
        Image::new("app-old", "app-l1", NOW - 20 * HOUR).with_tags(["app:v0"]),
        Image::new("scratch", "", NOW - 30 * HOUR),
        Image::new("scratch-l1", "scratch", NOW - 29 * HOUR),
        Image::new("orphan-layer", "gone", NOW - 70 * HOUR),
        Image::new("pulled", "", NOW - 80 * HOUR).with_digests(["quay.io/x@sha256:abc"]),
        Image::new("fresh", "scratch", NOW - 60),
    ]
}

#[test]
fn test_scenario_a_unused_images_are_deleted() {
    let inventory = inventory(scenario_a_images(), vec![]);

    let classification = classify(&inventory, &policy(&[], Duration::ZERO), NOW);

    assert_eq!(
        classification.disposition("base1"),
        Some(Disposition::DeleteAsDangling)
    );
    assert_eq!(
        classification.disposition("leaf1"),
        Some(Disposition::DeleteAsLeaf)
    );
}

#[test]
fn test_scenario_b_container_keeps_lineage() {
    let inventory = inventory(scenario_a_images(), vec![Container::new("c1", "leaf1")]);

    let classification = classify(&inventory, &policy(&[], Duration::ZERO), NOW);

    assert_eq!(classification.disposition("leaf1"), Some(Disposition::Keep));
    assert_eq!(classification.disposition("base1"), Some(Disposition::Keep));
    assert!(
        classification
            .verdict("leaf1")
            .unwrap()
            .reasons
            .contains(&ProtectionReason::InUse)
    );
    assert!(
        classification
            .verdict("base1")
            .unwrap()
            .reasons
            .contains(&ProtectionReason::AncestorOfKept)
    );
}

#[test]
fn test_scenario_c_excluded_tag_is_kept() {
    let inventory = inventory(
        vec![Image::new("tmp", "", NOW - 10 * HOUR).with_tags(["build:tmp"])],
        vec![],
    );

    let classification = classify(&inventory, &policy(&["build:tmp"], Duration::ZERO), NOW);
    let verdict = classification.verdict("tmp").unwrap();

    assert_eq!(verdict.disposition, Disposition::Keep);
    assert_eq!(verdict.reasons, vec![ProtectionReason::Excluded]);
    assert_eq!(verdict.reason(), "excluída");
}

#[test]
fn test_scenario_d_safety_window_expires() {
    let created = NOW - 5 * 60;
    let inventory = inventory(vec![Image::new("dangling", "", created)], vec![]);
    let policy = policy(&[], Duration::from_secs(3600));

    let now = classify(&inventory, &policy, NOW);
    assert_eq!(now.disposition("dangling"), Some(Disposition::Keep));

    let later = classify(&inventory, &policy, created + HOUR + 1);
    assert_eq!(
        later.disposition("dangling"),
        Some(Disposition::DeleteAsDangling)
    );
}

#[test]
fn test_protection_set_is_closed_under_ancestry() {
    let inventory = inventory(
        mixed_store(),
        vec![
            Container::new("c1", "app-old"),
            Container::new("c2", "scratch-l1"),
        ],
    );
    let registry = &inventory.registry;

    let policy = policy(&["app:latest"], Duration::from_secs(3600));

    let protected = protection_set(&inventory, &policy, NOW);

    for id in protected.ids() {
        let key = registry.key(id).unwrap();
        for ancestor in registry.ancestors(key) {
            let ancestor_id = &registry.image(ancestor).id;
            assert!(
                protected.contains(ancestor_id),
                "{ancestor_id} é ancestral de {id} e deveria estar protegida"
            );
        }
    }
}

#[test]
fn test_dangling_verdicts_have_no_names() {
    let inventory = inventory(mixed_store(), vec![]);

    let classification = classify(&inventory, &policy(&[], Duration::ZERO), NOW);

    let dangling: Vec<_> = classification
        .verdicts()
        .iter()
        .filter(|v| v.disposition == Disposition::DeleteAsDangling)
        .collect();
    assert!(!dangling.is_empty());
    for verdict in dangling {
        assert!(!verdict.image.has_tags(), "{}", verdict.image);
        assert!(!verdict.image.has_digests(), "{}", verdict.image);
    }
}

#[test]
fn test_every_container_lineage_is_kept() {
    let containers = vec![
        Container::new("c1", "app"),
        Container::new("c2", "scratch-l1"),
        Container::new("c3", "not-in-store"),
    ];
    let inventory = inventory(mixed_store(), containers);

    let classification = classify(&inventory, &policy(&[], Duration::ZERO), NOW);

    for id in ["app", "app-l1", "runtime", "os-l1", "os", "scratch-l1", "scratch"] {
        assert_eq!(
            classification.disposition(id),
            Some(Disposition::Keep),
            "{id} deveria ser mantida"
        );
    }
    assert_eq!(classification.verdicts().len(), 11);
}

#[test]
fn test_mixed_store_dispositions() {
    let inventory = inventory(mixed_store(), vec![]);

    let classification = classify(&inventory, &policy(&[], Duration::from_secs(3600)), NOW);

    let expected = [
        // nearest named ancestor of app / app-old
        ("runtime", Disposition::Keep),
        ("os-l1", Disposition::Keep),
        // nearest named ancestor of runtime
        ("os", Disposition::Keep),
        ("app", Disposition::DeleteAsLeaf),
        ("app-old", Disposition::DeleteAsLeaf),
        ("app-l1", Disposition::DeleteAsDangling),
        ("pulled", Disposition::DeleteAsLeaf),
        ("orphan-layer", Disposition::DeleteAsDangling),
        // too recent, and its parent with it
        ("fresh", Disposition::Keep),
        ("scratch", Disposition::Keep),
        ("scratch-l1", Disposition::DeleteAsDangling),
    ];

    for (id, disposition) in expected {
        assert_eq!(
            classification.disposition(id),
            Some(disposition),
            "disposição de {id}"
        );
    }
}

#[test]
fn test_classification_is_idempotent() {
    let inventory = inventory(mixed_store(), vec![Container::new("c1", "app-old")]);
    let policy = policy(&["runtime:1"], Duration::from_secs(3600));

    let first = classify(&inventory, &policy, NOW);
    let second = classify(&inventory, &policy, NOW);

    assert_eq!(first, second);
}

#[test]
fn test_input_order_does_not_matter() {
    let mut reversed = mixed_store();
    reversed.reverse();
    let forward = inventory(mixed_store(), vec![]);
    let backward = inventory(reversed, vec![]);
    let policy = policy(&[], Duration::from_secs(3600));

    let a = classify(&forward, &policy, NOW);
    let b = classify(&backward, &policy, NOW);

    let ids = |c: &podsweep::services::Classification<'_>| {
        c.verdicts()
            .iter()
            .map(|v| (v.image.id.clone(), v.disposition))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&a), ids(&b));
}
