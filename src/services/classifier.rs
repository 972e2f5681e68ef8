use super::protection::{
    AncestorPropagator, ExclusionRule, InUseRule, ProtectionReason, ProtectionRule,
    ProtectionSet, SafetyWindowRule,
};
use crate::domain::{Image, Inventory, RetentionPolicy};
use std::cmp::Reverse;

/// Final decision for one image in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    Keep,
    DeleteAsDangling,
    DeleteAsLeaf,
}

impl Disposition {
    pub fn is_delete(&self) -> bool {
        !matches!(self, Self::Keep)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict<'a> {
    pub image: &'a Image,
    pub disposition: Disposition,
    /// Empty unless the disposition is [`Disposition::Keep`].
    pub reasons: Vec<ProtectionReason>,
}

impl Verdict<'_> {
    /// Human readable explanation suitable for a log line.
    pub fn reason(&self) -> String {
        match self.disposition {
            Disposition::Keep => self
                .reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            Disposition::DeleteAsDangling => "imagem sem tag nem digest".to_string(),
            Disposition::DeleteAsLeaf => "imagem com tag sem uso".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub kept: usize,
    pub dangling: usize,
    pub leaf: usize,
}

/// Dispositions for every image of an inventory.
///
/// Verdicts are ordered children first (deepest ancestry, then id) so they can
/// be acted on in sequence without removing a parent before its child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<'a> {
    verdicts: Vec<Verdict<'a>>,
}

impl<'a> Classification<'a> {
    pub fn verdicts(&self) -> &[Verdict<'a>] {
        &self.verdicts
    }

    pub fn disposition(&self, id: &str) -> Option<Disposition> {
        self.verdicts
            .iter()
            .find(|v| v.image.id == id)
            .map(|v| v.disposition)
    }

    pub fn verdict(&self, id: &str) -> Option<&Verdict<'a>> {
        self.verdicts.iter().find(|v| v.image.id == id)
    }

    pub fn deletions(&self) -> impl Iterator<Item = &Verdict<'a>> {
        self.verdicts.iter().filter(|v| v.disposition.is_delete())
    }

    pub fn summary(&self) -> ClassificationSummary {
        let mut summary = ClassificationSummary::default();
        for verdict in &self.verdicts {
            match verdict.disposition {
                Disposition::Keep => summary.kept += 1,
                Disposition::DeleteAsDangling => summary.dangling += 1,
                Disposition::DeleteAsLeaf => summary.leaf += 1,
            }
        }
        summary
    }
}

/// Builds the closed protection set for an inventory.
pub fn protection_set(inventory: &Inventory, policy: &RetentionPolicy, now: i64) -> ProtectionSet {
    let registry = &inventory.registry;

    let rules: [Box<dyn ProtectionRule>; 3] = [
        Box::new(ExclusionRule::new(policy.exclude.iter().cloned())),
        Box::new(SafetyWindowRule::new(now, policy.safety_duration)),
        Box::new(InUseRule::new(inventory.container_image_ids())),
    ];

    let mut set = ProtectionSet::new();
    for rule in &rules {
        set.merge(rule.evaluate(registry));
    }

    AncestorPropagator::new(registry).propagate(set)
}

/// Assigns a disposition to every image of `inventory`.
///
/// Pure: the same inventory, policy and `now` always yield the same result.
pub fn classify<'a>(
    inventory: &'a Inventory,
    policy: &RetentionPolicy,
    now: i64,
) -> Classification<'a> {
    let registry = &inventory.registry;
    let protected = protection_set(inventory, policy, now);

    let mut verdicts: Vec<(usize, Verdict<'a>)> = registry
        .keys()
        .map(|key| {
            let image = registry.image(key);
            let verdict = match protected.reasons(&image.id) {
                Some(reasons) => Verdict {
                    image,
                    disposition: Disposition::Keep,
                    reasons: reasons.iter().copied().collect(),
                },
                None if image.is_dangling() => Verdict {
                    image,
                    disposition: Disposition::DeleteAsDangling,
                    reasons: Vec::new(),
                },
                None => Verdict {
                    image,
                    disposition: Disposition::DeleteAsLeaf,
                    reasons: Vec::new(),
                },
            };
            (registry.depth(key), verdict)
        })
        .collect();

    verdicts.sort_by(|(depth_a, a), (depth_b, b)| {
        (Reverse(depth_a), &a.image.id).cmp(&(Reverse(depth_b), &b.image.id))
    });

    Classification {
        verdicts: verdicts.into_iter().map(|(_, verdict)| verdict).collect(),
    }
}
