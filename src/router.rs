//! Routing decisions for detected updates
//!
//! Pure functions: no I/O, no state. Deciding whether an update is safe to
//! auto-apply and ordering a batch so high-risk items surface first.

use std::collections::HashMap;

use tracing::warn;

use crate::config::StrategyPolicy;
use crate::detect::UpdateRecord;
use crate::version::semver::ChangeType;

/// Where an update goes after routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    AutoApply,
    ManualReview,
    /// Unknown strategy identifier: a non-fatal configuration error
    Skip,
}

/// Whether an update may be applied without human review.
///
/// Major changes and breaking changes never auto-apply, regardless of how
/// lenient the strategy is. A strategy's review flag is always honored.
pub fn should_auto_apply(update: &UpdateRecord, policy: &StrategyPolicy) -> bool {
    !policy.requires_review
        && update.change_type != ChangeType::Major
        && !update.has_breaking_changes
}

/// Resolve an update's strategy identifier and decide its route.
pub fn route(update: &UpdateRecord, strategies: &HashMap<String, StrategyPolicy>) -> Route {
    let Some(policy) = strategies.get(&update.strategy) else {
        warn!(
            "Unknown strategy '{}' for {}, skipping",
            update.strategy, update.package
        );
        return Route::Skip;
    };

    if should_auto_apply(update, policy) {
        Route::AutoApply
    } else {
        Route::ManualReview
    }
}

/// Order a batch for sequential processing: critical updates first, then
/// major changes within equal criticality, so failures are discovered
/// sooner. The sort is stable otherwise.
pub fn order_updates(updates: &mut [UpdateRecord]) {
    updates.sort_by_key(|u| (!u.critical, u.change_type != ChangeType::Major));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin_strategies;
    use rstest::rstest;

    fn update(package: &str, change_type: ChangeType, critical: bool, strategy: &str) -> UpdateRecord {
        UpdateRecord {
            package: package.to_string(),
            current: "1.0.0".to_string(),
            latest: "1.0.1".to_string(),
            change_type,
            has_breaking_changes: change_type == ChangeType::Major,
            recommendation: "",
            strategy: strategy.to_string(),
            critical,
            project: "demo".to_string(),
        }
    }

    #[rstest]
    #[case(ChangeType::Patch, false, true)]
    #[case(ChangeType::Minor, false, true)]
    #[case(ChangeType::Major, false, false)] // major never auto-applies
    #[case(ChangeType::Patch, true, false)] // review flag always wins
    fn should_auto_apply_honors_review_flag_and_change_size(
        #[case] change_type: ChangeType,
        #[case] requires_review: bool,
        #[case] expected: bool,
    ) {
        let policy = StrategyPolicy {
            requires_review,
            ..StrategyPolicy::default()
        };
        let u = update("pkg", change_type, false, "auto-patch");

        assert_eq!(should_auto_apply(&u, &policy), expected);
    }

    #[test]
    fn should_auto_apply_rejects_breaking_changes_of_any_size() {
        let policy = StrategyPolicy::default();
        let mut u = update("pkg", ChangeType::Minor, false, "auto-minor");
        u.has_breaking_changes = true;

        assert!(!should_auto_apply(&u, &policy));
    }

    #[test]
    fn patch_under_manual_major_strategy_still_requires_review() {
        // Routing respects the declared strategy's review flag, not the
        // change size alone.
        let strategies = builtin_strategies();
        let u = update("react", ChangeType::Patch, true, "manual-major");

        assert_eq!(route(&u, &strategies), Route::ManualReview);
    }

    #[test]
    fn route_auto_applies_patch_under_auto_patch_strategy() {
        let strategies = builtin_strategies();
        let u = update("framer-motion", ChangeType::Patch, false, "auto-patch");

        assert_eq!(route(&u, &strategies), Route::AutoApply);
    }

    #[test]
    fn route_skips_unknown_strategy() {
        let strategies = builtin_strategies();
        let u = update("pkg", ChangeType::Patch, false, "yolo-everything");

        assert_eq!(route(&u, &strategies), Route::Skip);
    }

    #[test]
    fn order_updates_puts_critical_then_major_first() {
        let mut updates = vec![
            update("d", ChangeType::Patch, false, "auto-patch"),
            update("c", ChangeType::Major, false, "manual-major"),
            update("b", ChangeType::Patch, true, "auto-patch"),
            update("a", ChangeType::Major, true, "manual-major"),
        ];

        order_updates(&mut updates);

        let names: Vec<&str> = updates.iter().map(|u| u.package.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn order_updates_is_stable_within_equal_rank() {
        let mut updates = vec![
            update("first", ChangeType::Patch, false, "auto-patch"),
            update("second", ChangeType::Patch, false, "auto-patch"),
        ];

        order_updates(&mut updates);

        assert_eq!(updates[0].package, "first");
        assert_eq!(updates[1].package, "second");
    }
}
