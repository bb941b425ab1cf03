use std::collections::{HashMap, HashSet};

use anyhow::anyhow;

use crate::error::{LibError, Result};
use crate::models::{MenuInvariantViolation, MenuItem, MenuItemId, MenuValidationReport};

/// Walks every item's ancestor chain and reports parent cycles.
///
/// The walk seeds its visited set with the starting item and follows
/// `parent_id` upward; revisiting an id closes a cycle and reports the
/// revisited member. A pointer to an id absent from the set is treated as
/// reaching a root, not an error. Each cycle member is reported once.
pub fn menu_cycle_violations(items: &[MenuItem]) -> Vec<MenuInvariantViolation> {
    let index: HashMap<MenuItemId, &MenuItem> = items.iter().map(|item| (item.id, item)).collect();

    let mut reported = HashSet::new();
    let mut violations = Vec::new();
    for item in items {
        let mut visited = HashSet::new();
        visited.insert(item.id);

        let mut cursor = item.parent_id;
        while let Some(parent_id) = cursor {
            let Some(parent) = index.get(&parent_id) else {
                break;
            };
            if !visited.insert(parent_id) {
                if reported.insert(parent_id) {
                    violations.push(MenuInvariantViolation::CycleDetected { item_id: parent_id });
                }
                break;
            }
            cursor = parent.parent_id;
        }
    }

    violations
}

/// Strict hierarchy check for candidate write sets: every non-null parent
/// must be a live item of the same menu and the parent graph must be
/// acyclic. Unlike the lenient cycle walk, a parent outside the set is a
/// violation here, not a root.
pub fn menu_hierarchy_violations(items: &[MenuItem]) -> Vec<MenuInvariantViolation> {
    let known: HashSet<MenuItemId> = items.iter().map(|item| item.id).collect();

    let mut violations = Vec::new();
    for item in items {
        if let Some(parent_id) = item.parent_id {
            if !known.contains(&parent_id) {
                violations.push(MenuInvariantViolation::CrossMenuParent {
                    item_id: item.id,
                    parent_id,
                });
            }
        }
    }

    violations.extend(menu_cycle_violations(items));
    violations
}

pub fn ensure_menu_hierarchy(items: &[MenuItem]) -> Result<()> {
    let violations = menu_hierarchy_violations(items);
    if let Some(first) = violations.first() {
        return Err(LibError::invalid_with_code(
            first.error_code(),
            first.public_message(),
            anyhow!("menu hierarchy validation failed: {:?}", violations),
        ));
    }

    Ok(())
}

/// Whole-menu validation as exposed to callers: cycles only, since a parent
/// absent from the live set renders as a root.
pub fn validate_menu(items: &[MenuItem]) -> MenuValidationReport {
    let violations = menu_cycle_violations(items);
    MenuValidationReport {
        valid: violations.is_empty(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;
    use crate::models::{MenuId, TargetId};

    fn item(id: MenuItemId, parent_id: Option<MenuItemId>) -> MenuItem {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid datetime");
        MenuItem {
            id,
            menu_id: MenuId(Uuid::from_u128(1)),
            target_id: TargetId(Uuid::new_v4()),
            label: None,
            url: None,
            order: 0,
            parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_forest_has_no_violations() {
        let root = MenuItemId(Uuid::from_u128(1));
        let child = MenuItemId(Uuid::from_u128(2));
        let items = vec![item(root, None), item(child, Some(root))];

        let report = validate_menu(&items);
        assert!(report.valid);
        assert!(report.violations.is_empty());
        assert!(ensure_menu_hierarchy(&items).is_ok());
    }

    #[test]
    fn three_cycle_is_detected_with_member() {
        let a = MenuItemId(Uuid::from_u128(1));
        let b = MenuItemId(Uuid::from_u128(2));
        let c = MenuItemId(Uuid::from_u128(3));
        let items = vec![item(a, Some(b)), item(b, Some(c)), item(c, Some(a))];

        let report = validate_menu(&items);
        assert!(!report.valid);
        assert!(report.violations.iter().any(|violation| matches!(
            violation,
            MenuInvariantViolation::CycleDetected { item_id } if [a, b, c].contains(item_id)
        )));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let a = MenuItemId(Uuid::from_u128(1));
        let items = vec![item(a, Some(a))];

        let report = validate_menu(&items);
        assert!(!report.valid);
        assert_eq!(
            report.violations,
            vec![MenuInvariantViolation::CycleDetected { item_id: a }]
        );
    }

    #[test]
    fn chain_into_cycle_reports_cycle_member_once() {
        let outside = MenuItemId(Uuid::from_u128(1));
        let a = MenuItemId(Uuid::from_u128(2));
        let b = MenuItemId(Uuid::from_u128(3));
        let items = vec![item(outside, Some(a)), item(a, Some(b)), item(b, Some(a))];

        let report = validate_menu(&items);
        assert!(!report.valid);
        for violation in &report.violations {
            let MenuInvariantViolation::CycleDetected { item_id } = violation else {
                panic!("unexpected violation {violation:?}");
            };
            assert!([a, b].contains(item_id), "outside item is not in the cycle");
        }
    }

    #[test]
    fn lenient_validation_accepts_unknown_parent() {
        let a = MenuItemId(Uuid::from_u128(1));
        let ghost = MenuItemId(Uuid::from_u128(99));
        let items = vec![item(a, Some(ghost))];

        assert!(validate_menu(&items).valid);
    }

    #[test]
    fn strict_validation_rejects_unknown_parent() {
        let a = MenuItemId(Uuid::from_u128(1));
        let ghost = MenuItemId(Uuid::from_u128(99));
        let items = vec![item(a, Some(ghost))];

        let violations = menu_hierarchy_violations(&items);
        assert_eq!(
            violations,
            vec![MenuInvariantViolation::CrossMenuParent {
                item_id: a,
                parent_id: ghost,
            }]
        );

        let err = ensure_menu_hierarchy(&items).expect_err("strict check should fail");
        assert_eq!(err.code, "cross_menu_parent");
    }

    #[test]
    fn strict_validation_rejects_cycles() {
        let a = MenuItemId(Uuid::from_u128(1));
        let b = MenuItemId(Uuid::from_u128(2));
        let items = vec![item(a, Some(b)), item(b, Some(a))];

        let err = ensure_menu_hierarchy(&items).expect_err("cycle should fail");
        assert_eq!(err.code, "menu_cycle");
    }
}
