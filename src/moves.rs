use std::collections::{HashMap, HashSet};

use anyhow::anyhow;

use crate::algorithms::sort_flat;
use crate::error::{LibError, Result};
use crate::invariants::ensure_menu_hierarchy;
use crate::models::{MenuItem, MenuItemId, MoveDirection, ReorderEntry};

/// One `(order, parent_id)` write the store must apply to an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveWrite {
    pub item_id: MenuItemId,
    pub order: i32,
    pub parent_id: Option<MenuItemId>,
}

/// Outcome of planning a move: the writes to apply, or nothing to do
/// (`up`/`down` with no same-parent neighbor in that direction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovePlan {
    Writes(Vec<MoveWrite>),
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub writes: Vec<MoveWrite>,
    pub skipped: usize,
}

/// Translates one semantic move command into concrete writes against the
/// menu's flat item list.
///
/// `up`/`down` search the global document order for the nearest item sharing
/// the mover's parent, skipping interleaved non-siblings, and swap the two
/// `order` values. `top` goes strictly before every current sibling. `under`
/// appends as the target's last child, or detaches to root when no target is
/// given; the appended order is computed from the target's *other* children,
/// so an item already under the target still lands after them when
/// re-appended. Re-parenting under the item itself or one of its descendants
/// is rejected before any write is planned.
pub fn plan_move(
    items: &[MenuItem],
    item_id: MenuItemId,
    direction: MoveDirection,
    target_id: Option<MenuItemId>,
) -> Result<MovePlan> {
    let mut flat = items.to_vec();
    sort_flat(&mut flat);

    let position = flat
        .iter()
        .position(|item| item.id == item_id)
        .ok_or_else(|| {
            LibError::not_found(
                "Menu item not found",
                anyhow!("menu item {} not found in menu", item_id),
            )
        })?;
    let item = flat[position].clone();

    match direction {
        MoveDirection::Up => {
            let Some(sibling) = flat[..position]
                .iter()
                .rev()
                .find(|candidate| candidate.parent_id == item.parent_id)
            else {
                return Ok(MovePlan::NoOp);
            };
            Ok(MovePlan::Writes(swap_orders(&item, sibling)))
        }
        MoveDirection::Down => {
            let Some(sibling) = flat[position + 1..]
                .iter()
                .find(|candidate| candidate.parent_id == item.parent_id)
            else {
                return Ok(MovePlan::NoOp);
            };
            Ok(MovePlan::Writes(swap_orders(&item, sibling)))
        }
        MoveDirection::Top => {
            let min_sibling_order = flat
                .iter()
                .filter(|candidate| {
                    candidate.parent_id == item.parent_id && candidate.id != item.id
                })
                .map(|candidate| candidate.order)
                .min();
            let order = match min_sibling_order {
                Some(min) => min - 1,
                None => 0,
            };
            Ok(MovePlan::Writes(vec![MoveWrite {
                item_id: item.id,
                order,
                parent_id: item.parent_id,
            }]))
        }
        MoveDirection::Under => {
            let Some(target_id) = target_id else {
                // Detach to root. The order key is left untouched; exact root
                // placement is a follow-up move or bulk reorder.
                return Ok(MovePlan::Writes(vec![MoveWrite {
                    item_id: item.id,
                    order: item.order,
                    parent_id: None,
                }]));
            };

            let target = flat
                .iter()
                .find(|candidate| candidate.id == target_id)
                .ok_or_else(|| {
                    LibError::invalid(
                        "Move target not found in this menu",
                        anyhow!("move target {} not found in menu", target_id),
                    )
                })?;
            ensure_not_own_descendant(&flat, item.id, target_id)?;

            let max_child_order = flat
                .iter()
                .filter(|candidate| {
                    candidate.parent_id == Some(target_id) && candidate.id != item.id
                })
                .map(|candidate| candidate.order)
                .max();
            let order = match max_child_order {
                Some(max) => max + 1,
                None => target.order + 1,
            };
            Ok(MovePlan::Writes(vec![MoveWrite {
                item_id: item.id,
                order,
                parent_id: Some(target_id),
            }]))
        }
    }
}

fn swap_orders(item: &MenuItem, sibling: &MenuItem) -> Vec<MoveWrite> {
    vec![
        MoveWrite {
            item_id: item.id,
            order: sibling.order,
            parent_id: item.parent_id,
        },
        MoveWrite {
            item_id: sibling.id,
            order: item.order,
            parent_id: sibling.parent_id,
        },
    ]
}

fn ensure_not_own_descendant(
    items: &[MenuItem],
    item_id: MenuItemId,
    target_id: MenuItemId,
) -> Result<()> {
    let index: HashMap<MenuItemId, &MenuItem> = items.iter().map(|item| (item.id, item)).collect();

    // Visited guard so a pre-existing cycle above the target cannot hang the
    // walk; it surfaces through the menu validator instead.
    let mut visited = HashSet::new();
    let mut cursor = Some(target_id);
    while let Some(ancestor_id) = cursor {
        if ancestor_id == item_id {
            return Err(LibError::invalid_with_code(
                "menu_cycle",
                "Cannot move an item under itself or its own descendant",
                anyhow!("moving {} under {} would create a cycle", item_id, target_id),
            ));
        }
        if !visited.insert(ancestor_id) {
            break;
        }
        cursor = index.get(&ancestor_id).and_then(|item| item.parent_id);
    }

    Ok(())
}

/// Plans a bulk drag-and-drop persistence pass for one menu.
///
/// Entries naming an id that is not a live item of the menu are skipped
/// silently. The candidate final state is validated for same-menu parents and
/// acyclicity before any write is returned; a violation rejects the whole
/// batch. Applying the same payload twice plans the same writes.
pub fn plan_reorder(items: &[MenuItem], entries: &[ReorderEntry]) -> Result<ReorderPlan> {
    let mut candidate = items.to_vec();
    let index: HashMap<MenuItemId, usize> = candidate
        .iter()
        .enumerate()
        .map(|(position, item)| (item.id, position))
        .collect();

    let mut skipped = 0usize;
    let mut touched: Vec<MenuItemId> = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(&position) = index.get(&entry.item_id) else {
            skipped += 1;
            continue;
        };
        let item = &mut candidate[position];
        item.order = entry.order;
        item.parent_id = entry.parent_id;
        if !touched.contains(&entry.item_id) {
            touched.push(entry.item_id);
        }
    }

    ensure_menu_hierarchy(&candidate)?;

    let writes = touched
        .into_iter()
        .map(|item_id| {
            let item = &candidate[index[&item_id]];
            MoveWrite {
                item_id,
                order: item.order,
                parent_id: item.parent_id,
            }
        })
        .collect();

    Ok(ReorderPlan { writes, skipped })
}

/// Plans the hierarchy side effect of deleting one item: every direct child
/// is re-parented to root, keeping its own `order` value. Deeper descendants
/// follow their parents and are untouched. Removing the deleted item's own
/// row stays with the store.
pub fn plan_delete(items: &[MenuItem], item_id: MenuItemId) -> Vec<MoveWrite> {
    items
        .iter()
        .filter(|item| item.parent_id == Some(item_id))
        .map(|child| MoveWrite {
            item_id: child.id,
            order: child.order,
            parent_id: None,
        })
        .collect()
}

/// Applies a plan to an in-memory flat list. The sqlx layer issues the same
/// writes as row updates; tests use this to observe final states.
pub fn apply_writes(items: &mut [MenuItem], writes: &[MoveWrite]) {
    for write in writes {
        if let Some(item) = items.iter_mut().find(|item| item.id == write.item_id) {
            item.order = write.order;
            item.parent_id = write.parent_id;
        }
    }
}
