use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::models::{MenuItem, MenuItemId, MenuTreeNode, TargetId};

/// Document-order key for a flat item list. `order` is the sibling key; ties
/// fall back to creation time then id so rendering stays stable.
pub fn flat_sort_key(item: &MenuItem) -> (i32, NaiveDateTime, Uuid) {
    (item.order, item.created_at, item.id.0)
}

pub fn sort_flat(items: &mut [MenuItem]) {
    items.sort_by_key(flat_sort_key);
}

/// Display title for one item: explicit label override first, then the
/// resolved target title, then the raw target id as a last resort.
pub fn resolve_title(item: &MenuItem, titles: &HashMap<TargetId, String>) -> String {
    if let Some(label) = &item.label {
        return label.clone();
    }
    titles
        .get(&item.target_id)
        .cloned()
        .unwrap_or_else(|| item.target_id.to_string())
}

/// Assembles the flat item set of one menu into a rooted forest.
///
/// An item whose declared parent is absent from the set is treated as a root
/// rather than an error. Members of a parent cycle never attach anywhere and
/// are dropped from the output; run the hierarchy validator first when the
/// input is untrusted.
pub fn build_tree(items: &[MenuItem], titles: &HashMap<TargetId, String>) -> Vec<MenuTreeNode> {
    let known: HashSet<MenuItemId> = items.iter().map(|item| item.id).collect();

    let mut children: HashMap<Option<MenuItemId>, Vec<&MenuItem>> = HashMap::new();
    for item in items {
        let bucket = match item.parent_id {
            Some(parent_id) if known.contains(&parent_id) => Some(parent_id),
            _ => None,
        };
        children.entry(bucket).or_default().push(item);
    }
    for bucket in children.values_mut() {
        bucket.sort_by_key(|item| flat_sort_key(item));
    }

    attach_children(None, 0, &children, titles)
}

fn attach_children(
    parent_id: Option<MenuItemId>,
    depth: u32,
    children: &HashMap<Option<MenuItemId>, Vec<&MenuItem>>,
    titles: &HashMap<TargetId, String>,
) -> Vec<MenuTreeNode> {
    let Some(bucket) = children.get(&parent_id) else {
        return Vec::new();
    };

    bucket
        .iter()
        .map(|item| MenuTreeNode {
            id: item.id,
            target_id: item.target_id,
            title: resolve_title(item, titles),
            label: item.label.clone(),
            url: item.url.clone(),
            order: item.order,
            parent_id: item.parent_id,
            depth,
            children: attach_children(Some(item.id), depth + 1, children, titles),
        })
        .collect()
}

/// Depth-first pre-order walk of a forest, the document order a rendered
/// menu lists its entries in.
pub fn flatten_tree(nodes: &[MenuTreeNode]) -> Vec<&MenuTreeNode> {
    let mut flat = Vec::new();
    for node in nodes {
        push_subtree(node, &mut flat);
    }
    flat
}

fn push_subtree<'a>(node: &'a MenuTreeNode, flat: &mut Vec<&'a MenuTreeNode>) {
    flat.push(node);
    for child in &node.children {
        push_subtree(child, flat);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::models::{MenuId, MenuItem, MenuItemId, MenuTreeNode, TargetId};

    fn item(
        id: MenuItemId,
        order: i32,
        parent_id: Option<MenuItemId>,
        label: Option<&str>,
    ) -> MenuItem {
        let now = NaiveDate::from_ymd_opt(2026, 1, 1)
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid datetime");
        MenuItem {
            id,
            menu_id: MenuId(Uuid::from_u128(1)),
            target_id: TargetId(Uuid::new_v4()),
            label: label.map(|label| label.to_string()),
            url: None,
            order,
            parent_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn ids(nodes: &[MenuTreeNode]) -> Vec<MenuItemId> {
        nodes.iter().map(|node| node.id).collect()
    }

    #[test]
    fn builds_forest_with_depths() {
        let home = MenuItemId(Uuid::from_u128(10));
        let about = MenuItemId(Uuid::from_u128(11));
        let team = MenuItemId(Uuid::from_u128(12));
        let items = vec![
            item(about, 1, None, Some("About")),
            item(team, 0, Some(about), Some("Team")),
            item(home, 0, None, Some("Home")),
        ];

        let tree = super::build_tree(&items, &HashMap::new());
        assert_eq!(ids(&tree), vec![home, about]);
        assert_eq!(tree[0].depth, 0);
        assert_eq!(tree[1].children.len(), 1);
        assert_eq!(tree[1].children[0].id, team);
        assert_eq!(tree[1].children[0].depth, 1);
    }

    #[test]
    fn missing_parent_falls_back_to_root() {
        let orphan = MenuItemId(Uuid::from_u128(20));
        let ghost = MenuItemId(Uuid::from_u128(99));
        let items = vec![item(orphan, 5, Some(ghost), Some("Orphan"))];

        let tree = super::build_tree(&items, &HashMap::new());
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, orphan);
        assert_eq!(tree[0].depth, 0);
    }

    #[test]
    fn siblings_sort_by_order_then_creation() {
        let a = MenuItemId(Uuid::from_u128(30));
        let b = MenuItemId(Uuid::from_u128(31));
        let c = MenuItemId(Uuid::from_u128(32));
        let mut items = vec![
            item(c, 2, None, None),
            item(a, 0, None, None),
            item(b, 0, None, None),
        ];
        // Equal orders: the earlier-created item wins.
        items[2].created_at = items[1].created_at + chrono::Duration::seconds(5);

        let tree = super::build_tree(&items, &HashMap::new());
        assert_eq!(ids(&tree), vec![a, b, c]);

        let orders: Vec<i32> = tree.iter().map(|node| node.order).collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        assert_eq!(orders, sorted);
    }

    #[test]
    fn title_resolution_prefers_label_override() {
        let target = TargetId(Uuid::from_u128(77));
        let mut titles = HashMap::new();
        titles.insert(target, "Resolved Page".to_string());

        let mut entry = item(MenuItemId(Uuid::from_u128(40)), 0, None, Some("Override"));
        entry.target_id = target;
        assert_eq!(super::resolve_title(&entry, &titles), "Override");

        entry.label = None;
        assert_eq!(super::resolve_title(&entry, &titles), "Resolved Page");

        let unresolved = item(MenuItemId(Uuid::from_u128(41)), 0, None, None);
        assert_eq!(
            super::resolve_title(&unresolved, &titles),
            unresolved.target_id.to_string()
        );
    }

    #[test]
    fn flatten_and_rebuild_is_stable() {
        let root_a = MenuItemId(Uuid::from_u128(50));
        let root_b = MenuItemId(Uuid::from_u128(51));
        let child = MenuItemId(Uuid::from_u128(52));
        let grandchild = MenuItemId(Uuid::from_u128(53));
        let items = vec![
            item(root_a, 0, None, None),
            item(root_b, 1, None, None),
            item(child, 0, Some(root_a), None),
            item(grandchild, 0, Some(child), None),
        ];

        let tree = super::build_tree(&items, &HashMap::new());
        let flat_ids: Vec<MenuItemId> = super::flatten_tree(&tree)
            .iter()
            .map(|node| node.id)
            .collect();
        assert_eq!(flat_ids, vec![root_a, child, grandchild, root_b]);

        // Rebuild from the flattened order and compare shapes.
        let by_id: HashMap<MenuItemId, &MenuItem> =
            items.iter().map(|item| (item.id, item)).collect();
        let reflattened: Vec<MenuItem> = flat_ids
            .iter()
            .map(|id| (*by_id.get(id).expect("flattened id should exist")).clone())
            .collect();
        let rebuilt = super::build_tree(&reflattened, &HashMap::new());

        let original = serde_json::to_value(&tree).expect("tree should serialize");
        let round_tripped = serde_json::to_value(&rebuilt).expect("tree should serialize");
        assert_eq!(original, round_tripped);
    }
}
