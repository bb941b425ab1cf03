use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LibError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuLocation {
    Header,
    Footer,
    Sidebar,
}

impl MenuLocation {
    pub const fn as_db_value(self) -> &'static str {
        match self {
            MenuLocation::Header => "header",
            MenuLocation::Footer => "footer",
            MenuLocation::Sidebar => "sidebar",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "header" => Some(MenuLocation::Header),
            "footer" => Some(MenuLocation::Footer),
            "sidebar" => Some(MenuLocation::Sidebar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct MenuId(pub Uuid);

impl fmt::Display for MenuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MenuId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for MenuId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct MenuItemId(pub Uuid);

impl fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MenuItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for MenuItemId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Identity of the external content entity (page/post) a menu item points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TargetId(pub Uuid);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TargetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl From<Uuid> for TargetId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<MenuLocation>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuSummary {
    pub id: MenuId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<MenuLocation>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub item_count: i64,
}

/// One flat menu entry as stored. `order` is a sibling-position key scoped to
/// `(menu_id, parent_id)`; ties are broken by `(created_at, id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: MenuItemId,
    pub menu_id: MenuId,
    pub target_id: TargetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MenuItemId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTreeNode {
    pub id: MenuItemId,
    pub target_id: TargetId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MenuItemId>,
    pub depth: u32,
    pub children: Vec<MenuTreeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
    Top,
    Under,
}

/// Outcome of a move command. `NoOp` covers `up`/`down` with no same-parent
/// neighbor in that direction; a missing item is a `NotFound` error instead.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved { item: MenuItem },
    NoOp,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderOutcome {
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MenuInvariantViolation {
    CycleDetected {
        item_id: MenuItemId,
    },
    CrossMenuParent {
        item_id: MenuItemId,
        parent_id: MenuItemId,
    },
}

impl MenuInvariantViolation {
    pub const fn error_code(&self) -> &'static str {
        match self {
            MenuInvariantViolation::CycleDetected { .. } => "menu_cycle",
            MenuInvariantViolation::CrossMenuParent { .. } => "cross_menu_parent",
        }
    }

    pub const fn public_message(&self) -> &'static str {
        match self {
            MenuInvariantViolation::CycleDetected { .. } => {
                "Menu items form a parent cycle"
            }
            MenuInvariantViolation::CrossMenuParent { .. } => {
                "Menu item parent belongs to a different menu"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuValidationReport {
    pub valid: bool,
    pub violations: Vec<MenuInvariantViolation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuPayload {
    pub name: String,
    pub location: Option<MenuLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuPayload {
    pub name: String,
    pub location: Option<MenuLocation>,
}

#[derive(Debug, Clone)]
pub struct MenuDefinition {
    pub name: String,
    pub location: Option<MenuLocation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMenuItem {
    pub target_id: TargetId,
    pub label: Option<String>,
    pub url: Option<String>,
    pub order: i32,
    pub parent_id: Option<MenuItemId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemsPayload {
    pub items: Vec<NewMenuItem>,
}

/// Full desired state of the editable item fields. `parent_id = None` means
/// root level, not "leave unchanged".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemPayload {
    pub label: Option<String>,
    pub url: Option<String>,
    pub order: i32,
    pub parent_id: Option<MenuItemId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveItemPayload {
    pub item_id: MenuItemId,
    pub direction: MoveDirection,
    pub target_id: Option<MenuItemId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub item_id: MenuItemId,
    pub order: i32,
    pub parent_id: Option<MenuItemId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderItemsPayload {
    pub items: Vec<ReorderEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub page: u32,
    pub limit: u32,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMenusQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListMenusQuery {
    pub fn pagination(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(25).clamp(1, 200);
        (page, limit)
    }
}

impl CreateMenuPayload {
    pub fn normalize(self) -> Result<MenuDefinition> {
        normalize_menu_definition(self.name, self.location)
    }
}

impl UpdateMenuPayload {
    pub fn normalize(self) -> Result<MenuDefinition> {
        normalize_menu_definition(self.name, self.location)
    }
}

fn normalize_menu_definition(
    name: String,
    location: Option<MenuLocation>,
) -> Result<MenuDefinition> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(LibError::invalid(
            "Menu name is required",
            anyhow!("empty menu name"),
        ));
    }

    Ok(MenuDefinition { name, location })
}

impl NewMenuItem {
    /// Trims the override fields; blank overrides collapse to "no override".
    pub fn normalize(self) -> Self {
        Self {
            target_id: self.target_id,
            label: normalize_override(self.label),
            url: normalize_override(self.url),
            order: self.order,
            parent_id: self.parent_id,
        }
    }
}

impl UpdateItemPayload {
    pub fn normalize(self) -> Self {
        Self {
            label: normalize_override(self.label),
            url: normalize_override(self.url),
            order: self.order,
            parent_id: self.parent_id,
        }
    }
}

fn normalize_override(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{
        CreateMenuPayload, ListMenusQuery, MenuLocation, NewMenuItem, TargetId, UpdateItemPayload,
    };

    #[test]
    fn normalize_menu_trims_name() {
        let payload = CreateMenuPayload {
            name: "  Main navigation  ".to_string(),
            location: Some(MenuLocation::Header),
        };

        let definition = payload.normalize().expect("payload should normalize");
        assert_eq!(definition.name, "Main navigation");
        assert_eq!(definition.location, Some(MenuLocation::Header));
    }

    #[test]
    fn normalize_menu_rejects_empty_name() {
        let payload = CreateMenuPayload {
            name: "   ".to_string(),
            location: None,
        };

        let err = payload.normalize().expect_err("blank name should fail");
        assert_eq!(err.public, "Menu name is required");
    }

    #[test]
    fn normalize_item_collapses_blank_overrides() {
        let item = NewMenuItem {
            target_id: TargetId(uuid::Uuid::new_v4()),
            label: Some("   ".to_string()),
            url: Some(" /about ".to_string()),
            order: 3,
            parent_id: None,
        }
        .normalize();

        assert_eq!(item.label, None);
        assert_eq!(item.url, Some("/about".to_string()));
    }

    #[test]
    fn normalize_update_trims_label() {
        let payload = UpdateItemPayload {
            label: Some(" About us ".to_string()),
            url: None,
            order: 0,
            parent_id: None,
        }
        .normalize();

        assert_eq!(payload.label, Some("About us".to_string()));
    }

    #[test]
    fn pagination_clamps_bounds() {
        let query = ListMenusQuery {
            page: Some(0),
            limit: Some(10_000),
        };
        assert_eq!(query.pagination(), (1, 200));

        let query = ListMenusQuery {
            page: None,
            limit: None,
        };
        assert_eq!(query.pagination(), (1, 25));
    }

    #[test]
    fn location_db_values_round_trip() {
        for location in [
            MenuLocation::Header,
            MenuLocation::Footer,
            MenuLocation::Sidebar,
        ] {
            assert_eq!(
                MenuLocation::from_db_value(location.as_db_value()),
                Some(location)
            );
        }
        assert_eq!(MenuLocation::from_db_value("body"), None);
    }
}
