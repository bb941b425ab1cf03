use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::content::ContentRepository;
use crate::db;
use crate::error::Result;
use crate::models::{
    CreateItemsPayload, CreateMenuPayload, ListMenusQuery, Menu, MenuId, MenuItem, MenuItemId,
    MenuSummary, MenuTreeNode, MenuValidationReport, MoveItemPayload, MoveOutcome, NewMenuItem,
    Paged, ReorderItemsPayload, ReorderOutcome, UpdateItemPayload, UpdateMenuPayload,
};

/// High-level menu actions behind a single tagged entry point, for callers
/// that dispatch operations as data (tool servers, job runners).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum MenuOperation {
    CreateMenu {
        payload: CreateMenuPayload,
    },
    GetMenu {
        menu_id: MenuId,
    },
    ListMenus {
        query: ListMenusQuery,
    },
    UpdateMenu {
        menu_id: MenuId,
        payload: UpdateMenuPayload,
    },
    DeleteMenu {
        menu_id: MenuId,
    },
    GetItemsFlat {
        menu_id: MenuId,
    },
    GetItemsTree {
        menu_id: MenuId,
    },
    CreateItem {
        menu_id: MenuId,
        item: NewMenuItem,
    },
    CreateItems {
        menu_id: MenuId,
        payload: CreateItemsPayload,
    },
    UpdateItem {
        item_id: MenuItemId,
        payload: UpdateItemPayload,
    },
    MoveItem {
        menu_id: MenuId,
        payload: MoveItemPayload,
    },
    ReorderItems {
        menu_id: MenuId,
        payload: ReorderItemsPayload,
    },
    DeleteItem {
        item_id: MenuItemId,
    },
    ValidateMenu {
        menu_id: MenuId,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MenuOperationResult {
    Menu {
        menu: Menu,
    },
    MenusPage {
        page: u32,
        limit: u32,
        items: Vec<MenuSummary>,
    },
    Items {
        items: Vec<MenuItem>,
    },
    Tree {
        roots: Vec<MenuTreeNode>,
    },
    Item {
        item: MenuItem,
    },
    Move {
        outcome: MoveOutcome,
    },
    Reorder {
        outcome: ReorderOutcome,
    },
    Validation {
        report: MenuValidationReport,
    },
    Deleted,
}

#[derive(Clone)]
pub struct MenuOperations<C> {
    pool: Arc<PgPool>,
    content: C,
}

impl<C> MenuOperations<C>
where
    C: ContentRepository,
{
    pub fn new(pool: Arc<PgPool>, content: C) -> Self {
        Self { pool, content }
    }

    pub fn pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    pub async fn execute(&self, operation: MenuOperation) -> Result<MenuOperationResult> {
        match operation {
            MenuOperation::CreateMenu { payload } => {
                let menu = self.create_menu(payload).await?;
                Ok(MenuOperationResult::Menu { menu })
            }
            MenuOperation::GetMenu { menu_id } => {
                let menu = self.get_menu(menu_id).await?;
                Ok(MenuOperationResult::Menu { menu })
            }
            MenuOperation::ListMenus { query } => {
                let page = self.list_menus(query).await?;
                Ok(MenuOperationResult::MenusPage {
                    page: page.page,
                    limit: page.limit,
                    items: page.items,
                })
            }
            MenuOperation::UpdateMenu { menu_id, payload } => {
                let menu = self.update_menu(menu_id, payload).await?;
                Ok(MenuOperationResult::Menu { menu })
            }
            MenuOperation::DeleteMenu { menu_id } => {
                self.delete_menu(menu_id).await?;
                Ok(MenuOperationResult::Deleted)
            }
            MenuOperation::GetItemsFlat { menu_id } => {
                let items = self.get_items_flat(menu_id).await?;
                Ok(MenuOperationResult::Items { items })
            }
            MenuOperation::GetItemsTree { menu_id } => {
                let roots = self.get_items_tree(menu_id).await?;
                Ok(MenuOperationResult::Tree { roots })
            }
            MenuOperation::CreateItem { menu_id, item } => {
                let item = self.create_item(menu_id, item).await?;
                Ok(MenuOperationResult::Item { item })
            }
            MenuOperation::CreateItems { menu_id, payload } => {
                let items = self.create_items(menu_id, payload).await?;
                Ok(MenuOperationResult::Items { items })
            }
            MenuOperation::UpdateItem { item_id, payload } => {
                let item = self.update_item(item_id, payload).await?;
                Ok(MenuOperationResult::Item { item })
            }
            MenuOperation::MoveItem { menu_id, payload } => {
                let outcome = self.move_item(menu_id, payload).await?;
                Ok(MenuOperationResult::Move { outcome })
            }
            MenuOperation::ReorderItems { menu_id, payload } => {
                let outcome = self.reorder_items(menu_id, payload).await?;
                Ok(MenuOperationResult::Reorder { outcome })
            }
            MenuOperation::DeleteItem { item_id } => {
                self.delete_item(item_id).await?;
                Ok(MenuOperationResult::Deleted)
            }
            MenuOperation::ValidateMenu { menu_id } => {
                let report = self.validate_menu(menu_id).await?;
                Ok(MenuOperationResult::Validation { report })
            }
        }
    }

    pub async fn create_menu(&self, payload: CreateMenuPayload) -> Result<Menu> {
        db::create_menu(&self.pool, payload).await
    }

    pub async fn get_menu(&self, menu_id: MenuId) -> Result<Menu> {
        db::get_menu(&self.pool, menu_id).await
    }

    pub async fn list_menus(&self, query: ListMenusQuery) -> Result<Paged<MenuSummary>> {
        let (page, limit) = query.pagination();
        let items = db::list_menus(&self.pool, page, limit).await?;
        Ok(Paged { page, limit, items })
    }

    pub async fn update_menu(&self, menu_id: MenuId, payload: UpdateMenuPayload) -> Result<Menu> {
        db::update_menu(&self.pool, menu_id, payload).await
    }

    pub async fn delete_menu(&self, menu_id: MenuId) -> Result<()> {
        db::delete_menu(&self.pool, menu_id).await
    }

    pub async fn get_items_flat(&self, menu_id: MenuId) -> Result<Vec<MenuItem>> {
        db::list_items_flat(&self.pool, menu_id).await
    }

    pub async fn get_items_tree(&self, menu_id: MenuId) -> Result<Vec<MenuTreeNode>> {
        db::get_items_tree(&self.pool, menu_id, &self.content).await
    }

    pub async fn create_item(&self, menu_id: MenuId, item: NewMenuItem) -> Result<MenuItem> {
        db::create_item(&self.pool, menu_id, item).await
    }

    pub async fn create_items(
        &self,
        menu_id: MenuId,
        payload: CreateItemsPayload,
    ) -> Result<Vec<MenuItem>> {
        db::create_items(&self.pool, menu_id, payload).await
    }

    pub async fn update_item(
        &self,
        item_id: MenuItemId,
        payload: UpdateItemPayload,
    ) -> Result<MenuItem> {
        db::update_item(&self.pool, item_id, payload).await
    }

    pub async fn move_item(&self, menu_id: MenuId, payload: MoveItemPayload) -> Result<MoveOutcome> {
        db::move_item(
            &self.pool,
            menu_id,
            payload.item_id,
            payload.direction,
            payload.target_id,
        )
        .await
    }

    pub async fn reorder_items(
        &self,
        menu_id: MenuId,
        payload: ReorderItemsPayload,
    ) -> Result<ReorderOutcome> {
        db::reorder_items(&self.pool, menu_id, payload).await
    }

    pub async fn delete_item(&self, item_id: MenuItemId) -> Result<()> {
        db::delete_item(&self.pool, item_id).await
    }

    pub async fn validate_menu(&self, menu_id: MenuId) -> Result<MenuValidationReport> {
        db::validate_menu(&self.pool, menu_id).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::MenuOperation;
    use crate::models::MoveDirection;

    #[test]
    fn move_operation_deserializes_from_tagged_json() {
        let menu_id = Uuid::from_u128(1);
        let item_id = Uuid::from_u128(2);
        let target_id = Uuid::from_u128(3);

        let operation: MenuOperation = serde_json::from_value(json!({
            "operation": "move_item",
            "menu_id": menu_id,
            "payload": {
                "itemId": item_id,
                "direction": "under",
                "targetId": target_id
            }
        }))
        .expect("operation should deserialize");

        let MenuOperation::MoveItem { menu_id: parsed, payload } = operation else {
            panic!("expected move_item operation");
        };
        assert_eq!(parsed.0, menu_id);
        assert_eq!(payload.item_id.0, item_id);
        assert_eq!(payload.direction, MoveDirection::Under);
        assert_eq!(payload.target_id.map(|id| id.0), Some(target_id));
    }

    #[test]
    fn reorder_operation_deserializes_entries() {
        let operation: MenuOperation = serde_json::from_value(json!({
            "operation": "reorder_items",
            "menu_id": Uuid::from_u128(1),
            "payload": {
                "items": [
                    { "itemId": Uuid::from_u128(2), "order": 0, "parentId": null },
                    { "itemId": Uuid::from_u128(3), "order": 1, "parentId": Uuid::from_u128(2) }
                ]
            }
        }))
        .expect("operation should deserialize");

        let MenuOperation::ReorderItems { payload, .. } = operation else {
            panic!("expected reorder_items operation");
        };
        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[1].parent_id.map(|id| id.0), Some(Uuid::from_u128(2)));
    }
}
