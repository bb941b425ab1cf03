pub mod algorithms;
#[cfg(feature = "api")]
pub mod api;
pub mod content;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod invariants;
pub mod models;
pub mod moves;
#[cfg(feature = "sqlx")]
pub mod operations;

pub mod prelude {
    pub use crate::algorithms::{build_tree, flatten_tree, resolve_title, sort_flat};
    #[cfg(feature = "api")]
    pub use crate::api::{HasPool, MenuApp};
    pub use crate::content::{ContentRepository, StaticTitles};
    #[cfg(feature = "sqlx")]
    pub use crate::db::{
        create_item, create_items, create_menu, create_menu_tables, delete_item, delete_menu,
        get_items_tree, get_menu, list_items_flat, list_menus, move_item, reorder_items,
        update_item, update_menu, validate_menu,
    };
    pub use crate::error::{ErrorKind, LibError, Result};
    pub use crate::invariants::{ensure_menu_hierarchy, menu_cycle_violations};
    pub use crate::models::{
        CreateItemsPayload, CreateMenuPayload, ListMenusQuery, Menu, MenuId, MenuItem, MenuItemId,
        MenuLocation, MenuSummary, MenuTreeNode, MenuValidationReport, MoveDirection,
        MoveItemPayload, MoveOutcome, NewMenuItem, Paged, ReorderEntry, ReorderItemsPayload,
        ReorderOutcome, TargetId, UpdateItemPayload, UpdateMenuPayload,
    };
    pub use crate::moves::{MovePlan, MoveWrite, plan_move, plan_reorder};
    #[cfg(feature = "sqlx")]
    pub use crate::operations::{MenuOperation, MenuOperationResult, MenuOperations};
}
