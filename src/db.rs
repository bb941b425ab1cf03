use std::collections::HashSet;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::algorithms;
use crate::content::ContentRepository;
use crate::error::{LibError, Result};
use crate::invariants;
use crate::models::{
    CreateItemsPayload, CreateMenuPayload, Menu, MenuId, MenuItem, MenuItemId, MenuLocation,
    MenuSummary, MenuTreeNode, MenuValidationReport, MoveDirection, MoveOutcome, NewMenuItem,
    ReorderItemsPayload, ReorderOutcome, TargetId, UpdateItemPayload, UpdateMenuPayload,
};
use crate::moves::{self, MovePlan, MoveWrite};

pub static MIGRATOR: Lazy<Migrator> = Lazy::new(|| {
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator
});

pub async fn create_menu_tables(pool: &PgPool) -> std::result::Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[derive(Debug, Clone, FromRow)]
struct MenuRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
struct MenuSummaryRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
    item_count: i64,
}

#[derive(Debug, Clone, FromRow)]
struct MenuItemRow {
    id: Uuid,
    menu_id: Uuid,
    target_id: Uuid,
    label: Option<String>,
    url: Option<String>,
    sort_order: i32,
    parent_id: Option<Uuid>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl From<MenuRow> for Menu {
    fn from(value: MenuRow) -> Self {
        Self {
            id: MenuId(value.id),
            name: value.name,
            location: value
                .location
                .as_deref()
                .and_then(MenuLocation::from_db_value),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<MenuSummaryRow> for MenuSummary {
    fn from(value: MenuSummaryRow) -> Self {
        Self {
            id: MenuId(value.id),
            name: value.name,
            location: value
                .location
                .as_deref()
                .and_then(MenuLocation::from_db_value),
            created_at: value.created_at,
            updated_at: value.updated_at,
            item_count: value.item_count,
        }
    }
}

impl From<MenuItemRow> for MenuItem {
    fn from(value: MenuItemRow) -> Self {
        Self {
            id: MenuItemId(value.id),
            menu_id: MenuId(value.menu_id),
            target_id: TargetId(value.target_id),
            label: value.label,
            url: value.url,
            order: value.sort_order,
            parent_id: value.parent_id.map(MenuItemId),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

fn db_err(public: &'static str, err: sqlx::Error) -> LibError {
    LibError::database(public, anyhow!(err))
}

async fn load_menu(pool: &PgPool, menu_id: MenuId) -> Result<Menu> {
    let row = sqlx::query_as::<_, MenuRow>(
        r#"
        SELECT id, name, location, created_at, updated_at
        FROM menu.menus
        WHERE id = $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(menu_id.0)
    .fetch_optional(pool)
    .await
    .map_err(|err| db_err("Failed to query menu", err))?;

    row.map(Menu::from).ok_or_else(|| {
        LibError::not_found("Menu not found", anyhow!("menu {} not found", menu_id))
    })
}

async fn load_item(pool: &PgPool, item_id: MenuItemId) -> Result<MenuItem> {
    let row = sqlx::query_as::<_, MenuItemRow>(
        r#"
        SELECT id, menu_id, target_id, label, url, sort_order, parent_id, created_at, updated_at
        FROM menu.menu_items
        WHERE id = $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(item_id.0)
    .fetch_optional(pool)
    .await
    .map_err(|err| db_err("Failed to query menu item", err))?;

    row.map(MenuItem::from).ok_or_else(|| {
        LibError::not_found(
            "Menu item not found",
            anyhow!("menu item {} not found", item_id),
        )
    })
}

pub async fn create_menu(pool: &PgPool, payload: CreateMenuPayload) -> Result<Menu> {
    let definition = payload.normalize()?;
    let menu_id = MenuId(Uuid::new_v4());

    sqlx::query(
        r#"
        INSERT INTO menu.menus (id, name, location)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(menu_id.0)
    .bind(&definition.name)
    .bind(definition.location.map(MenuLocation::as_db_value))
    .execute(pool)
    .await
    .map_err(|err| db_err("Failed to create menu", err))?;

    load_menu(pool, menu_id).await
}

pub async fn get_menu(pool: &PgPool, menu_id: MenuId) -> Result<Menu> {
    load_menu(pool, menu_id).await
}

pub async fn list_menus(pool: &PgPool, page: u32, limit: u32) -> Result<Vec<MenuSummary>> {
    let offset = (page.saturating_sub(1) as i64).saturating_mul(limit as i64);

    let rows = sqlx::query_as::<_, MenuSummaryRow>(
        r#"
        SELECT
            m.id,
            m.name,
            m.location,
            m.created_at,
            m.updated_at,
            COALESCE(i.item_count, 0) AS item_count
        FROM menu.menus m
        LEFT JOIN (
            SELECT menu_id, COUNT(*)::bigint AS item_count
            FROM menu.menu_items
            WHERE deleted_at IS NULL
            GROUP BY menu_id
        ) i
        ON i.menu_id = m.id
        WHERE m.deleted_at IS NULL
        ORDER BY m.updated_at DESC, m.id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit as i64)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|err| db_err("Failed to list menus", err))?;

    Ok(rows.into_iter().map(MenuSummary::from).collect())
}

pub async fn update_menu(
    pool: &PgPool,
    menu_id: MenuId,
    payload: UpdateMenuPayload,
) -> Result<Menu> {
    let definition = payload.normalize()?;
    let _menu = load_menu(pool, menu_id).await?;

    sqlx::query(
        r#"
        UPDATE menu.menus
        SET name = $1,
            location = $2,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $3
          AND deleted_at IS NULL
        "#,
    )
    .bind(&definition.name)
    .bind(definition.location.map(MenuLocation::as_db_value))
    .bind(menu_id.0)
    .execute(pool)
    .await
    .map_err(|err| db_err("Failed to update menu", err))?;

    load_menu(pool, menu_id).await
}

/// Soft-deletes a menu and cascades the soft-delete to all of its live items
/// in one transaction.
pub async fn delete_menu(pool: &PgPool, menu_id: MenuId) -> Result<()> {
    let _menu = load_menu(pool, menu_id).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| db_err("Failed to start transaction", err))?;

    sqlx::query(
        r#"
        UPDATE menu.menus
        SET deleted_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(menu_id.0)
    .execute(&mut *tx)
    .await
    .map_err(|err| db_err("Failed to delete menu", err))?;

    sqlx::query(
        r#"
        UPDATE menu.menu_items
        SET deleted_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE menu_id = $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(menu_id.0)
    .execute(&mut *tx)
    .await
    .map_err(|err| db_err("Failed to delete menu items", err))?;

    tx.commit()
        .await
        .map_err(|err| db_err("Failed to commit transaction", err))?;

    Ok(())
}

/// Live items of a menu in document order: `sort_order`, then creation time,
/// then id as the tie-breakers.
pub async fn list_items_flat(pool: &PgPool, menu_id: MenuId) -> Result<Vec<MenuItem>> {
    let _menu = load_menu(pool, menu_id).await?;

    let rows = sqlx::query_as::<_, MenuItemRow>(
        r#"
        SELECT id, menu_id, target_id, label, url, sort_order, parent_id, created_at, updated_at
        FROM menu.menu_items
        WHERE menu_id = $1
          AND deleted_at IS NULL
        ORDER BY sort_order ASC, created_at ASC, id ASC
        "#,
    )
    .bind(menu_id.0)
    .fetch_all(pool)
    .await
    .map_err(|err| db_err("Failed to query menu items", err))?;

    Ok(rows.into_iter().map(MenuItem::from).collect())
}

pub async fn get_items_tree<C>(
    pool: &PgPool,
    menu_id: MenuId,
    content: &C,
) -> Result<Vec<MenuTreeNode>>
where
    C: ContentRepository,
{
    let items = list_items_flat(pool, menu_id).await?;

    let targets: Vec<TargetId> = items
        .iter()
        .map(|item| item.target_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let titles = content.titles_for(&targets).await?;

    Ok(algorithms::build_tree(&items, &titles))
}

async fn ensure_parent_in_menu(
    pool: &PgPool,
    menu_id: MenuId,
    parent_id: MenuItemId,
) -> Result<()> {
    let exists: (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1
            FROM menu.menu_items
            WHERE id = $1
              AND menu_id = $2
              AND deleted_at IS NULL
        )
        "#,
    )
    .bind(parent_id.0)
    .bind(menu_id.0)
    .fetch_one(pool)
    .await
    .map_err(|err| db_err("Failed to query parent item", err))?;

    if exists.0 {
        Ok(())
    } else {
        Err(LibError::invalid_with_code(
            "cross_menu_parent",
            "Parent item does not belong to this menu",
            anyhow!("parent {} is not a live item of menu {}", parent_id, menu_id),
        ))
    }
}

async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    menu_id: MenuId,
    item: &NewMenuItem,
) -> Result<MenuItemId> {
    let item_id = MenuItemId(Uuid::new_v4());

    sqlx::query(
        r#"
        INSERT INTO menu.menu_items (id, menu_id, target_id, label, url, sort_order, parent_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(item_id.0)
    .bind(menu_id.0)
    .bind(item.target_id.0)
    .bind(&item.label)
    .bind(&item.url)
    .bind(item.order)
    .bind(item.parent_id.map(|parent_id| parent_id.0))
    .execute(&mut **tx)
    .await
    .map_err(|err| db_err("Failed to create menu item", err))?;

    Ok(item_id)
}

pub async fn create_item(pool: &PgPool, menu_id: MenuId, item: NewMenuItem) -> Result<MenuItem> {
    let created = create_items(
        pool,
        menu_id,
        CreateItemsPayload { items: vec![item] },
    )
    .await?;
    created
        .into_iter()
        .next()
        .ok_or_else(|| LibError::message("Menu item creation returned no rows"))
}

/// Batch insert ("add N pages to this menu") in one transaction. Parents must
/// already be live items of the menu; batch entries cannot reference each
/// other since their ids are assigned here.
pub async fn create_items(
    pool: &PgPool,
    menu_id: MenuId,
    payload: CreateItemsPayload,
) -> Result<Vec<MenuItem>> {
    let _menu = load_menu(pool, menu_id).await?;

    let items: Vec<NewMenuItem> = payload
        .items
        .into_iter()
        .map(NewMenuItem::normalize)
        .collect();
    for item in &items {
        if let Some(parent_id) = item.parent_id {
            ensure_parent_in_menu(pool, menu_id, parent_id).await?;
        }
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| db_err("Failed to start transaction", err))?;

    let mut created_ids = Vec::with_capacity(items.len());
    for item in &items {
        created_ids.push(insert_item(&mut tx, menu_id, item).await?);
    }

    tx.commit()
        .await
        .map_err(|err| db_err("Failed to commit transaction", err))?;

    let mut created = Vec::with_capacity(created_ids.len());
    for item_id in created_ids {
        created.push(load_item(pool, item_id).await?);
    }
    Ok(created)
}

/// Replaces the editable fields of one item. A parent change is validated
/// against the whole menu (same-menu parent, no cycle) before the write.
pub async fn update_item(
    pool: &PgPool,
    item_id: MenuItemId,
    payload: UpdateItemPayload,
) -> Result<MenuItem> {
    let payload = payload.normalize();
    let existing = load_item(pool, item_id).await?;

    if payload.parent_id != existing.parent_id {
        let mut candidate = list_items_flat(pool, existing.menu_id).await?;
        if let Some(item) = candidate.iter_mut().find(|item| item.id == item_id) {
            item.parent_id = payload.parent_id;
            item.order = payload.order;
        }
        invariants::ensure_menu_hierarchy(&candidate)?;
    }

    sqlx::query(
        r#"
        UPDATE menu.menu_items
        SET label = $1,
            url = $2,
            sort_order = $3,
            parent_id = $4,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $5
          AND deleted_at IS NULL
        "#,
    )
    .bind(&payload.label)
    .bind(&payload.url)
    .bind(payload.order)
    .bind(payload.parent_id.map(|parent_id| parent_id.0))
    .bind(item_id.0)
    .execute(pool)
    .await
    .map_err(|err| db_err("Failed to update menu item", err))?;

    load_item(pool, item_id).await
}

async fn apply_writes(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    menu_id: MenuId,
    writes: &[MoveWrite],
) -> Result<()> {
    for write in writes {
        sqlx::query(
            r#"
            UPDATE menu.menu_items
            SET sort_order = $1,
                parent_id = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
              AND menu_id = $4
              AND deleted_at IS NULL
            "#,
        )
        .bind(write.order)
        .bind(write.parent_id.map(|parent_id| parent_id.0))
        .bind(write.item_id.0)
        .bind(menu_id.0)
        .execute(&mut **tx)
        .await
        .map_err(|err| db_err("Failed to write menu item position", err))?;
    }

    Ok(())
}

/// Plans and persists one semantic move. Both halves of a sibling swap land
/// in the same transaction.
pub async fn move_item(
    pool: &PgPool,
    menu_id: MenuId,
    item_id: MenuItemId,
    direction: MoveDirection,
    target_id: Option<MenuItemId>,
) -> Result<MoveOutcome> {
    let items = list_items_flat(pool, menu_id).await?;

    let plan = moves::plan_move(&items, item_id, direction, target_id)?;
    let writes = match plan {
        MovePlan::NoOp => return Ok(MoveOutcome::NoOp),
        MovePlan::Writes(writes) => writes,
    };

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| db_err("Failed to start transaction", err))?;
    apply_writes(&mut tx, menu_id, &writes).await?;
    tx.commit()
        .await
        .map_err(|err| db_err("Failed to commit transaction", err))?;

    let item = load_item(pool, item_id).await?;
    Ok(MoveOutcome::Moved { item })
}

/// Persists a client-supplied full ordering. The candidate final state is
/// validated for same-menu parents and acyclicity before any row is touched;
/// a violation rejects the whole batch.
pub async fn reorder_items(
    pool: &PgPool,
    menu_id: MenuId,
    payload: ReorderItemsPayload,
) -> Result<ReorderOutcome> {
    let items = list_items_flat(pool, menu_id).await?;

    let plan = moves::plan_reorder(&items, &payload.items)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| db_err("Failed to start transaction", err))?;
    apply_writes(&mut tx, menu_id, &plan.writes).await?;
    tx.commit()
        .await
        .map_err(|err| db_err("Failed to commit transaction", err))?;

    Ok(ReorderOutcome {
        updated: plan.writes.len(),
        skipped: plan.skipped,
    })
}

/// Soft-deletes one item and re-parents its direct children to root in the
/// same transaction. The children keep their own `order` values.
pub async fn delete_item(pool: &PgPool, item_id: MenuItemId) -> Result<()> {
    let item = load_item(pool, item_id).await?;
    let items = list_items_flat(pool, item.menu_id).await?;
    let writes = moves::plan_delete(&items, item_id);

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| db_err("Failed to start transaction", err))?;

    sqlx::query(
        r#"
        UPDATE menu.menu_items
        SET deleted_at = CURRENT_TIMESTAMP,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $1
          AND deleted_at IS NULL
        "#,
    )
    .bind(item_id.0)
    .execute(&mut *tx)
    .await
    .map_err(|err| db_err("Failed to delete menu item", err))?;

    apply_writes(&mut tx, item.menu_id, &writes).await?;

    tx.commit()
        .await
        .map_err(|err| db_err("Failed to commit transaction", err))?;

    Ok(())
}

pub async fn validate_menu(pool: &PgPool, menu_id: MenuId) -> Result<MenuValidationReport> {
    let items = list_items_flat(pool, menu_id).await?;
    Ok(invariants::validate_menu(&items))
}
