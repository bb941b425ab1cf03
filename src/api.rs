use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};

use crate::content::ContentRepository;
use crate::db;
use crate::error::{ErrorKind, LibError};
use crate::models::{
    CreateItemsPayload, CreateMenuPayload, ListMenusQuery, MenuId, MenuItemId, MoveItemPayload,
    NewMenuItem, Paged, ReorderItemsPayload, UpdateItemPayload, UpdateMenuPayload,
};

#[derive(Debug)]
pub struct AppError(pub LibError);

impl From<LibError> for AppError {
    fn from(value: LibError) -> Self {
        Self(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.kind {
            ErrorKind::Database => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!(kind = ?self.0.kind, error = %self.0.source, "menu api request failed");
        (status, self.0.public).into_response()
    }
}

pub trait HasPool {
    fn pool(&self) -> Arc<sqlx::PgPool>;
}

/// App state the menu routes run against: a pool plus the content repository
/// that resolves item titles. Identity is the embedding server's concern.
pub trait MenuApp: HasPool + ContentRepository {}

async fn create_menu_handler<S>(
    State(app): State<S>,
    Json(payload): Json<CreateMenuPayload>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let menu = db::create_menu(&app.pool(), payload).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

async fn list_menus_handler<S>(
    State(app): State<S>,
    Query(query): Query<ListMenusQuery>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let (page, limit) = query.pagination();
    let menus = db::list_menus(&app.pool(), page, limit).await?;
    Ok(Json(Paged {
        page,
        limit,
        items: menus,
    }))
}

async fn get_menu_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let menu = db::get_menu(&app.pool(), menu_id).await?;
    Ok(Json(menu))
}

async fn update_menu_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
    Json(payload): Json<UpdateMenuPayload>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let menu = db::update_menu(&app.pool(), menu_id, payload).await?;
    Ok(Json(menu))
}

async fn delete_menu_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    db::delete_menu(&app.pool(), menu_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_items_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let items = db::list_items_flat(&app.pool(), menu_id).await?;
    Ok(Json(items))
}

async fn get_tree_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let roots = db::get_items_tree(&app.pool(), menu_id, &app).await?;
    Ok(Json(roots))
}

async fn validate_menu_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let report = db::validate_menu(&app.pool(), menu_id).await?;
    Ok(Json(report))
}

async fn create_item_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
    Json(item): Json<NewMenuItem>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let item = db::create_item(&app.pool(), menu_id, item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn create_items_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
    Json(payload): Json<CreateItemsPayload>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let items = db::create_items(&app.pool(), menu_id, payload).await?;
    Ok((StatusCode::CREATED, Json(items)))
}

async fn move_item_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
    Json(payload): Json<MoveItemPayload>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let outcome = db::move_item(
        &app.pool(),
        menu_id,
        payload.item_id,
        payload.direction,
        payload.target_id,
    )
    .await?;
    Ok(Json(outcome))
}

async fn reorder_items_handler<S>(
    State(app): State<S>,
    Path(menu_id): Path<MenuId>,
    Json(payload): Json<ReorderItemsPayload>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let outcome = db::reorder_items(&app.pool(), menu_id, payload).await?;
    Ok(Json(outcome))
}

async fn update_item_handler<S>(
    State(app): State<S>,
    Path(item_id): Path<MenuItemId>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    let item = db::update_item(&app.pool(), item_id, payload).await?;
    Ok(Json(item))
}

async fn delete_item_handler<S>(
    State(app): State<S>,
    Path(item_id): Path<MenuItemId>,
) -> Result<impl IntoResponse, AppError>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    db::delete_item(&app.pool(), item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes<S>() -> Router<S>
where
    S: MenuApp + Clone + Send + Sync + 'static,
{
    tracing::info!("Registering route /menu [GET,POST]");
    tracing::info!("Registering route /menu/{{menu_id}} [GET,PUT,DELETE]");
    tracing::info!("Registering route /menu/{{menu_id}}/items [GET,POST]");
    tracing::info!("Registering route /menu/{{menu_id}}/items/batch [POST]");
    tracing::info!("Registering route /menu/{{menu_id}}/tree [GET]");
    tracing::info!("Registering route /menu/{{menu_id}}/validate [GET]");
    tracing::info!("Registering route /menu/{{menu_id}}/move [POST]");
    tracing::info!("Registering route /menu/{{menu_id}}/reorder [POST]");
    tracing::info!("Registering route /item/{{item_id}} [PUT,DELETE]");

    Router::new()
        .route(
            "/menu",
            get(list_menus_handler::<S>).post(create_menu_handler::<S>),
        )
        .route(
            "/menu/{menu_id}",
            get(get_menu_handler::<S>)
                .put(update_menu_handler::<S>)
                .delete(delete_menu_handler::<S>),
        )
        .route(
            "/menu/{menu_id}/items",
            get(list_items_handler::<S>).post(create_item_handler::<S>),
        )
        .route("/menu/{menu_id}/items/batch", post(create_items_handler::<S>))
        .route("/menu/{menu_id}/tree", get(get_tree_handler::<S>))
        .route("/menu/{menu_id}/validate", get(validate_menu_handler::<S>))
        .route("/menu/{menu_id}/move", post(move_item_handler::<S>))
        .route("/menu/{menu_id}/reorder", post(reorder_items_handler::<S>))
        .route(
            "/item/{item_id}",
            put(update_item_handler::<S>).delete(delete_item_handler::<S>),
        )
}
