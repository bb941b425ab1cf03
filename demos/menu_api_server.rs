use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use menu_tree::api::{HasPool, MenuApp};
use menu_tree::content::{ContentRepository, StaticTitles};
use menu_tree::error::Result as MenuResult;
use menu_tree::models::TargetId;

#[derive(Clone)]
struct ExampleApp {
    pool: Arc<PgPool>,
    titles: StaticTitles,
}

impl HasPool for ExampleApp {
    fn pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }
}

impl ContentRepository for ExampleApp {
    fn titles_for(
        &self,
        target_ids: &[TargetId],
    ) -> impl Future<Output = MenuResult<HashMap<TargetId, String>>> + Send {
        self.titles.titles_for(target_ids)
    }
}

impl MenuApp for ExampleApp {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let database_url = env::var("DATABASE_URL")
        .context("DATABASE_URL is required to run demos/menu_api_server.rs")?;
    let bind = env::var("MENU_EXAMPLE_BIND").unwrap_or_else(|_| "127.0.0.1:4020".to_string());
    let bind_addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid MENU_EXAMPLE_BIND '{}'", bind))?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to postgres")?;

    menu_tree::db::create_menu_tables(&pool)
        .await
        .context("failed to run menu migrations")?;

    // Stand-in content repository: a real deployment resolves titles from the
    // CMS page store.
    let mut titles = StaticTitles::default();
    titles.insert(TargetId(Uuid::from_u128(1)), "Home");
    titles.insert(TargetId(Uuid::from_u128(2)), "About");
    titles.insert(TargetId(Uuid::from_u128(3)), "Services");

    let app_state = ExampleApp {
        pool: Arc::new(pool),
        titles,
    };

    let api_v1 = Router::new()
        .route("/healthz", get(health_handler))
        .merge(menu_tree::api::routes::<ExampleApp>());

    let app = Router::new().nest("/api/v1", api_v1).with_state(app_state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", bind_addr))?;

    println!("menu_tree example server listening on http://{}", bind_addr);
    println!("api base path: /api/v1");

    axum::serve(listener, app)
        .await
        .context("example server failed")
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true
    }))
}
