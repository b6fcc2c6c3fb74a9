use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use forum_api::Db;
use structopt::StructOpt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod db;
mod error;
mod extractors;
mod handlers;
mod session;

#[cfg(test)]
mod fuzz;

use error::Error;
use extractors::AppState;
use session::Credentials;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(Debug, StructOpt)]
#[structopt(name = "forum-server", about = "REST backend of the forum")]
struct Opt {
    /// PostgreSQL connection string
    #[structopt(long, env = "DATABASE_URL", default_value = "postgres://localhost/forum")]
    database_url: String,

    /// Secret used to sign session tokens
    #[structopt(
        long,
        env = "JWT_SECRET",
        default_value = "insecure-development-secret",
        hide_env_values = true
    )]
    jwt_secret: String,

    #[structopt(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:5000")]
    listen: SocketAddr,

    /// How long an issued session token stays valid
    #[structopt(long, env = "TOKEN_LIFETIME_HOURS", default_value = "720")]
    token_lifetime_hours: i64,

    #[structopt(long, env = "BCRYPT_COST", default_value = "10")]
    bcrypt_cost: u32,

    /// Keep everything in memory instead of connecting to PostgreSQL
    #[structopt(long)]
    in_memory: bool,
}

pub async fn create_sqlx_pool(db_url: &str) -> anyhow::Result<sqlx::PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(16)
        .connect(db_url)
        .await
        .with_context(|| format!("Error opening database {:?}", db_url))
}

pub fn app(db: Arc<dyn Db>, credentials: Credentials) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/signin", post(handlers::signin))
        .route("/auth/me", get(handlers::me))
        .route(
            "/posts",
            get(handlers::fetch_posts).post(handlers::create_post),
        )
        .route(
            "/posts/:id",
            put(handlers::update_post).delete(handlers::delete_post),
        )
        .route("/posts/:id/upvote", post(handlers::upvote))
        .route("/posts/:id/comments", post(handlers::add_comment))
        .route(
            "/posts/:id/comments/:comment_id",
            delete(handlers::delete_comment),
        )
        .with_state(AppState { db, credentials });
    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = Opt::from_args();

    if opt.jwt_secret == session::DEFAULT_SECRET {
        tracing::warn!("JWT_SECRET is not set, using the insecure development default");
    }
    anyhow::ensure!(
        opt.token_lifetime_hours > 0,
        "token lifetime must be positive, got {} hours",
        opt.token_lifetime_hours
    );
    anyhow::ensure!(
        (4..=31).contains(&opt.bcrypt_cost),
        "bcrypt cost must be between 4 and 31, got {}",
        opt.bcrypt_cost
    );
    let credentials = Credentials::new(
        opt.jwt_secret.as_bytes(),
        chrono::Duration::hours(opt.token_lifetime_hours),
        opt.bcrypt_cost,
    );

    let db: Arc<dyn Db> = match opt.in_memory {
        true => {
            tracing::warn!("running with an in-memory store, all data will be lost on exit");
            Arc::new(forum_memdb::MemDb::new())
        }
        false => {
            let pool = create_sqlx_pool(&opt.database_url).await?;
            MIGRATOR
                .run(&pool)
                .await
                .context("applying database migrations")?;
            Arc::new(db::PgDb::new(pool))
        }
    };

    let app = app(db, credentials);

    tracing::info!(addr = %opt.listen, "listening");
    axum::Server::bind(&opt.listen)
        .serve(app.into_make_service())
        .await
        .context("serving axum webserver")
}
