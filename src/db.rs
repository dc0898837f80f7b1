use crate::config::Config;
use crate::models::NewAchievement;
use crate::schema::achievements;
use anyhow::Result;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_async::{
    pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use deadpool::Runtime;
use serde_json::json;
use tracing::info;

pub type DbPool = deadpool::managed::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type DbConnection = deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;
pub type DbPoolError =
    deadpool::managed::PoolError<diesel_async::pooled_connection::PoolError>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database manager for the API
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database manager with connection pool
    pub async fn new() -> Result<Self> {
        let config = Config::get();
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database.url);

        // Configure pool with connection parameters
        let pool = DbPool::builder(manager)
            .max_size(config.database.max_connections as usize)
            .runtime(Runtime::Tokio1)
            .build()?;

        // Create database instance
        let db = Self { pool };

        // Test connection, run migrations and seed baseline rows
        db.initialize().await?;

        Ok(db)
    }

    /// Initialize the database by testing connection and running migrations
    async fn initialize(&self) -> Result<()> {
        // Test connection by getting a connection from the pool
        let _conn = self.get_connection().await?;
        info!("Successfully connected to the database");

        // Run migrations
        self.run_migrations()?;

        // Seed the baseline achievement definitions
        let mut conn = self.get_connection().await?;
        seed_achievements(&mut conn).await?;

        Ok(())
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let config = Config::get();
        let mut conn = PgConnection::establish(&config.database.url)?;

        // Apply migrations
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        info!("Database migrations applied successfully");

        Ok(())
    }

    /// Get a database connection from the pool
    pub async fn get_connection(&self) -> Result<DbConnection, DbPoolError> {
        self.pool.get().await
    }

    /// Get the database connection pool reference
    pub fn get_pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Insert the built-in achievement definitions if they are missing.
/// Safe to run on every startup.
pub async fn seed_achievements(conn: &mut AsyncPgConnection) -> Result<()> {
    let baseline = vec![
        NewAchievement {
            key: "early_access".to_string(),
            title: "Early Access".to_string(),
            description: Some("Joined during the early-access period".to_string()),
            icon_url: None,
            condition: None,
        },
        NewAchievement {
            key: "first_story".to_string(),
            title: "First Story".to_string(),
            description: Some("Published a first story".to_string()),
            icon_url: None,
            condition: Some(json!({"type": "story_count", "value": 1})),
        },
        NewAchievement {
            key: "storyteller".to_string(),
            title: "Storyteller".to_string(),
            description: Some("Published ten stories".to_string()),
            icon_url: None,
            condition: Some(json!({"type": "story_count", "value": 10})),
        },
    ];

    let inserted = diesel::insert_into(achievements::table)
        .values(&baseline)
        .on_conflict(achievements::key)
        .do_nothing()
        .execute(conn)
        .await?;

    if inserted > 0 {
        info!("Seeded {} achievement definitions", inserted);
    }

    Ok(())
}

/// Initialize database connection pool and run migrations
pub async fn init_database() -> Result<Database> {
    Database::new().await
}
