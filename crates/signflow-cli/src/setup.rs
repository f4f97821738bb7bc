//! Database connection and service wiring

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use signflow_core::{models::ActingUser, AppError, Config};
use signflow_db::{
    AuditRepository, DocumentRepository, ListingRepository, SignatureRepository, UserDirectory,
    UserRepository, MIGRATOR,
};
use signflow_services::{
    create_storage, InboxService, LopdfSignerPageSync, UploadService, WorkflowEngine,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Connect the pool. Migrations are applied separately with [`run_migrations`].
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    tracing::debug!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(config.database_url())
        .await
        .context("Failed to connect to database")?;

    tracing::debug!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}

pub struct App {
    pub config: Config,
    pub pool: PgPool,
    pub engine: WorkflowEngine,
    pub uploads: UploadService,
    pub inbox: InboxService,
    pub users: Arc<UserRepository>,
    pub audit: Arc<AuditRepository>,
}

impl App {
    pub async fn build(config: Config, pool: PgPool) -> Result<Self> {
        let storage = create_storage(&config)
            .await
            .context("Failed to initialize upload storage")?;

        let documents = Arc::new(DocumentRepository::new(pool.clone()));
        let ledger = Arc::new(SignatureRepository::new(pool.clone()));
        let users = Arc::new(UserRepository::new(pool.clone()));
        let audit = Arc::new(AuditRepository::new(pool.clone()));
        let signer_page = Arc::new(LopdfSignerPageSync::new(
            storage.clone(),
            config.signer_page_timezone(),
        ));

        let engine = WorkflowEngine::new(
            documents.clone(),
            ledger.clone(),
            storage.clone(),
            signer_page,
            audit.clone(),
        );
        let uploads = UploadService::new(
            documents.clone(),
            users.clone(),
            storage,
            audit.clone(),
            config.max_upload_size_bytes(),
        );
        let inbox = InboxService::new(
            ListingRepository::new(pool.clone()),
            documents,
            ledger,
            users.clone(),
        );

        Ok(Self {
            config,
            pool,
            engine,
            uploads,
            inbox,
            users,
            audit,
        })
    }

    /// Resolve `--as` into the acting user. Unknown or inactive ids act as nobody.
    pub async fn acting_user(&self, id: Option<Uuid>) -> Result<Option<ActingUser>, AppError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let user = self.users.get_user(id).await?;
        Ok(user.filter(|u| u.is_active).map(|u| u.acting()))
    }
}
