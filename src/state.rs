use shared::{Config, TokenService};
use std::sync::Arc;
use tracing::info;

use crate::api::disbursement_voucher::{PgVoucherStore, VoucherStore};
use crate::db::{create_db_pool, run_migrations};
use crate::services::user_directory::{PgUserDirectory, UserDirectory};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub vouchers: Arc<dyn VoucherStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Connects to Postgres and wires the Postgres-backed stores.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = create_db_pool(&config.database)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

        if config.database.run_migrations {
            run_migrations(&pool).await?;
            info!("✅ Database migrations applied");
        }

        let vouchers = Arc::new(PgVoucherStore::new(pool.clone()));
        let users = Arc::new(PgUserDirectory::new(pool));

        Ok(Self::with_services(config, vouchers, users))
    }

    /// State over caller-provided stores.
    pub fn with_services(
        config: Config,
        vouchers: Arc<dyn VoucherStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            tokens: TokenService::new(&config.auth),
            config: Arc::new(config),
            vouchers,
            users,
        }
    }
}
