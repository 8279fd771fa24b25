//! Process-wide state for a host embedding the attendance core.
//!
//! The host calls [`AppState::init`] once before serving requests. It loads
//! configuration, installs logging, opens the database and generates the
//! token signing key. The key lives only in this process, so a restart
//! invalidates every outstanding token.

use std::sync::Arc;

use common::config::Config;
use common::logger::{WorkerGuard, init_logging};
use sea_orm::{DatabaseConnection, DbErr};

use crate::attendance_service::AttendanceService;
use crate::token::TokenCodec;

/// Shared handles cloned into every request handler.
#[derive(Clone)]
pub struct AppState {
    config: &'static Config,
    db: DatabaseConnection,
    attendance: AttendanceService,
}

impl AppState {
    /// Builds state from an already-open connection and a signing key.
    pub fn new(config: &'static Config, db: DatabaseConnection, codec: Arc<TokenCodec>) -> Self {
        let attendance = AttendanceService::with_database(codec, db.clone());
        Self {
            config,
            db,
            attendance,
        }
    }

    /// Full process bootstrap. Hold the returned guard for the lifetime of the
    /// process so buffered log lines are flushed.
    pub async fn init(env_path: &str) -> Result<(Self, WorkerGuard), DbErr> {
        let config = Config::init(env_path);
        let guard = init_logging(&config.log_file, &config.log_level, config.log_to_stdout);

        let db = db::connect(config).await?;
        let codec = TokenCodec::init_process();

        tracing::info!(
            project = %config.project_name,
            token_validity_minutes = config.token_validity_minutes,
            qr_size = config.qr_size,
            "attendance core ready"
        );
        Ok((Self::new(config, db, codec), guard))
    }

    pub fn config(&self) -> &'static Config {
        self.config
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn attendance(&self) -> &AttendanceService {
        &self.attendance
    }
}
