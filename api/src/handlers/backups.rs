//! Backup trigger and download handlers

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use mysql_backup_core::artifact::{resolve_artifact, ArtifactError};
use mysql_backup_core::domain::{BackupRequest, DEFAULT_PORT};
use mysql_backup_core::BackupEngine;

/// Create backup request
#[derive(Debug, Deserialize)]
pub struct CreateBackupRequest {
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: Option<String>,
    pub database: String,
    pub charset: Option<String>,
    pub compress: Option<bool>,
}

/// Create backup response
#[derive(Debug, Serialize)]
pub struct CreateBackupResponse {
    pub artifact: String,
    pub log: String,
    pub download_url: String,
}

impl CreateBackupRequest {
    fn validate(&self) -> ApiResult<()> {
        for (field, value) in [
            ("host", &self.host),
            ("username", &self.username),
            ("database", &self.database),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    /// Engine request targeting the configured backup root
    fn into_backup_request(self, state: &AppState) -> BackupRequest {
        BackupRequest {
            host: self.host,
            port: self.port.unwrap_or(DEFAULT_PORT),
            username: self.username,
            password: self.password.filter(|p| !p.is_empty()),
            database: self.database,
            charset: self
                .charset
                .unwrap_or_else(|| state.config.default_charset.clone()),
            backup_dir: state.config.backup_root.clone(),
            // Downloads are always offered compressed unless asked otherwise
            compress: self.compress.unwrap_or(true),
        }
    }
}

fn download_url(artifact: &str) -> String {
    format!("/api/backups/{}/download", artifact)
}

/// Run a backup and report the artifact name with the progress log
pub async fn create_backup(
    State(state): State<AppState>,
    Json(req): Json<CreateBackupRequest>,
) -> ApiResult<Json<CreateBackupResponse>> {
    req.validate()?;
    let request = req.into_backup_request(&state);
    info!("Backup requested for database {}", request.database);

    let mut engine = BackupEngine::new(state.config.engine_config());
    match engine.run(&request).await {
        Ok(artifact) => Ok(Json(CreateBackupResponse {
            download_url: download_url(&artifact),
            artifact,
            log: engine.log().drain(),
        })),
        Err(e) => {
            error!("Backup of {} failed: {}", request.database, e);
            Err(ApiError::Backup {
                error: e,
                log: engine.log().drain(),
            })
        }
    }
}

/// Stream a finished artifact back to the caller
pub async fn download_backup(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let root = std::path::Path::new(&state.config.backup_root);
    let path = resolve_artifact(root, &name).map_err(|e| match e {
        ArtifactError::InvalidName(_) | ArtifactError::NotFound(_) => {
            ApiError::NotFound(name.clone())
        }
    })?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to open {}: {}", name, e)))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to stat {}: {}", name, e)))?
        .len();

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", name),
        ),
        (header::CONTENT_LENGTH, len.to_string()),
        (header::CACHE_CONTROL, "must-revalidate".to_string()),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
