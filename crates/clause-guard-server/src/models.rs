//! Persistence records and request/response bodies.

use chrono::{DateTime, Utc};
use clause_guard_core::RiskBand;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User row as stored, including the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// User as exposed over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

/// Stored analysis; `highlights` holds the sentences joined by `\n`.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisLog {
    pub id: i64,
    pub user_id: i64,
    pub filename: String,
    pub upload_time: DateTime<Utc>,
    pub risk_score: f64,
    pub highlights: String,
}

/// Analysis log joined with its owner's username, for the admin view.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisLogWithOwner {
    #[sqlx(flatten)]
    pub log: AnalysisLog,
    pub username: String,
}

/// Analysis log as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisLogView {
    pub id: i64,
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub filename: String,
    pub upload_time: DateTime<Utc>,
    pub risk_score: f64,
    pub risk_band: RiskBand,
    pub highlights: Vec<String>,
}

impl From<AnalysisLog> for AnalysisLogView {
    fn from(log: AnalysisLog) -> Self {
        let highlights = if log.highlights.is_empty() {
            Vec::new()
        } else {
            log.highlights.split('\n').map(str::to_string).collect()
        };
        Self {
            id: log.id,
            user_id: log.user_id,
            username: None,
            filename: log.filename,
            upload_time: log.upload_time,
            risk_score: log.risk_score,
            risk_band: RiskBand::from_score(log.risk_score),
            highlights,
        }
    }
}

impl From<AnalysisLogWithOwner> for AnalysisLogView {
    fn from(row: AnalysisLogWithOwner) -> Self {
        let mut view = Self::from(row.log);
        view.username = Some(row.username);
        view
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub user: UserProfile,
    pub logs: Vec<AnalysisLogView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminResponse {
    pub users: Vec<UserProfile>,
    pub analyses: Vec<AnalysisLogView>,
}
