//! SQLite persistence for users, sessions and analysis logs.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::models::{AnalysisLog, AnalysisLogWithOwner, UserRecord};

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Handle over the connection pool; cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to database: {}", database_url);
        let mut options = SqlitePoolOptions::new().max_connections(5);
        if database_url.contains(":memory:") {
            // Every connection to an in-memory URL opens a fresh database, so pin one forever.
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = options
            .connect(database_url)
            .await
            .with_context(|| format!("failed to connect to {database_url}"))?;
        Ok(Self { pool })
    }

    /// In-memory database with the schema already created.
    pub async fn in_memory() -> Result<Self> {
        let db = Self::connect("sqlite::memory:").await?;
        db.init_schema().await?;
        Ok(db)
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        info!("Ensuring database schema...");
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS analysis_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                filename TEXT NOT NULL,
                upload_time TEXT NOT NULL,
                risk_score REAL NOT NULL,
                highlights TEXT NOT NULL DEFAULT ''
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_analysis_logs_user ON analysis_logs(user_id, upload_time)",
            "CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at)",
        ];
        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Schema ready");
        Ok(())
    }

    // ---- users ----

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES (?, ?, ?)
            RETURNING id, username, email, password_hash, is_admin
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, email, password_hash, is_admin FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>, sqlx::Error> {
        sqlx::query_as("SELECT id, username, email, password_hash, is_admin FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Grant admin rights; returns `false` when no user has that email.
    pub async fn set_admin(&self, email: &str, is_admin: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_admin = ? WHERE email = ?")
            .bind(is_admin)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- sessions ----

    pub async fn create_session(
        &self,
        token_hash: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(token_hash)
            .bind(user_id)
            .bind(timestamp(expires_at))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// User owning an unexpired session.
    pub async fn find_session_user(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.is_admin
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = ? AND s.expires_at > ?
            "#,
        )
        .bind(token_hash)
        .bind(timestamp(now))
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete_session(&self, token_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ---- analysis logs ----

    pub async fn insert_log(
        &self,
        user_id: i64,
        filename: &str,
        upload_time: DateTime<Utc>,
        risk_score: f64,
        highlights: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO analysis_logs (user_id, filename, upload_time, risk_score, highlights)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(filename)
        .bind(timestamp(upload_time))
        .bind(risk_score)
        .bind(highlights)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_log(&self, id: i64) -> Result<Option<AnalysisLog>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, user_id, filename, upload_time, risk_score, highlights
            FROM analysis_logs
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// A user's logs, newest first.
    pub async fn logs_for_user(&self, user_id: i64) -> Result<Vec<AnalysisLog>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT id, user_id, filename, upload_time, risk_score, highlights
            FROM analysis_logs
            WHERE user_id = ?
            ORDER BY upload_time DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Every log with its owner's username, newest first.
    pub async fn all_logs(&self) -> Result<Vec<AnalysisLogWithOwner>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT l.id, l.user_id, l.filename, l.upload_time, l.risk_score, l.highlights,
                   u.username
            FROM analysis_logs l
            JOIN users u ON u.id = l.user_id
            ORDER BY l.upload_time DESC, l.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn delete_log(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM analysis_logs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn db_with_user() -> (Database, UserRecord) {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .create_user("alice", "alice@example.com", "hash")
            .await
            .unwrap();
        (db, user)
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.init_schema().await.expect("second run should succeed");
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let (db, _) = db_with_user().await;
        let err = db
            .create_user("alice2", "alice@example.com", "hash")
            .await
            .expect_err("email must be unique");
        let unique = matches!(&err, sqlx::Error::Database(e) if e.is_unique_violation());
        assert!(unique, "unexpected error: {err}");
    }

    #[tokio::test]
    async fn logs_are_listed_newest_first() {
        let (db, user) = db_with_user().await;
        let earlier = Utc::now() - Duration::minutes(5);
        let later = Utc::now();
        db.insert_log(user.id, "old.txt", earlier, 8.3, "a").await.unwrap();
        db.insert_log(user.id, "new.txt", later, 50.0, "b\nc").await.unwrap();

        let logs = db.logs_for_user(user.id).await.unwrap();
        let names: Vec<_> = logs.iter().map(|l| l.filename.as_str()).collect();
        assert_eq!(names, vec!["new.txt", "old.txt"]);
        assert_eq!(logs[0].highlights, "b\nc");

        let all = db.all_logs().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].username, "alice");
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let (db, user) = db_with_user().await;
        let now = Utc::now();
        db.create_session("live", user.id, now + Duration::hours(1))
            .await
            .unwrap();
        db.create_session("stale", user.id, now - Duration::hours(1))
            .await
            .unwrap();

        assert!(db.find_session_user("live", now).await.unwrap().is_some());
        assert!(db.find_session_user("stale", now).await.unwrap().is_none());
        assert_eq!(db.purge_expired_sessions(now).await.unwrap(), 1);

        db.delete_session("live").await.unwrap();
        assert!(db.find_session_user("live", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_admin_reports_missing_user() {
        let (db, _) = db_with_user().await;
        assert!(db.set_admin("alice@example.com", true).await.unwrap());
        assert!(!db.set_admin("nobody@example.com", true).await.unwrap());
        let users = db.list_users().await.unwrap();
        assert!(users[0].is_admin);
    }
}
