//! Append-only governance store backed by SQLite.
//!
//! Holds the local workflow anchors, the audit trail, the review queue and
//! review decisions. Audit, review-queue and decision rows are insert-only;
//! the schema rejects updates and deletes on them. Entries that belong to the
//! same orchestrator step are written in one transaction.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::domain::{AuditAction, AuditEntry, ReviewDecision, ReviewQueueEntry};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS audit (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workflow_id TEXT NOT NULL REFERENCES workflows(id),
    actor TEXT NOT NULL,
    action TEXT NOT NULL,
    reason TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS review_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workflow_id TEXT NOT NULL REFERENCES workflows(id),
    collaborators TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS review_decisions (
    review_id INTEGER PRIMARY KEY REFERENCES review_queue(id),
    reviewer TEXT NOT NULL,
    verdict TEXT NOT NULL,
    reason TEXT,
    recorded_at TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS audit_no_update BEFORE UPDATE ON audit
BEGIN SELECT RAISE(ABORT, 'audit is append-only'); END;
CREATE TRIGGER IF NOT EXISTS audit_no_delete BEFORE DELETE ON audit
BEGIN SELECT RAISE(ABORT, 'audit is append-only'); END;
CREATE TRIGGER IF NOT EXISTS review_queue_no_update BEFORE UPDATE ON review_queue
BEGIN SELECT RAISE(ABORT, 'review_queue is append-only'); END;
CREATE TRIGGER IF NOT EXISTS review_queue_no_delete BEFORE DELETE ON review_queue
BEGIN SELECT RAISE(ABORT, 'review_queue is append-only'); END;
CREATE TRIGGER IF NOT EXISTS review_decisions_no_update BEFORE UPDATE ON review_decisions
BEGIN SELECT RAISE(ABORT, 'review_decisions is append-only'); END;
CREATE TRIGGER IF NOT EXISTS review_decisions_no_delete BEFORE DELETE ON review_decisions
BEGIN SELECT RAISE(ABORT, 'review_decisions is append-only'); END;
"#;

/// Collaborator list delimiter in `review_queue.collaborators`
const DELIMITER: &str = ",";

/// Errors from the governance store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt {column} value in store: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("Governance store lock poisoned")]
    Poisoned,
}

/// SQLite-backed audit log and review queue
pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Insert the local anchor row for a workflow. Returns `true` if it was new.
    pub fn upsert_workflow(&self, workflow_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT INTO workflows (id) VALUES (?1) ON CONFLICT (id) DO NOTHING",
            params![workflow_id],
        )?;
        Ok(inserted == 1)
    }

    pub fn has_workflow(&self, workflow_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM workflows WHERE id = ?1",
            params![workflow_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Append a single audit entry
    pub fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let conn = self.lock()?;
        insert_audit(&conn, entry)
    }

    /// Record a flagged publish: review-queue entry and flag audit, both or neither.
    /// Returns the review id.
    pub fn record_flag(
        &self,
        review: &ReviewQueueEntry,
        audit: &AuditEntry,
    ) -> Result<i64, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO review_queue (workflow_id, collaborators, recorded_at) VALUES (?1, ?2, ?3)",
            params![
                review.workflow_id,
                join_users(&review.demoted_collaborators),
                review.recorded_at.to_rfc3339()
            ],
        )?;
        let review_id = tx.last_insert_rowid();
        insert_audit(&tx, audit)?;

        tx.commit()?;
        Ok(review_id)
    }

    /// Resolve a review-queue entry together with its audit entry
    pub fn record_decision(
        &self,
        decision: &ReviewDecision,
        audit: &AuditEntry,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO review_decisions (review_id, reviewer, verdict, reason, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                decision.review_id,
                decision.reviewer,
                decision.verdict.as_str(),
                decision.reason,
                decision.recorded_at.to_rfc3339()
            ],
        )?;
        insert_audit(&tx, audit)?;

        tx.commit()?;
        Ok(())
    }

    /// Audit trail of one workflow, oldest first
    pub fn entries_for(&self, workflow_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT workflow_id, actor, action, reason, recorded_at FROM audit
             WHERE workflow_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![workflow_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (workflow_id, actor, action, reason, recorded_at) = row?;
            let action = AuditAction::parse(&action).ok_or(StoreError::Corrupt {
                column: "audit.action",
                value: action,
            })?;
            entries.push(AuditEntry {
                workflow_id,
                actor,
                action,
                reason,
                recorded_at: parse_timestamp(&recorded_at)?,
            });
        }

        Ok(entries)
    }

    /// The unresolved review-queue entry for a workflow, if any
    pub fn pending_review(&self, workflow_id: &str) -> Result<Option<ReviewQueueEntry>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT q.id, q.workflow_id, q.collaborators, q.recorded_at FROM review_queue q
                 LEFT JOIN review_decisions d ON d.review_id = q.id
                 WHERE q.workflow_id = ?1 AND d.review_id IS NULL
                 ORDER BY q.id DESC LIMIT 1",
                params![workflow_id],
                review_row,
            )
            .optional()?;

        row.map(into_review).transpose()
    }

    /// Every unresolved review-queue entry, oldest first
    pub fn pending_reviews(&self) -> Result<Vec<ReviewQueueEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT q.id, q.workflow_id, q.collaborators, q.recorded_at FROM review_queue q
             LEFT JOIN review_decisions d ON d.review_id = q.id
             WHERE d.review_id IS NULL ORDER BY q.id",
        )?;

        let rows = stmt.query_map([], review_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(into_review(row?)?);
        }
        Ok(entries)
    }
}

type ReviewRow = (i64, String, String, String);

fn review_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReviewRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_review((id, workflow_id, collaborators, recorded_at): ReviewRow) -> Result<ReviewQueueEntry, StoreError> {
    Ok(ReviewQueueEntry {
        id: Some(id),
        workflow_id,
        demoted_collaborators: split_users(&collaborators),
        recorded_at: parse_timestamp(&recorded_at)?,
    })
}

fn insert_audit(conn: &Connection, entry: &AuditEntry) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO audit (workflow_id, actor, action, reason, recorded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.workflow_id,
            entry.actor,
            entry.action.as_str(),
            entry.reason,
            entry.recorded_at.to_rfc3339()
        ],
    )?;
    Ok(())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt {
            column: "recorded_at",
            value: value.to_string(),
        })
}

fn join_users(users: &[String]) -> String {
    users.join(DELIMITER)
}

fn split_users(value: &str) -> Vec<String> {
    value
        .split(DELIMITER)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}
