use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{Affirmation, ListeningSession};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct DbOperations;

impl DbOperations {
    pub fn upsert_affirmation(db: &DatabaseConnection, affirmation: &Affirmation) -> Result<()> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();

        conn.execute(
            "INSERT INTO affirmations (id, title, text, audio_url, word_timings, voice_id, duration_ms, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                text = excluded.text,
                audio_url = excluded.audio_url,
                word_timings = excluded.word_timings,
                voice_id = excluded.voice_id,
                duration_ms = excluded.duration_ms,
                updated_at = excluded.updated_at",
            params![
                affirmation.id,
                affirmation.title,
                affirmation.text,
                affirmation.audio_url,
                affirmation.word_timings,
                affirmation.voice_id,
                affirmation.duration_ms,
                chrono::Utc::now().timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Refresh the local cache from a backend fetch. Returns the number of
    /// records written.
    pub fn upsert_affirmations(
        db: &DatabaseConnection,
        affirmations: &[Affirmation],
    ) -> Result<usize> {
        for affirmation in affirmations {
            Self::upsert_affirmation(db, affirmation)?;
        }
        Ok(affirmations.len())
    }

    pub fn get_affirmation(db: &DatabaseConnection, id: &str) -> Result<Option<Affirmation>> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();

        let affirmation = conn
            .query_row(
                "SELECT id, title, text, audio_url, word_timings, voice_id, duration_ms
                 FROM affirmations WHERE id = ?1",
                params![id],
                Self::row_to_affirmation,
            )
            .optional()?;

        Ok(affirmation)
    }

    pub fn get_all_affirmations(db: &DatabaseConnection) -> Result<Vec<Affirmation>> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, title, text, audio_url, word_timings, voice_id, duration_ms
             FROM affirmations ORDER BY title",
        )?;

        let rows = stmt.query_map([], Self::row_to_affirmation)?;
        let mut affirmations = Vec::new();
        for row in rows {
            affirmations.push(row?);
        }

        Ok(affirmations)
    }

    pub fn clear_affirmations(db: &DatabaseConnection) -> Result<()> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();
        conn.execute("DELETE FROM affirmations", [])?;
        Ok(())
    }

    pub fn record_listening_session(
        db: &DatabaseConnection,
        affirmation_id: &str,
        listened_on: NaiveDate,
        duration_ms: i64,
    ) -> Result<()> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();

        conn.execute(
            "INSERT INTO listening_sessions (affirmation_id, listened_on, duration_ms)
             VALUES (?1, ?2, ?3)",
            params![
                affirmation_id,
                listened_on.format(DATE_FORMAT).to_string(),
                duration_ms,
            ],
        )?;

        Ok(())
    }

    pub fn get_sessions(db: &DatabaseConnection) -> Result<Vec<ListeningSession>> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, affirmation_id, listened_on, duration_ms
             FROM listening_sessions ORDER BY id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ListeningSession {
                id: row.get(0)?,
                affirmation_id: row.get(1)?,
                listened_on: row.get(2)?,
                duration_ms: row.get(3)?,
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }

        Ok(sessions)
    }

    /// Distinct dates with at least one completed listen, newest first.
    /// Rows with unparseable dates are skipped rather than failing the query.
    pub fn listened_dates(db: &DatabaseConnection) -> Result<Vec<NaiveDate>> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT DISTINCT listened_on FROM listening_sessions ORDER BY listened_on DESC",
        )?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut dates = Vec::new();
        for row in rows {
            if let Ok(date) = NaiveDate::parse_from_str(&row?, DATE_FORMAT) {
                dates.push(date);
            }
        }

        Ok(dates)
    }

    pub fn session_count(db: &DatabaseConnection) -> Result<i64> {
        let conn = db.get_connection();
        let conn = conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM listening_sessions", [], |row| {
            row.get(0)
        })?;
        Ok(count)
    }

    fn row_to_affirmation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Affirmation> {
        Ok(Affirmation {
            id: row.get(0)?,
            title: row.get(1)?,
            text: row.get(2)?,
            audio_url: row.get(3)?,
            word_timings: row.get(4)?,
            voice_id: row.get(5)?,
            duration_ms: row.get(6)?,
        })
    }
}
