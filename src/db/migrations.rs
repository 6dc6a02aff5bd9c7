// Database migrations
use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Enable foreign keys
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    // Cached affirmation records from the backend
    conn.execute(
        "CREATE TABLE IF NOT EXISTS affirmations (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            text TEXT NOT NULL,
            audio_url TEXT NOT NULL,
            word_timings TEXT,
            voice_id TEXT,
            duration_ms INTEGER,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    // One row per completed listen; the substrate for streak tracking
    conn.execute(
        "CREATE TABLE IF NOT EXISTS listening_sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            affirmation_id TEXT NOT NULL,
            listened_on TEXT NOT NULL,
            duration_ms INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_date ON listening_sessions(listened_on)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_affirmation ON listening_sessions(affirmation_id)",
        [],
    )?;

    Ok(())
}
