use crate::schema::{Tally, VoteSummary};
use crate::store::{StoreError, VoteStore};
use async_trait::async_trait;
use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed store. Statements run on the blocking pool, one at a time.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        init(&conn)?;
        Ok(Self::wrap(conn))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    async fn with_conn<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            work(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS vote_summaries (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          congress TEXT NOT NULL,
          congress_year TEXT NOT NULL,
          issue TEXT NOT NULL,
          session TEXT NOT NULL,
          title TEXT NOT NULL,
          vote_number TEXT NOT NULL,
          vote_date TEXT NOT NULL,
          url TEXT NOT NULL,
          inserted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );

        CREATE INDEX IF NOT EXISTS idx_vote_summaries_url ON vote_summaries(url);

        CREATE TABLE IF NOT EXISTS tallies (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          issue TEXT NOT NULL,
          name TEXT NOT NULL,
          party TEXT NOT NULL,
          state TEXT NOT NULL,
          title TEXT NOT NULL,
          vote_cast TEXT NOT NULL,
          inserted_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tallies_name ON tallies(name);
        "#,
    )?;
    Ok(())
}

const SUMMARY_COLUMNS: &str =
    "congress, congress_year, issue, session, title, vote_number, vote_date, url";

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<VoteSummary> {
    Ok(VoteSummary {
        congress: row.get(0)?,
        congress_year: row.get(1)?,
        issue: row.get(2)?,
        session: row.get(3)?,
        title: row.get(4)?,
        vote_number: row.get(5)?,
        vote_date: row.get(6)?,
        url: row.get(7)?,
    })
}

fn tally_from_row(row: &Row<'_>) -> rusqlite::Result<Tally> {
    Ok(Tally {
        issue: row.get(0)?,
        name: row.get(1)?,
        party: row.get(2)?,
        state: row.get(3)?,
        title: row.get(4)?,
        vote_cast: row.get(5)?,
    })
}

fn select_summaries(
    conn: &Connection,
    filter: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<VoteSummary>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM vote_summaries {filter} ORDER BY id"
    ))?;
    let rows = stmt.query_map(args, summary_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[async_trait]
impl VoteStore for SqliteStore {
    async fn find_summaries_by_url(&self, url: &str) -> Result<Vec<VoteSummary>, StoreError> {
        let url = url.to_string();
        self.with_conn(move |conn| select_summaries(conn, "WHERE url = ?1", params![url]))
            .await
    }

    async fn find_all_summaries(&self) -> Result<Vec<VoteSummary>, StoreError> {
        self.with_conn(|conn| select_summaries(conn, "", [])).await
    }

    async fn find_tallies_by_name(&self, name: &str) -> Result<Vec<Tally>, StoreError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT issue, name, party, state, title, vote_cast FROM tallies WHERE name = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![name], tally_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn insert_many_summaries(&self, records: &[VoteSummary]) -> Result<usize, StoreError> {
        let records = records.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO vote_summaries ({SUMMARY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ))?;
                for s in &records {
                    stmt.execute(params![
                        s.congress,
                        s.congress_year,
                        s.issue,
                        s.session,
                        s.title,
                        s.vote_number,
                        s.vote_date,
                        s.url
                    ])?;
                }
            }
            tx.commit()?;
            Ok(records.len())
        })
        .await
    }

    async fn insert_many_tallies(&self, records: &[Tally]) -> Result<usize, StoreError> {
        let records = records.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO tallies (issue, name, party, state, title, vote_cast)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                )?;
                for t in &records {
                    stmt.execute(params![t.issue, t.name, t.party, t.state, t.title, t.vote_cast])?;
                }
            }
            tx.commit()?;
            Ok(records.len())
        })
        .await
    }

    async fn delete_all_summaries(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM vote_summaries", [])?))
            .await
    }

    async fn delete_all_tallies(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM tallies", [])?))
            .await
    }
}
