#![deny(warnings)]

//! Read-only access to simulation runs stored in SQLite.
//!
//! Cells are read by their dynamic storage class so that a column declared
//! `INTEGER` but holding text still reaches the coercion layer intact.

use ev_core::{RawCell, RawRunRecord, RunId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Table layout written by the simulator.
pub const GAMES_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    type TEXT NOT NULL,
    params_json TEXT NOT NULL,
    trials INTEGER NOT NULL,
    hits INTEGER NOT NULL,
    hit_rate REAL NOT NULL,
    ev REAL NOT NULL
)";

const DICE_RUNS_QUERY: &str = "SELECT id, created_at, trials, hits, hit_rate, ev, params_json \
     FROM games WHERE type = 'dice' ORDER BY id";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("cannot decode column `{column}`: {source}")]
    Decode {
        column: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// Connection URL for a database file.
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Open an existing database without write access. A missing file is an error.
pub async fn open_read_only(path: &Path) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .create_if_missing(false);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    info!(url = %sqlite_url(path), "opened run store");
    Ok(pool)
}

/// All dice runs in id order.
pub async fn fetch_dice_runs(pool: &SqlitePool) -> Result<Vec<RawRunRecord>, StoreError> {
    let rows = sqlx::query(DICE_RUNS_QUERY).fetch_all(pool).await?;
    debug!(rows = rows.len(), "fetched dice runs");
    rows.iter().map(decode_run).collect()
}

fn decode_run(row: &SqliteRow) -> Result<RawRunRecord, StoreError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|source| StoreError::Decode { column: "id", source })?;
    Ok(RawRunRecord {
        id: RunId(id),
        created_at: cell(row, "created_at")?,
        trials: cell(row, "trials")?,
        hits: cell(row, "hits")?,
        hit_rate: cell(row, "hit_rate")?,
        ev: cell(row, "ev")?,
        params_json: text(cell(row, "params_json")?),
    })
}

fn cell(row: &SqliteRow, column: &'static str) -> Result<RawCell, StoreError> {
    let decode = |source| StoreError::Decode { column, source };
    let value = row.try_get_raw(column).map_err(decode)?;
    if value.is_null() {
        return Ok(RawCell::Null);
    }
    let storage = value.type_info().name().to_string();
    let cell = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => RawCell::Integer(row.try_get(column).map_err(decode)?),
        "REAL" => RawCell::Real(row.try_get(column).map_err(decode)?),
        "TEXT" => RawCell::Text(row.try_get(column).map_err(decode)?),
        _ => RawCell::Blob(row.try_get(column).map_err(decode)?),
    };
    Ok(cell)
}

fn text(cell: RawCell) -> Option<String> {
    match cell {
        RawCell::Null => None,
        RawCell::Text(s) => Some(s),
        RawCell::Integer(v) => Some(v.to_string()),
        RawCell::Real(v) => Some(v.to_string()),
        RawCell::Blob(bytes) => String::from_utf8(bytes).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Executor;

    async fn memory_pool(schema: &str) -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        pool.execute(schema).await.unwrap();
        pool
    }

    #[test]
    fn url_is_sqlite() {
        assert_eq!(sqlite_url(Path::new("data/sim.db")), "sqlite://data/sim.db");
    }

    #[tokio::test]
    async fn reads_only_dice_rows_in_id_order() {
        let pool = memory_pool(GAMES_SCHEMA).await;
        pool.execute(
            "INSERT INTO games(id, type, params_json, trials, hits, hit_rate, ev) VALUES
                (5, 'dice', 'sides=6,bet_on=6,payout=5,seed=1', 100, 17, 0.17, 0.02),
                (2, 'dice', 'sides=6,bet_on=6,payout=5,seed=2', 10, 1, 0.1, -0.4),
                (3, 'roulette', 'seed=1', 10, 1, 0.1, -0.4)",
        )
        .await
        .unwrap();
        let runs = fetch_dice_runs(&pool).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, RunId(2));
        assert_eq!(runs[1].id, RunId(5));
        assert_eq!(runs[1].trials, RawCell::Integer(100));
        assert_eq!(runs[1].ev, RawCell::Real(0.02));
        assert_eq!(
            runs[1].params_json.as_deref(),
            Some("sides=6,bet_on=6,payout=5,seed=1")
        );
        assert!(matches!(runs[1].created_at, RawCell::Text(_)));
    }

    #[tokio::test]
    async fn keeps_heterogeneous_cells() {
        let pool = memory_pool(
            "CREATE TABLE games (id INTEGER PRIMARY KEY, created_at TEXT, type TEXT,
                params_json TEXT, trials, hits, hit_rate, ev)",
        )
        .await;
        pool.execute(
            "INSERT INTO games VALUES
                (1, NULL, 'dice', NULL, 'lots', NULL, NULL, '0.5'),
                (2, '2024-01-01 00:00:00', 'dice', 'seed=3', 20.0, 2, 0.1, X'00')",
        )
        .await
        .unwrap();
        let runs = fetch_dice_runs(&pool).await.unwrap();
        assert_eq!(runs[0].trials, RawCell::Text("lots".into()));
        assert_eq!(runs[0].ev, RawCell::Text("0.5".into()));
        assert_eq!(runs[0].hits, RawCell::Null);
        assert_eq!(runs[0].params_json, None);
        assert_eq!(runs[1].trials, RawCell::Real(20.0));
        assert_eq!(runs[1].ev, RawCell::Blob(vec![0]));
    }

    #[tokio::test]
    async fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_read_only(&dir.path().join("absent.db")).await.unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[tokio::test]
    async fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.db");
        {
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await
                .unwrap();
            pool.execute(GAMES_SCHEMA).await.unwrap();
            pool.execute(
                "INSERT INTO games(type, params_json, trials, hits, hit_rate, ev)
                 VALUES ('dice', 'sides=6,bet_on=6,payout=5,seed=42', 1000, 160, 0.16, -0.04)",
            )
            .await
            .unwrap();
            pool.close().await;
        }
        let pool = open_read_only(&path).await.unwrap();
        let runs = fetch_dice_runs(&pool).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, RunId(1));
        pool.close().await;
    }
}
