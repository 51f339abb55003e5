use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tokio::sync::Mutex;
use tracing::info;

use telemetry_domain::ports::{EventRangeSource, EventRepository};
use telemetry_domain::utils::{current_millis, millis_to_utc};
use telemetry_domain::{
    DbConfig, PersistError, PlayerActivity, PlayerEvent, ServerEvent, ServerPerformance, TimeRange,
};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS player_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_id TEXT NOT NULL,
        server_id TEXT NOT NULL,
        action TEXT NOT NULL,
        score INTEGER NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        trace_id TEXT NOT NULL UNIQUE,
        date_created_ms INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_player_events_date_created
        ON player_events (date_created_ms)",
    "CREATE TABLE IF NOT EXISTS server_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id TEXT NOT NULL,
        uptime INTEGER NOT NULL,
        cpu_usage REAL NOT NULL,
        memory_usage REAL NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        trace_id TEXT NOT NULL UNIQUE,
        date_created_ms INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_server_events_date_created
        ON server_events (date_created_ms)",
];

#[derive(FromRow)]
struct PlayerRow {
    id: i64,
    player_id: String,
    server_id: String,
    action: String,
    score: i64,
    timestamp_ms: i64,
    trace_id: String,
    date_created_ms: i64,
}

impl From<PlayerRow> for PlayerEvent {
    fn from(row: PlayerRow) -> Self {
        PlayerEvent {
            id: row.id,
            player_id: row.player_id,
            server_id: row.server_id,
            action: row.action,
            score: row.score,
            timestamp: millis_to_utc(row.timestamp_ms),
            trace_id: row.trace_id,
            date_created: millis_to_utc(row.date_created_ms),
        }
    }
}

#[derive(FromRow)]
struct ServerRow {
    id: i64,
    server_id: String,
    uptime: i64,
    cpu_usage: f64,
    memory_usage: f64,
    timestamp_ms: i64,
    trace_id: String,
    date_created_ms: i64,
}

impl From<ServerRow> for ServerEvent {
    fn from(row: ServerRow) -> Self {
        ServerEvent {
            id: row.id,
            server_id: row.server_id,
            uptime: row.uptime,
            cpu_usage: row.cpu_usage,
            memory_usage: row.memory_usage,
            timestamp: millis_to_utc(row.timestamp_ms),
            trace_id: row.trace_id,
            date_created: millis_to_utc(row.date_created_ms),
        }
    }
}

fn classify(err: sqlx::Error, trace_id: &str) -> PersistError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return PersistError::Duplicate {
                trace_id: trace_id.to_string(),
            };
        }
    }
    PersistError::Transient(anyhow::Error::from(err))
}

fn transient(err: sqlx::Error) -> PersistError {
    PersistError::Transient(anyhow::Error::from(err))
}

/// Write transaction opened with `BEGIN IMMEDIATE`, so the database write lock
/// is held before anything inside it runs. A connection dropped while the
/// transaction is still open is closed rather than returned to the pool.
struct ImmediateTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl ImmediateTx {
    async fn begin(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    fn connection(&mut self) -> Result<&mut SqliteConnection, sqlx::Error> {
        self.conn.as_deref_mut().ok_or(sqlx::Error::PoolClosed)
    }

    async fn commit(mut self) -> Result<(), sqlx::Error> {
        sqlx::query("COMMIT").execute(self.connection()?).await?;
        self.conn = None;
        Ok(())
    }

    async fn rollback(mut self) {
        let rolled_back = match self.connection() {
            Ok(conn) => sqlx::query("ROLLBACK").execute(conn).await.is_ok(),
            Err(_) => false,
        };
        if rolled_back {
            self.conn = None;
        }
    }
}

impl Drop for ImmediateTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

/// Events in SQLite.
///
/// `date_created` must order rows by visibility: a range read ending at `t`
/// may not miss a row that commits later with a stamp below `t`. Inserts
/// stamp only after taking the database write lock and hold `stamp_gate` from
/// stamp to commit; range reads pass through the gate first, so every row
/// stamped before the read started is already committed.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
    stamp_gate: Arc<Mutex<()>>,
}

impl SqliteEventStore {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await
            .with_context(|| format!("failed to open database {}", config.database_url))?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            stamp_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the new row id and its `date_created` in epoch millis.
    async fn insert_stamped<'q, B>(
        &self,
        trace_id: &str,
        build: B,
    ) -> Result<(i64, i64), PersistError>
    where
        B: FnOnce(i64) -> Query<'q, Sqlite, SqliteArguments<'q>> + Send,
    {
        let mut tx = ImmediateTx::begin(&self.pool).await.map_err(transient)?;
        let _stamping = self.stamp_gate.lock().await;
        let date_created_ms = current_millis();
        let inserted = match tx.connection() {
            Ok(conn) => build(date_created_ms).execute(conn).await,
            Err(err) => Err(err),
        };
        let id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(err) => {
                tx.rollback().await;
                return Err(classify(err, trace_id));
            }
        };
        tx.commit().await.map_err(transient)?;
        Ok((id, date_created_ms))
    }

    async fn settle(&self) {
        drop(self.stamp_gate.lock().await);
    }
}

#[async_trait]
impl EventRangeSource for SqliteEventStore {
    async fn fetch_player_events(&self, range: TimeRange) -> Result<Vec<PlayerEvent>> {
        self.settle().await;
        let rows: Vec<PlayerRow> = sqlx::query_as(
            "SELECT id, player_id, server_id, action, score, timestamp_ms, trace_id, date_created_ms
             FROM player_events
             WHERE date_created_ms >= ? AND date_created_ms < ?
             ORDER BY date_created_ms, id",
        )
        .bind(range.start.timestamp_millis())
        .bind(range.end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PlayerEvent::from).collect())
    }

    async fn fetch_server_events(&self, range: TimeRange) -> Result<Vec<ServerEvent>> {
        self.settle().await;
        let rows: Vec<ServerRow> = sqlx::query_as(
            "SELECT id, server_id, uptime, cpu_usage, memory_usage, timestamp_ms, trace_id, date_created_ms
             FROM server_events
             WHERE date_created_ms >= ? AND date_created_ms < ?
             ORDER BY date_created_ms, id",
        )
        .bind(range.start.timestamp_millis())
        .bind(range.end.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ServerEvent::from).collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EventRepository for SqliteEventStore {
    async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("event tables ready");
        Ok(())
    }

    async fn insert_player_event(&self, event: &PlayerActivity) -> Result<PlayerEvent, PersistError> {
        let (id, date_created_ms) = self
            .insert_stamped(&event.trace_id, |date_created_ms| {
                sqlx::query(
                    "INSERT INTO player_events
                        (player_id, server_id, action, score, timestamp_ms, trace_id, date_created_ms)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&event.player_id)
                .bind(&event.server_id)
                .bind(&event.action)
                .bind(event.score)
                .bind(event.timestamp.timestamp_millis())
                .bind(&event.trace_id)
                .bind(date_created_ms)
            })
            .await?;

        Ok(PlayerEvent {
            id,
            player_id: event.player_id.clone(),
            server_id: event.server_id.clone(),
            action: event.action.clone(),
            score: event.score,
            timestamp: millis_to_utc(event.timestamp.timestamp_millis()),
            trace_id: event.trace_id.clone(),
            date_created: millis_to_utc(date_created_ms),
        })
    }

    async fn insert_server_event(
        &self,
        event: &ServerPerformance,
    ) -> Result<ServerEvent, PersistError> {
        let (id, date_created_ms) = self
            .insert_stamped(&event.trace_id, |date_created_ms| {
                sqlx::query(
                    "INSERT INTO server_events
                        (server_id, uptime, cpu_usage, memory_usage, timestamp_ms, trace_id, date_created_ms)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&event.server_id)
                .bind(event.uptime)
                .bind(event.cpu_usage)
                .bind(event.memory_usage)
                .bind(event.timestamp.timestamp_millis())
                .bind(&event.trace_id)
                .bind(date_created_ms)
            })
            .await?;

        Ok(ServerEvent {
            id,
            server_id: event.server_id.clone(),
            uptime: event.uptime,
            cpu_usage: event.cpu_usage,
            memory_usage: event.memory_usage,
            timestamp: millis_to_utc(event.timestamp.timestamp_millis()),
            trace_id: event.trace_id.clone(),
            date_created: millis_to_utc(date_created_ms),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    async fn store() -> SqliteEventStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("memory db");
        let store = SqliteEventStore::from_pool(pool);
        store.ensure_schema().await.expect("schema");
        store
    }

    fn player(trace_id: &str, score: i64) -> PlayerActivity {
        PlayerActivity {
            player_id: "p-1".to_string(),
            server_id: "s-1".to_string(),
            action: "kill".to_string(),
            score,
            timestamp: Utc::now(),
            trace_id: trace_id.to_string(),
        }
    }

    fn server(trace_id: &str, cpu_usage: f64) -> ServerPerformance {
        ServerPerformance {
            server_id: "s-1".to_string(),
            uptime: 3600,
            cpu_usage,
            memory_usage: 2048.0,
            timestamp: Utc::now(),
            trace_id: trace_id.to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_trace_id_is_rejected_without_second_row() {
        let store = store().await;
        let first = store.insert_player_event(&player("t-1", 5)).await.expect("insert");
        let err = store
            .insert_player_event(&player("t-1", 99))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, PersistError::Duplicate { ref trace_id } if trace_id == "t-1"));

        let window = TimeRange::new(first.date_created - Duration::seconds(1), Utc::now() + Duration::seconds(1));
        let rows = store.fetch_player_events(window).await.expect("fetch");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 5);
    }

    #[tokio::test]
    async fn trace_ids_are_unique_per_table() {
        let store = store().await;
        store.insert_player_event(&player("shared", 1)).await.expect("player");
        store.insert_server_event(&server("shared", 1.0)).await.expect("server");
    }

    #[tokio::test]
    async fn range_is_half_open_on_date_created() {
        let store = store().await;
        let row = store.insert_server_event(&server("t-s", 42.5)).await.expect("insert");

        let ending_at_row = TimeRange::new(row.date_created - Duration::seconds(10), row.date_created);
        assert!(store.fetch_server_events(ending_at_row).await.expect("fetch").is_empty());

        let starting_at_row = TimeRange::new(row.date_created, row.date_created + Duration::milliseconds(1));
        let rows = store.fetch_server_events(starting_at_row).await.expect("fetch");
        assert_eq!(rows, vec![row]);
    }

    #[tokio::test]
    async fn ping_answers_on_open_pool() {
        store().await.ping().await.expect("ping");
    }
}
