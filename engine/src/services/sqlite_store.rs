//! Durable SQLite store for patterns, insights, feedback and the corpus
//!
//! One connection behind a mutex; every call runs on the blocking pool so
//! SQLite I/O never stalls the async runtime. Every multi-row write runs in a
//! transaction that is rolled back on the first failure, so a failed learning
//! cycle leaves the previous state untouched.

use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use shared::{
    component_debug, ComponentId, ContentRecord, FeedbackAggregates, Insight, Pattern, PerformanceFeedback,
    TrackedContent, VariantAggregate,
};

use crate::error::{to_storage_err, EngineError, EngineResult};
use crate::traits::{FeedbackStore, PatternQuery, PatternStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS patterns (
        id              TEXT PRIMARY KEY,
        category        TEXT NOT NULL,
        pattern_key     TEXT NOT NULL,
        descriptor      TEXT NOT NULL,
        avg_engagement  REAL NOT NULL,
        sample_size     INTEGER NOT NULL,
        domains         TEXT NOT NULL,
        confidence      REAL NOT NULL,
        discovered_at   TEXT NOT NULL,
        last_used       TEXT,
        usage_count     INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_patterns_category ON patterns(category);

    CREATE TABLE IF NOT EXISTS insights (
        id                  TEXT PRIMARY KEY,
        kind                TEXT NOT NULL,
        description         TEXT NOT NULL,
        recommendation      TEXT NOT NULL,
        impact_score        REAL NOT NULL,
        evidence_strength   REAL NOT NULL,
        applicable_domains  TEXT NOT NULL,
        created_at          TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_insights_created_at ON insights(created_at);

    CREATE TABLE IF NOT EXISTS performance_feedback (
        content_id            TEXT PRIMARY KEY,
        variant_type          TEXT NOT NULL,
        actual_engagement     REAL NOT NULL,
        predicted_engagement  REAL NOT NULL,
        prediction_error      REAL NOT NULL,
        tier                  TEXT NOT NULL,
        audience_signals      TEXT NOT NULL,
        content_features      TEXT NOT NULL,
        recorded_at           TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS content_corpus (
        row_id           INTEGER PRIMARY KEY AUTOINCREMENT,
        content_id       TEXT UNIQUE,
        text             TEXT NOT NULL,
        engagement_rate  REAL NOT NULL,
        variant_type     TEXT NOT NULL,
        domains          TEXT NOT NULL,
        recorded_at      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tracked_content (
        tracking_id  TEXT PRIMARY KEY,
        topic        TEXT NOT NULL,
        domains      TEXT NOT NULL,
        variants     TEXT NOT NULL,
        created_at   TEXT NOT NULL
    );
";

const PATTERN_COLUMNS: &str = "id, category, pattern_key, descriptor, avg_engagement, sample_size, domains, confidence, \
     discovered_at, last_used, usage_count";

const INSIGHT_COLUMNS: &str =
    "id, kind, description, recommendation, impact_score, evidence_strength, applicable_domains, created_at";

const FEEDBACK_COLUMNS: &str = "content_id, variant_type, actual_engagement, predicted_engagement, prediction_error, \
     tier, audience_signals, content_features, recorded_at";

fn timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> EngineResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn storage_err(operation: &str, message: impl Display) -> EngineError {
    EngineError::Storage {
        operation: operation.to_string(),
        message: message.to_string(),
    }
}

fn conversion_error(index: usize, message: impl Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.to_string().into())
}

fn parsed<T>(row: &Row<'_>, index: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.get(index)?;
    raw.parse().map_err(|e| conversion_error(index, e))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(index, e))
}

fn time_column(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, e))
}

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<Pattern> {
    let last_used: Option<String> = row.get(9)?;
    let usage_count: i64 = row.get(10)?;
    Ok(Pattern {
        id: row.get(0)?,
        category: parsed(row, 1)?,
        key: row.get(2)?,
        descriptor: row.get(3)?,
        avg_engagement: row.get(4)?,
        sample_size: row.get(5)?,
        domains: json_column(row, 6)?,
        confidence: row.get(7)?,
        discovered_at: time_column(row, 8)?,
        last_used: match last_used {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(&raw)
                    .map(|time| time.with_timezone(&Utc))
                    .map_err(|e| conversion_error(9, e))?,
            ),
            None => None,
        },
        usage_count: usage_count.max(0) as u64,
    })
}

fn insight_from_row(row: &Row<'_>) -> rusqlite::Result<Insight> {
    Ok(Insight {
        id: row.get(0)?,
        kind: parsed(row, 1)?,
        description: row.get(2)?,
        recommendation: row.get(3)?,
        impact_score: row.get(4)?,
        evidence_strength: row.get(5)?,
        applicable_domains: json_column(row, 6)?,
        created_at: time_column(row, 7)?,
    })
}

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<PerformanceFeedback> {
    Ok(PerformanceFeedback {
        content_id: row.get(0)?,
        variant_type: row.get(1)?,
        actual_engagement: row.get(2)?,
        predicted_engagement: row.get(3)?,
        prediction_error: row.get(4)?,
        tier: parsed(row, 5)?,
        audience_signals: json_column(row, 6)?,
        content_features: json_column(row, 7)?,
        recorded_at: time_column(row, 8)?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ContentRecord> {
    Ok(ContentRecord {
        content_id: row.get(0)?,
        text: row.get(1)?,
        engagement_rate: row.get(2)?,
        variant_type: row.get(3)?,
        domains: json_column(row, 4)?,
        timestamp: time_column(row, 5)?,
    })
}

/// Insert a pattern or refresh its learned statistics, keeping usage history
fn write_pattern(conn: &Connection, pattern: &Pattern) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO patterns (id, category, pattern_key, descriptor, avg_engagement, sample_size, domains, confidence,
                               discovered_at, last_used, usage_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
             category = excluded.category,
             pattern_key = excluded.pattern_key,
             descriptor = excluded.descriptor,
             avg_engagement = excluded.avg_engagement,
             sample_size = excluded.sample_size,
             domains = excluded.domains,
             confidence = excluded.confidence,
             discovered_at = excluded.discovered_at",
        params![
            pattern.id,
            pattern.category.as_str(),
            pattern.key,
            pattern.descriptor,
            pattern.avg_engagement,
            pattern.sample_size,
            to_json(&pattern.domains)?,
            pattern.confidence,
            timestamp(&pattern.discovered_at),
            pattern.last_used.as_ref().map(timestamp),
            pattern.usage_count as i64,
        ],
    )
    .map_err(to_storage_err("upsert_pattern"))?;
    Ok(())
}

fn write_insight(conn: &Connection, insight: &Insight) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO insights (id, kind, description, recommendation, impact_score, evidence_strength,
                               applicable_domains, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
             kind = excluded.kind,
             description = excluded.description,
             recommendation = excluded.recommendation,
             impact_score = excluded.impact_score,
             evidence_strength = excluded.evidence_strength,
             applicable_domains = excluded.applicable_domains,
             created_at = excluded.created_at",
        params![
            insight.id,
            insight.kind.as_str(),
            insight.description,
            insight.recommendation,
            insight.impact_score,
            insight.evidence_strength,
            to_json(&insight.applicable_domains)?,
            timestamp(&insight.created_at),
        ],
    )
    .map_err(to_storage_err("upsert_insight"))?;
    Ok(())
}

fn write_record(conn: &Connection, record: &ContentRecord) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO content_corpus (content_id, text, engagement_rate, variant_type, domains, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(content_id) DO UPDATE SET
             text = excluded.text,
             engagement_rate = excluded.engagement_rate,
             variant_type = excluded.variant_type,
             domains = excluded.domains,
             recorded_at = excluded.recorded_at",
        params![
            record.content_id,
            record.text,
            record.engagement_rate,
            record.variant_type,
            to_json(&record.domains)?,
            timestamp(&record.timestamp),
        ],
    )
    .map_err(to_storage_err("append_records"))?;
    Ok(())
}

fn write_feedback(conn: &Connection, feedback: &PerformanceFeedback) -> EngineResult<()> {
    let sql = format!(
        "INSERT INTO performance_feedback ({FEEDBACK_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(content_id) DO UPDATE SET
             variant_type = excluded.variant_type,
             actual_engagement = excluded.actual_engagement,
             predicted_engagement = excluded.predicted_engagement,
             prediction_error = excluded.prediction_error,
             tier = excluded.tier,
             audience_signals = excluded.audience_signals,
             content_features = excluded.content_features,
             recorded_at = excluded.recorded_at"
    );
    conn.execute(
        &sql,
        params![
            feedback.content_id,
            feedback.variant_type,
            feedback.actual_engagement,
            feedback.predicted_engagement,
            feedback.prediction_error,
            feedback.tier.as_str(),
            to_json(&feedback.audience_signals)?,
            to_json(&feedback.content_features)?,
            timestamp(&feedback.recorded_at),
        ],
    )
    .map_err(to_storage_err("upsert_feedback"))?;
    Ok(())
}

/// Run `body` inside a transaction, rolling back if it fails
fn in_transaction<T>(
    conn: &Connection,
    operation: &str,
    body: impl FnOnce(&Connection) -> EngineResult<T>,
) -> EngineResult<T> {
    let tx = conn.unchecked_transaction().map_err(to_storage_err(operation))?;
    match body(&tx) {
        Ok(value) => {
            tx.commit().map_err(to_storage_err(operation))?;
            Ok(value)
        }
        Err(error) => {
            let _ = tx.rollback();
            Err(error)
        }
    }
}

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file, creating parent directories
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(to_storage_err("open"))?;
        component_debug!(ComponentId::PatternStore, path = %path.display(), "Opened SQLite store");
        Self::initialize(conn)
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory().map_err(to_storage_err("open_in_memory"))?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> EngineResult<Self> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
            ",
        )
        .map_err(to_storage_err("apply_pragmas"))?;
        conn.execute_batch(SCHEMA).map_err(to_storage_err("create_schema"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `body` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, operation: &'static str, body: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> EngineResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| storage_err(operation, "connection mutex poisoned"))?;
            body(&*guard)
        })
        .await
        .map_err(|e| storage_err(operation, e))?
    }

    /// Current journal mode, `wal` for file databases
    pub async fn journal_mode(&self) -> EngineResult<String> {
        self.with_conn("journal_mode", |conn| {
            conn.pragma_query_value(None, "journal_mode", |row| row.get(0))
                .map_err(to_storage_err("journal_mode"))
        })
        .await
    }

    /// Close the connection, flushing the WAL
    pub fn close(self) -> EngineResult<()> {
        let conn = Arc::try_unwrap(self.conn).map_err(|_| storage_err("close", "connection still in use"))?;
        conn.into_inner()
            .map_err(|_| storage_err("close", "connection mutex poisoned"))?
            .close()
            .map_err(|(_, e)| to_storage_err("close")(e))
    }
}

#[async_trait]
impl PatternStore for SqliteStore {
    async fn upsert_pattern(&self, pattern: &Pattern) -> EngineResult<()> {
        let pattern = pattern.clone();
        self.with_conn("upsert_pattern", move |conn| write_pattern(conn, &pattern))
            .await
    }

    async fn upsert_insight(&self, insight: &Insight) -> EngineResult<()> {
        let insight = insight.clone();
        self.with_conn("upsert_insight", move |conn| write_insight(conn, &insight))
            .await
    }

    async fn query_patterns(&self, query: &PatternQuery) -> EngineResult<Vec<Pattern>> {
        let query = query.clone();
        self.with_conn("query_patterns", move |conn| {
            let sql = format!(
                "SELECT {PATTERN_COLUMNS} FROM patterns
                 WHERE confidence >= ?1
                   AND (?2 IS NULL OR category = ?2)
                   AND EXISTS (SELECT 1 FROM json_each(patterns.domains) WHERE value IN (?3, 'general'))
                 ORDER BY avg_engagement * confidence DESC, id ASC
                 LIMIT ?4"
            );
            let mut stmt = conn.prepare(&sql).map_err(to_storage_err("query_patterns"))?;
            let rows = stmt
                .query_map(
                    params![
                        query.min_confidence,
                        query.category.map(|c| c.as_str()),
                        query.domain,
                        query.limit as i64,
                    ],
                    pattern_from_row,
                )
                .map_err(to_storage_err("query_patterns"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(to_storage_err("query_patterns"))
        })
        .await
    }

    async fn record_usage(&self, pattern_ids: &[String]) -> EngineResult<()> {
        let pattern_ids = pattern_ids.to_vec();
        let now = timestamp(&Utc::now());
        self.with_conn("record_usage", move |conn| {
            in_transaction(conn, "record_usage", |tx| {
                for id in &pattern_ids {
                    tx.execute(
                        "UPDATE patterns SET usage_count = usage_count + 1, last_used = ?2 WHERE id = ?1",
                        params![id, now],
                    )
                    .map_err(to_storage_err("record_usage"))?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn query_insights(&self, since_days: u32, limit: usize) -> EngineResult<Vec<Insight>> {
        let cutoff = timestamp(&(Utc::now() - Duration::days(i64::from(since_days))));
        self.with_conn("query_insights", move |conn| {
            let sql = format!(
                "SELECT {INSIGHT_COLUMNS} FROM insights
                 WHERE created_at >= ?1
                 ORDER BY impact_score * evidence_strength DESC, id ASC
                 LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql).map_err(to_storage_err("query_insights"))?;
            let rows = stmt
                .query_map(params![cutoff, limit as i64], insight_from_row)
                .map_err(to_storage_err("query_insights"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(to_storage_err("query_insights"))
        })
        .await
    }

    async fn commit_cycle(&self, patterns: &[Pattern], insights: &[Insight]) -> EngineResult<()> {
        let (pattern_count, insight_count) = (patterns.len(), insights.len());
        let patterns = patterns.to_vec();
        let insights = insights.to_vec();
        self.with_conn("commit_cycle", move |conn| {
            in_transaction(conn, "commit_cycle", |tx| {
                for pattern in &patterns {
                    write_pattern(tx, pattern)?;
                }
                for insight in &insights {
                    write_insight(tx, insight)?;
                }
                Ok(())
            })
        })
        .await?;
        component_debug!(
            ComponentId::PatternStore,
            patterns = pattern_count,
            insights = insight_count,
            "Committed learning cycle"
        );
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for SqliteStore {
    async fn upsert_feedback(&self, feedback: &PerformanceFeedback) -> EngineResult<()> {
        let feedback = feedback.clone();
        self.with_conn("upsert_feedback", move |conn| write_feedback(conn, &feedback))
            .await
    }

    async fn get_feedback(&self, content_id: &str) -> EngineResult<Option<PerformanceFeedback>> {
        let content_id = content_id.to_string();
        self.with_conn("get_feedback", move |conn| {
            let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM performance_feedback WHERE content_id = ?1");
            conn.query_row(&sql, params![content_id], feedback_from_row)
                .optional()
                .map_err(to_storage_err("get_feedback"))
        })
        .await
    }

    async fn feedback_aggregates(&self) -> EngineResult<FeedbackAggregates> {
        self.with_conn("feedback_aggregates", |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT variant_type, AVG(actual_engagement), AVG(prediction_error), COUNT(*)
                     FROM performance_feedback GROUP BY variant_type",
                )
                .map_err(to_storage_err("feedback_aggregates"))?;
            let rows = stmt
                .query_map([], |row| {
                    let count: i64 = row.get(3)?;
                    Ok((
                        row.get::<_, String>(0)?,
                        VariantAggregate {
                            mean_actual: row.get(1)?,
                            mean_error: row.get(2)?,
                            sample_count: count.max(0) as u64,
                        },
                    ))
                })
                .map_err(to_storage_err("feedback_aggregates"))?;
            let by_variant: HashMap<String, VariantAggregate> = rows
                .collect::<rusqlite::Result<_>>()
                .map_err(to_storage_err("feedback_aggregates"))?;
            Ok(FeedbackAggregates { by_variant })
        })
        .await
    }

    async fn append_records(&self, records: &[ContentRecord]) -> EngineResult<()> {
        let records = records.to_vec();
        self.with_conn("append_records", move |conn| {
            in_transaction(conn, "append_records", |tx| {
                records.iter().try_for_each(|record| write_record(tx, record))
            })
        })
        .await
    }

    async fn record_outcome(&self, feedback: &PerformanceFeedback, records: &[ContentRecord]) -> EngineResult<()> {
        let feedback = feedback.clone();
        let records = records.to_vec();
        self.with_conn("record_outcome", move |conn| {
            in_transaction(conn, "record_outcome", |tx| {
                write_feedback(tx, &feedback)?;
                records.iter().try_for_each(|record| write_record(tx, record))
            })
        })
        .await
    }

    async fn load_corpus(&self) -> EngineResult<Vec<ContentRecord>> {
        self.with_conn("load_corpus", |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT content_id, text, engagement_rate, variant_type, domains, recorded_at
                     FROM content_corpus ORDER BY row_id ASC",
                )
                .map_err(to_storage_err("load_corpus"))?;
            let rows = stmt
                .query_map([], record_from_row)
                .map_err(to_storage_err("load_corpus"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(to_storage_err("load_corpus"))
        })
        .await
    }

    async fn track_content(&self, tracked: &TrackedContent) -> EngineResult<()> {
        let tracked = tracked.clone();
        self.with_conn("track_content", move |conn| {
            conn.execute(
                "INSERT INTO tracked_content (tracking_id, topic, domains, variants, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(tracking_id) DO UPDATE SET
                     topic = excluded.topic,
                     domains = excluded.domains,
                     variants = excluded.variants,
                     created_at = excluded.created_at",
                params![
                    tracked.tracking_id,
                    tracked.topic,
                    to_json(&tracked.domains)?,
                    to_json(&tracked.variants)?,
                    timestamp(&tracked.created_at),
                ],
            )
            .map_err(to_storage_err("track_content"))?;
            Ok(())
        })
        .await
    }

    async fn tracked_content(&self, tracking_id: &str) -> EngineResult<Option<TrackedContent>> {
        let tracking_id = tracking_id.to_string();
        self.with_conn("tracked_content", move |conn| {
            conn.query_row(
                "SELECT tracking_id, topic, domains, variants, created_at FROM tracked_content WHERE tracking_id = ?1",
                params![tracking_id],
                |row| {
                    Ok(TrackedContent {
                        tracking_id: row.get(0)?,
                        topic: row.get(1)?,
                        domains: json_column(row, 2)?,
                        variants: json_column(row, 3)?,
                        created_at: time_column(row, 4)?,
                    })
                },
            )
            .optional()
            .map_err(to_storage_err("tracked_content"))
        })
        .await
    }
}
