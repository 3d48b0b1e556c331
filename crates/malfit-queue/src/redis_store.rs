//! Redis-backed work queue and job store.
//!
//! Layout:
//! - pending ids live in a list; producers `LPUSH`, workers `BRPOP`, so the
//!   list is FIFO and each pop hands an id to exactly one worker
//! - each job is a hash at `{prefix}{job_id}` with one field per record field

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use malfit_models::{append_capped, JobId, JobRecord, JobResult, JobStatus, JobUpdate, DEFAULT_LANGUAGE};

use crate::error::{QueueError, QueueResult};
use crate::queue::{QueueConfig, WorkQueue};
use crate::store::JobStore;

/// Hash field names.
pub mod fields {
    pub const STATUS: &str = "status";
    pub const PROGRESS: &str = "progress";
    pub const SOURCE_PATH: &str = "sourcePath";
    pub const LANGUAGE: &str = "language";
    pub const DURATION_SEC: &str = "durationSec";
    pub const LOG: &str = "log";
    pub const ERROR: &str = "error";
    pub const RESULT: &str = "result";
    pub const CREATED_AT: &str = "createdAt";
}

/// Extra allowance on top of the BRPOP timeout before the client gives up.
const RESPONSE_GRACE: Duration = Duration::from_secs(2);

async fn connect(client: &redis::Client) -> QueueResult<MultiplexedConnection> {
    client
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| QueueError::connection_failed(e.to_string()))
}

/// Work queue over a Redis list.
pub struct RedisQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisQueue {
    /// Create a new queue client.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Round-trip a PING to verify connectivity.
    pub async fn ping(&self) -> QueueResult<()> {
        let mut conn = connect(&self.client).await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for RedisQueue {
    async fn enqueue(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = connect(&self.client).await?;
        conn.lpush::<_, _, ()>(&self.config.queue_key, job_id.as_str())
            .await
            .map_err(|e| QueueError::enqueue_failed(e.to_string()))?;

        debug!(job_id = %job_id, queue = %self.config.queue_key, "Enqueued job");
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> QueueResult<Option<JobId>> {
        // BRPOP holds the connection for the whole wait, so it gets its own
        // connection with a response timeout longer than the block time.
        let conn_config =
            redis::AsyncConnectionConfig::new().set_response_timeout(timeout + RESPONSE_GRACE);
        let mut conn = self
            .client
            .get_multiplexed_async_connection_with_config(&conn_config)
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        // A zero timeout would block forever.
        let block_secs = timeout.as_secs().max(1);
        let item: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.config.queue_key)
            .arg(block_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::DequeueFailed(e.to_string()))?;

        Ok(item.map(|(_, id)| JobId::from_string(id)))
    }

    async fn len(&self) -> QueueResult<u64> {
        let mut conn = connect(&self.client).await?;
        let len: u64 = conn.llen(&self.config.queue_key).await?;
        Ok(len)
    }
}

/// Job store over one Redis hash per job.
pub struct RedisJobStore {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisJobStore {
    /// Create a new store client.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    async fn require_exists(
        &self,
        conn: &mut MultiplexedConnection,
        job_id: &JobId,
    ) -> QueueResult<String> {
        let key = self.config.job_key(job_id);
        let exists: bool = conn.exists(&key).await?;
        if !exists {
            return Err(QueueError::JobNotFound(job_id.clone()));
        }
        Ok(key)
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(&self, record: &JobRecord) -> QueueResult<()> {
        let mut conn = connect(&self.client).await?;
        let key = self.config.job_key(&record.job_id);

        let exists: bool = conn.exists(&key).await?;
        if exists {
            return Err(QueueError::AlreadyExists(record.job_id.clone()));
        }

        let fields = encode_record(record)?;
        conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;

        debug!(job_id = %record.job_id, "Created job record");
        Ok(())
    }

    async fn set_fields(&self, job_id: &JobId, update: &JobUpdate) -> QueueResult<()> {
        let fields = encode_update(update)?;
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = connect(&self.client).await?;
        let key = self.require_exists(&mut conn, job_id).await?;
        conn.hset_multiple::<_, _, _, ()>(&key, &fields).await?;
        Ok(())
    }

    async fn append_log(&self, job_id: &JobId, line: &str) -> QueueResult<()> {
        let mut conn = connect(&self.client).await?;
        let key = self.require_exists(&mut conn, job_id).await?;

        let current: Option<String> = conn.hget(&key, fields::LOG).await?;
        let log = append_capped(current.as_deref().unwrap_or(""), line, self.config.log_cap);
        conn.hset::<_, _, _, ()>(&key, fields::LOG, log).await?;
        Ok(())
    }

    async fn read(&self, job_id: &JobId) -> QueueResult<Option<JobRecord>> {
        let mut conn = connect(&self.client).await?;
        let map: HashMap<String, String> = conn.hgetall(self.config.job_key(job_id)).await?;
        if map.is_empty() {
            return Ok(None);
        }
        decode_record(job_id, &map).map(Some)
    }
}

/// Encode every field of a fresh record.
pub fn encode_record(record: &JobRecord) -> QueueResult<Vec<(&'static str, String)>> {
    let mut out = vec![
        (fields::STATUS, record.status.as_str().to_string()),
        (fields::PROGRESS, record.progress.to_string()),
        (fields::SOURCE_PATH, record.source_path.to_string_lossy().to_string()),
        (fields::LANGUAGE, record.language.clone()),
        (fields::DURATION_SEC, record.duration_sec.to_string()),
        (fields::LOG, record.log.clone()),
        (fields::CREATED_AT, record.created_at.to_rfc3339()),
    ];
    if let Some(error) = &record.error {
        out.push((fields::ERROR, error.clone()));
    }
    if let Some(result) = &record.result {
        out.push((fields::RESULT, serde_json::to_string(result)?));
    }
    Ok(out)
}

/// Encode only the fields an update sets.
pub fn encode_update(update: &JobUpdate) -> QueueResult<Vec<(&'static str, String)>> {
    let mut out = Vec::new();
    if let Some(status) = update.status {
        out.push((fields::STATUS, status.as_str().to_string()));
    }
    if let Some(progress) = update.progress {
        out.push((fields::PROGRESS, progress.min(100).to_string()));
    }
    if let Some(duration) = update.duration_sec {
        out.push((fields::DURATION_SEC, duration.to_string()));
    }
    if let Some(error) = &update.error {
        out.push((fields::ERROR, error.clone()));
    }
    if let Some(result) = &update.result {
        out.push((fields::RESULT, serde_json::to_string(result)?));
    }
    Ok(out)
}

/// Rebuild a record from its hash fields.
pub fn decode_record(job_id: &JobId, map: &HashMap<String, String>) -> QueueResult<JobRecord> {
    let status = match map.get(fields::STATUS) {
        Some(s) => s.parse::<JobStatus>().map_err(QueueError::serialization)?,
        None => JobStatus::default(),
    };

    let result = match map.get(fields::RESULT) {
        Some(s) => Some(serde_json::from_str::<JobResult>(s)?),
        None => None,
    };

    Ok(JobRecord {
        job_id: job_id.clone(),
        status,
        progress: map
            .get(fields::PROGRESS)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
        source_path: map
            .get(fields::SOURCE_PATH)
            .map(Into::into)
            .unwrap_or_default(),
        language: map
            .get(fields::LANGUAGE)
            .cloned()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        duration_sec: map
            .get(fields::DURATION_SEC)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0),
        log: map.get(fields::LOG).cloned().unwrap_or_default(),
        error: map.get(fields::ERROR).cloned(),
        result,
        created_at: map
            .get(fields::CREATED_AT)
            .and_then(|s| parse_created_at(s))
            .unwrap_or_default(),
    })
}

/// RFC 3339, or plain unix seconds as older records stored them.
fn parse_created_at(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<i64>().ok().and_then(|secs| DateTime::from_timestamp(secs, 0)))
}
