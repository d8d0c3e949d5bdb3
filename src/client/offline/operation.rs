//! # Sync Operations
//!
//! A [`SyncOperation`] describes one deferred mutation: which remote call to
//! replay, the data it needs, when it was created and where it is in its
//! lifecycle. Operations are stored in the queue box as JSON maps:
//!
//! ```json
//! {
//!   "id": "7f8c…",
//!   "type": "createStep",
//!   "payload": { "id": "…", "date": "2024-03-01", "steps": 4200, "recordedAt": "…" },
//!   "timestamp": "2024-03-01T08:00:00Z",
//!   "seq": 12,
//!   "retryCount": 0,
//!   "status": "pending"
//! }
//! ```
//!
//! The payload is a tagged union in memory ([`OperationPayload`]) and an
//! untyped map on disk; [`OperationPayload::decode`] validates it against the
//! stored `type`.

use crate::shared::models::{Goal, StepRecord, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A stored operation record that cannot be turned into a [`SyncOperation`]
/// (or the reverse)
#[derive(Debug, Error)]
pub enum RecordError {
    /// Missing fields, wrong field types, or an unencodable value
    #[error("malformed operation record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The `type` field names no known operation
    #[error("unknown operation type '{0}'")]
    UnknownType(String),

    /// The payload does not fit the operation's type
    #[error("invalid {op_type} payload: {source}")]
    Payload {
        op_type: SyncOperationType,
        #[source]
        source: serde_json::Error,
    },
}

/// Which remote call an operation replays
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SyncOperationType {
    CreateStep,
    UpdateStep,
    CreateGoal,
    UpdateGoal,
    UpdateProfile,
}

impl SyncOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperationType::CreateStep => "createStep",
            SyncOperationType::UpdateStep => "updateStep",
            SyncOperationType::CreateGoal => "createGoal",
            SyncOperationType::UpdateGoal => "updateGoal",
            SyncOperationType::UpdateProfile => "updateProfile",
        }
    }
}

impl fmt::Display for SyncOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    /// Waiting to be claimed
    Pending,
    /// Claimed by a drain, replay not yet resolved
    InProgress,
    /// Terminal: replay failed permanently
    Failed,
    /// Replayed successfully (never persisted, completed operations are removed)
    Completed,
}

impl OperationStatus {
    /// Whether the operation still counts as queued work
    pub fn is_pending(&self) -> bool {
        matches!(self, OperationStatus::Pending | OperationStatus::InProgress)
    }
}

/// Data needed to replay an operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPayload {
    CreateStep(StepRecord),
    UpdateStep(StepRecord),
    CreateGoal(Goal),
    UpdateGoal(Goal),
    UpdateProfile(UserProfile),
}

impl OperationPayload {
    pub fn operation_type(&self) -> SyncOperationType {
        match self {
            OperationPayload::CreateStep(_) => SyncOperationType::CreateStep,
            OperationPayload::UpdateStep(_) => SyncOperationType::UpdateStep,
            OperationPayload::CreateGoal(_) => SyncOperationType::CreateGoal,
            OperationPayload::UpdateGoal(_) => SyncOperationType::UpdateGoal,
            OperationPayload::UpdateProfile(_) => SyncOperationType::UpdateProfile,
        }
    }

    /// Encode the payload as the untyped map stored on disk
    pub fn encode(&self) -> Result<Value, RecordError> {
        let value = match self {
            OperationPayload::CreateStep(record) | OperationPayload::UpdateStep(record) => {
                serde_json::to_value(record)?
            }
            OperationPayload::CreateGoal(goal) | OperationPayload::UpdateGoal(goal) => {
                serde_json::to_value(goal)?
            }
            OperationPayload::UpdateProfile(profile) => serde_json::to_value(profile)?,
        };
        Ok(value)
    }

    /// Decode a stored map for the given operation type
    pub fn decode(op_type: SyncOperationType, payload: Value) -> Result<Self, RecordError> {
        let invalid = |source: serde_json::Error| RecordError::Payload { op_type, source };
        let payload = match op_type {
            SyncOperationType::CreateStep => {
                OperationPayload::CreateStep(serde_json::from_value(payload).map_err(invalid)?)
            }
            SyncOperationType::UpdateStep => {
                OperationPayload::UpdateStep(serde_json::from_value(payload).map_err(invalid)?)
            }
            SyncOperationType::CreateGoal => {
                OperationPayload::CreateGoal(serde_json::from_value(payload).map_err(invalid)?)
            }
            SyncOperationType::UpdateGoal => {
                OperationPayload::UpdateGoal(serde_json::from_value(payload).map_err(invalid)?)
            }
            SyncOperationType::UpdateProfile => {
                OperationPayload::UpdateProfile(serde_json::from_value(payload).map_err(invalid)?)
            }
        };
        Ok(payload)
    }
}

/// One deferred mutation
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOperation {
    /// Caller-assigned id, also the storage key
    pub id: String,
    pub payload: OperationPayload,
    /// Creation time, primary FIFO key
    pub timestamp: DateTime<Utc>,
    /// Queue-assigned sequence number, breaks timestamp ties
    pub seq: u64,
    pub retry_count: u32,
    pub status: OperationStatus,
}

/// On-disk shape of an operation
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationRecord {
    id: String,
    #[serde(rename = "type")]
    op_type: String,
    payload: Value,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    seq: u64,
    #[serde(default)]
    retry_count: u32,
    status: OperationStatus,
}

impl SyncOperation {
    /// A new pending operation created at `timestamp`
    pub fn new(id: impl Into<String>, payload: OperationPayload, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            payload,
            timestamp,
            seq: 0,
            retry_count: 0,
            status: OperationStatus::Pending,
        }
    }

    /// A new pending operation with a random id, created now
    pub fn from_payload(payload: OperationPayload) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), payload, Utc::now())
    }

    pub fn operation_type(&self) -> SyncOperationType {
        self.payload.operation_type()
    }

    /// Copy with `status` replaced
    pub fn with_status(&self, status: OperationStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Copy with `retry_count` replaced
    pub fn with_retry_count(&self, retry_count: u32) -> Self {
        Self {
            retry_count,
            ..self.clone()
        }
    }

    /// Copy with `seq` replaced
    pub fn with_seq(&self, seq: u64) -> Self {
        Self {
            seq,
            ..self.clone()
        }
    }

    /// 1-based number of the next replay attempt
    pub fn attempt(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// FIFO ordering key
    pub fn order_key(&self) -> (DateTime<Utc>, u64, &str) {
        (self.timestamp, self.seq, self.id.as_str())
    }

    /// Encode as the store's map representation
    pub fn to_record(&self) -> Result<Value, RecordError> {
        let record = OperationRecord {
            id: self.id.clone(),
            op_type: self.operation_type().as_str().to_string(),
            payload: self.payload.encode()?,
            timestamp: self.timestamp,
            seq: self.seq,
            retry_count: self.retry_count,
            status: self.status,
        };
        Ok(serde_json::to_value(record)?)
    }

    /// Decode from the store's map representation
    pub fn from_record(value: Value) -> Result<Self, RecordError> {
        let record: OperationRecord = serde_json::from_value(value)?;
        let op_type: SyncOperationType =
            serde_json::from_value(Value::String(record.op_type.clone()))
                .map_err(|_| RecordError::UnknownType(record.op_type.clone()))?;

        Ok(Self {
            id: record.id,
            payload: OperationPayload::decode(op_type, record.payload)?,
            timestamp: record.timestamp,
            seq: record.seq,
            retry_count: record.retry_count,
            status: record.status,
        })
    }
}
