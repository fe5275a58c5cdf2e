//! Worker → enforcer wire messages.
//!
//! A [`TaggedMessage`] carries a numeric kind tag and an encoded payload.
//! Structured payloads are JSON. Feedback payloads are opaque to the enforcer
//! and travel behind a fixed 16-byte little-endian header
//! (`query_id: u64`, `rel_op_index: u64`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use qadmit_core::id::{BlockId, OpIndex, PartitionId, QueryId, RelationId, WorkerId};

use crate::error::{ExecError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MessageKind {
    WorkOrderComplete = 1,
    RebuildWorkOrderComplete = 2,
    CatalogRelationNewBlock = 3,
    DataPipeline = 4,
    WorkOrderFeedback = 5,
}

impl MessageKind {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(MessageKind::WorkOrderComplete),
            2 => Some(MessageKind::RebuildWorkOrderComplete),
            3 => Some(MessageKind::CatalogRelationNewBlock),
            4 => Some(MessageKind::DataPipeline),
            5 => Some(MessageKind::WorkOrderFeedback),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::WorkOrderComplete => "WorkOrderComplete",
            MessageKind::RebuildWorkOrderComplete => "RebuildWorkOrderComplete",
            MessageKind::CatalogRelationNewBlock => "CatalogRelationNewBlock",
            MessageKind::DataPipeline => "DataPipeline",
            MessageKind::WorkOrderFeedback => "WorkOrderFeedback",
        }
    }
}

/// Sent when a (normal or rebuild) work order finishes on a worker.
/// Times are microseconds since an arbitrary worker-side epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderCompletion {
    pub query_id: QueryId,
    pub operator_index: OpIndex,
    pub partition_id: PartitionId,
    pub worker_thread_index: WorkerId,
    pub execution_start_time: u64,
    pub execution_end_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRelationNewBlock {
    pub relation_id: RelationId,
    pub block_id: BlockId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_id: Option<PartitionId>,
}

/// A new result block is ready to stream to a downstream operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPipeline {
    pub query_id: QueryId,
    pub operator_index: OpIndex,
    pub block_id: BlockId,
    pub relation_id: RelationId,
    pub partition_id: PartitionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackHeader {
    pub query_id: QueryId,
    pub rel_op_index: OpIndex,
}

pub const FEEDBACK_HEADER_LEN: usize = 16;

/// Operator-defined feedback; the payload is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackMessage {
    pub header: FeedbackHeader,
    pub payload: Vec<u8>,
}

impl FeedbackMessage {
    pub fn new(query_id: QueryId, rel_op_index: OpIndex, payload: Vec<u8>) -> Self {
        Self {
            header: FeedbackHeader {
                query_id,
                rel_op_index,
            },
            payload,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FEEDBACK_HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.header.query_id.get().to_le_bytes());
        out.extend_from_slice(&(self.header.rel_op_index as u64).to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let kind = MessageKind::WorkOrderFeedback.name();
        if bytes.len() < FEEDBACK_HEADER_LEN {
            return Err(ExecError::Decode {
                kind,
                reason: format!(
                    "need at least {FEEDBACK_HEADER_LEN} header bytes, got {}",
                    bytes.len()
                ),
            });
        }
        let (head, payload) = bytes.split_at(FEEDBACK_HEADER_LEN);
        let mut query = [0u8; 8];
        let mut op = [0u8; 8];
        query.copy_from_slice(&head[..8]);
        op.copy_from_slice(&head[8..]);
        let rel_op_index = usize::try_from(u64::from_le_bytes(op)).map_err(|_| ExecError::Decode {
            kind,
            reason: "operator index does not fit in usize".into(),
        })?;
        Ok(Self::new(
            QueryId::new(u64::from_le_bytes(query)),
            rel_op_index,
            payload.to_vec(),
        ))
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    WorkOrderComplete(WorkOrderCompletion),
    RebuildWorkOrderComplete(WorkOrderCompletion),
    CatalogRelationNewBlock(CatalogRelationNewBlock),
    DataPipeline(DataPipeline),
    WorkOrderFeedback(FeedbackMessage),
}

impl InboundMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            InboundMessage::WorkOrderComplete(_) => MessageKind::WorkOrderComplete,
            InboundMessage::RebuildWorkOrderComplete(_) => MessageKind::RebuildWorkOrderComplete,
            InboundMessage::CatalogRelationNewBlock(_) => MessageKind::CatalogRelationNewBlock,
            InboundMessage::DataPipeline(_) => MessageKind::DataPipeline,
            InboundMessage::WorkOrderFeedback(_) => MessageKind::WorkOrderFeedback,
        }
    }

    /// Worker-side encoder.
    pub fn encode(&self) -> Result<TaggedMessage> {
        let kind = self.kind();
        let payload = match self {
            InboundMessage::WorkOrderComplete(p) | InboundMessage::RebuildWorkOrderComplete(p) => {
                encode_json(kind, p)?
            }
            InboundMessage::CatalogRelationNewBlock(p) => encode_json(kind, p)?,
            InboundMessage::DataPipeline(p) => encode_json(kind, p)?,
            InboundMessage::WorkOrderFeedback(m) => m.encode(),
        };
        Ok(TaggedMessage {
            kind: kind.tag(),
            payload,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedMessage {
    pub kind: u32,
    pub payload: Vec<u8>,
}

impl TaggedMessage {
    pub fn new(kind: u32, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    pub fn decode(&self) -> Result<InboundMessage> {
        let kind = MessageKind::from_tag(self.kind).ok_or(ExecError::UnknownMessageKind(self.kind))?;
        Ok(match kind {
            MessageKind::WorkOrderComplete => {
                InboundMessage::WorkOrderComplete(decode_json(kind, &self.payload)?)
            }
            MessageKind::RebuildWorkOrderComplete => {
                InboundMessage::RebuildWorkOrderComplete(decode_json(kind, &self.payload)?)
            }
            MessageKind::CatalogRelationNewBlock => {
                InboundMessage::CatalogRelationNewBlock(decode_json(kind, &self.payload)?)
            }
            MessageKind::DataPipeline => {
                InboundMessage::DataPipeline(decode_json(kind, &self.payload)?)
            }
            MessageKind::WorkOrderFeedback => {
                InboundMessage::WorkOrderFeedback(FeedbackMessage::decode(&self.payload)?)
            }
        })
    }
}

fn encode_json<T: Serialize>(kind: MessageKind, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ExecError::Encode {
        kind: kind.name(),
        reason: e.to_string(),
    })
}

fn decode_json<T: DeserializeOwned>(kind: MessageKind, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| ExecError::Decode {
        kind: kind.name(),
        reason: e.to_string(),
    })
}
