//! Wire types of the handover service
//!
//! These mirror the server's JSON. Fields the CLI does not show are kept
//! so that the types document the full responses.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverStatus {
    PendingHod,
    PendingFaculty,
    Approved,
    Rejected,
}

impl HandoverStatus {
    pub fn label(&self) -> &'static str {
        match self {
            HandoverStatus::PendingHod => "pending HOD",
            HandoverStatus::PendingFaculty => "pending receiver",
            HandoverStatus::Approved => "approved",
            HandoverStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    Human,
    AutoBypass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub decision: Decision,
    pub kind: ApprovalKind,
    pub approver_id: Option<String>,
    pub date: DateTime<Utc>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    #[allow(dead_code)]
    pub id: Uuid,
    #[allow(dead_code)]
    pub employee_id: String,
    pub name: String,
    pub designation: String,
    #[allow(dead_code)]
    pub department: String,
}

/// A handover with its derived status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handover {
    pub id: Uuid,
    #[allow(dead_code)]
    pub sender_id: Uuid,
    pub department: String,
    pub receiver: Receiver,
    pub reason: String,
    pub handover_start_date: NaiveDate,
    pub handover_end_date: NaiveDate,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
    pub remarks: Option<String>,
    pub hod_approval: Option<ApprovalRecord>,
    pub faculty_approval: Option<ApprovalRecord>,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
    pub status: HandoverStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedHandover {
    #[serde(flatten)]
    pub handover: Handover,
    pub actionable: bool,
}

/// Response of `GET /handovers`
#[derive(Debug, Clone, Deserialize)]
pub struct HandoverView {
    pub sent: Vec<Handover>,
    pub received: Vec<ReceivedHandover>,
}

/// Body of `POST /handovers`
#[derive(Debug, Clone, Serialize)]
pub struct CreateHandover {
    pub receiver_id: Uuid,
    pub receiver_designation: String,
    pub receiver_department: String,
    pub reason: String,
    pub handover_start_date: NaiveDate,
    pub handover_end_date: NaiveDate,
    pub documents: Vec<String>,
    pub assets: Vec<String>,
    pub pending_tasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Body of the decision endpoints
#[derive(Debug, Clone, Serialize)]
pub struct DecisionBody {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Error body returned by the server
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub field_errors: BTreeMap<String, String>,
}

/// Token claims understood by the server
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub sub: Uuid,
    pub employee_id: String,
    pub role: String,
    pub department: String,
    pub first_name: String,
    pub last_name: String,
    pub exp: i64,
    pub iat: i64,
}

/// Messages on the event feed
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Connected {
        identity_id: Uuid,
    },
    HandoverCreated {
        handover: Handover,
    },
    HandoverDecided {
        stage: String,
        decision: Decision,
        handover: Handover,
    },
    Lagged {
        missed: u64,
    },
}
