//! Data models for handover requests and their approvals

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Remarks written on a head approval generated for a principal-initiated request
pub const PRINCIPAL_BYPASS_REMARKS: &str = "Automatic HOD approval — Principal privilege";

/// Outcome of a single approval stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            _ => Err(format!("Invalid decision: {}", s)),
        }
    }
}

/// How an approval record came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    /// Decided by a person
    Human,
    /// Head stage resolved at creation because the sender is the principal
    AutoBypass,
}

impl ApprovalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalKind::Human => "human",
            ApprovalKind::AutoBypass => "auto_bypass",
        }
    }
}

impl std::str::FromStr for ApprovalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(ApprovalKind::Human),
            "auto_bypass" => Ok(ApprovalKind::AutoBypass),
            _ => Err(format!("Invalid approval kind: {}", s)),
        }
    }
}

/// A resolved approval stage. Written once, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub decision: Decision,
    pub kind: ApprovalKind,
    /// Who decided; absent for automatic approvals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl ApprovalRecord {
    /// A decision taken by a person
    pub fn human(
        decision: Decision,
        approver_id: impl Into<String>,
        date: DateTime<Utc>,
        remarks: Option<String>,
    ) -> Self {
        Self {
            decision,
            kind: ApprovalKind::Human,
            approver_id: Some(approver_id.into()),
            date,
            remarks,
        }
    }

    /// The head approval a principal gets for free. Always approved, dated at creation.
    pub fn principal_bypass(created_at: DateTime<Utc>) -> Self {
        Self {
            decision: Decision::Approved,
            kind: ApprovalKind::AutoBypass,
            approver_id: None,
            date: created_at,
            remarks: Some(PRINCIPAL_BYPASS_REMARKS.to_string()),
        }
    }

    pub fn is_bypass(&self) -> bool {
        self.kind == ApprovalKind::AutoBypass
    }
}

/// Workflow state of a handover. Always derived, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverStatus {
    /// Waiting for the department head
    PendingHod,
    /// Waiting for the receiving employee
    PendingFaculty,
    Approved,
    Rejected,
}

impl HandoverStatus {
    /// Compute the status from the two approval records
    pub fn derive(hod: Option<&ApprovalRecord>, faculty: Option<&ApprovalRecord>) -> Self {
        let Some(hod) = hod else {
            return HandoverStatus::PendingHod;
        };
        if hod.decision == Decision::Rejected {
            return HandoverStatus::Rejected;
        }
        match faculty {
            None => HandoverStatus::PendingFaculty,
            Some(f) if f.decision == Decision::Approved => HandoverStatus::Approved,
            Some(_) => HandoverStatus::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandoverStatus::PendingHod => "pending_hod",
            HandoverStatus::PendingFaculty => "pending_faculty",
            HandoverStatus::Approved => "approved",
            HandoverStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, HandoverStatus::Approved | HandoverStatus::Rejected)
    }
}

impl std::str::FromStr for HandoverStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_hod" => Ok(HandoverStatus::PendingHod),
            "pending_faculty" => Ok(HandoverStatus::PendingFaculty),
            "approved" => Ok(HandoverStatus::Approved),
            "rejected" => Ok(HandoverStatus::Rejected),
            _ => Err(format!("Invalid handover status: {}", s)),
        }
    }
}

/// Point-in-time copy of the chosen receiver, taken at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverSnapshot {
    pub id: Uuid,
    pub employee_id: String,
    pub name: String,
    pub designation: String,
    pub department: String,
}

/// A charge handover request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    /// Sender's department at creation
    pub department: String,
    pub receiver: ReceiverSnapshot,
    pub reason: String,
    pub handover_start_date: NaiveDate,
    pub handover_end_date: NaiveDate,
    pub documents: Vec<String>,
    pub assets: Vec<String>,
    pub pending_tasks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hod_approval: Option<ApprovalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_approval: Option<ApprovalRecord>,
    pub created_at: DateTime<Utc>,
}

impl HandoverRequest {
    pub fn status(&self) -> HandoverStatus {
        HandoverStatus::derive(self.hod_approval.as_ref(), self.faculty_approval.as_ref())
    }
}

/// A handover as returned to clients, with its derived status
#[derive(Debug, Clone, Serialize)]
pub struct HandoverResponse {
    #[serde(flatten)]
    pub handover: HandoverRequest,
    pub status: HandoverStatus,
}

impl From<HandoverRequest> for HandoverResponse {
    fn from(handover: HandoverRequest) -> Self {
        let status = handover.status();
        Self { handover, status }
    }
}

/// Request to create a new handover. Fields are optional so that missing
/// ones can be reported together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateHandoverRequest {
    pub receiver_id: Option<Uuid>,
    pub receiver_designation: Option<String>,
    pub receiver_department: Option<String>,
    pub reason: Option<String>,
    pub handover_start_date: Option<NaiveDate>,
    pub handover_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub pending_tasks: Vec<String>,
    pub remarks: Option<String>,
}

/// Body of the decision endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
    pub remarks: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn human(decision: Decision) -> ApprovalRecord {
        ApprovalRecord::human(decision, "EMP-1", Utc::now(), None)
    }

    #[test]
    fn test_derive_without_head_approval() {
        assert_eq!(HandoverStatus::derive(None, None), HandoverStatus::PendingHod);
        // A stray receiver decision cannot advance a request past the head stage
        let faculty = human(Decision::Approved);
        assert_eq!(
            HandoverStatus::derive(None, Some(&faculty)),
            HandoverStatus::PendingHod
        );
    }

    #[test]
    fn test_derive_head_rejected_is_terminal() {
        let hod = human(Decision::Rejected);
        assert_eq!(HandoverStatus::derive(Some(&hod), None), HandoverStatus::Rejected);
    }

    #[test]
    fn test_derive_full_lifecycle() {
        let hod = human(Decision::Approved);
        assert_eq!(
            HandoverStatus::derive(Some(&hod), None),
            HandoverStatus::PendingFaculty
        );
        let accepted = human(Decision::Approved);
        assert_eq!(
            HandoverStatus::derive(Some(&hod), Some(&accepted)),
            HandoverStatus::Approved
        );
        let declined = human(Decision::Rejected);
        assert_eq!(
            HandoverStatus::derive(Some(&hod), Some(&declined)),
            HandoverStatus::Rejected
        );
    }

    #[test]
    fn test_principal_bypass_record() {
        let created_at = Utc::now();
        let record = ApprovalRecord::principal_bypass(created_at);
        assert!(record.is_bypass());
        assert_eq!(record.decision, Decision::Approved);
        assert_eq!(record.date, created_at);
        assert!(record.approver_id.is_none());
        assert_eq!(
            record.remarks.as_deref(),
            Some("Automatic HOD approval — Principal privilege")
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            HandoverStatus::PendingHod,
            HandoverStatus::PendingFaculty,
            HandoverStatus::Approved,
            HandoverStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<HandoverStatus>().unwrap(), status);
        }
        assert!("done".parse::<HandoverStatus>().is_err());
    }

    #[test]
    fn test_is_terminal() {
        assert!(!HandoverStatus::PendingHod.is_terminal());
        assert!(!HandoverStatus::PendingFaculty.is_terminal());
        assert!(HandoverStatus::Approved.is_terminal());
        assert!(HandoverStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_decision_request_deserialize() {
        let req: DecisionRequest =
            serde_json::from_str(r#"{"decision": "rejected", "remarks": "not now"}"#).unwrap();
        assert_eq!(req.decision, Decision::Rejected);
        assert_eq!(req.remarks.as_deref(), Some("not now"));

        assert!(serde_json::from_str::<DecisionRequest>(r#"{"decision": "maybe"}"#).is_err());
    }

    #[test]
    fn test_create_request_defaults_lists() {
        let req: CreateHandoverRequest = serde_json::from_str(r#"{"reason": "leave"}"#).unwrap();
        assert!(req.documents.is_empty());
        assert!(req.receiver_id.is_none());
    }
}
