//! Handover workflow engine
//!
//! A handover moves `pending_hod -> pending_faculty -> approved | rejected`,
//! with `pending_hod -> rejected` as a shortcut. Requests sent by the principal
//! start in `pending_faculty` with an automatic head approval.
//!
//! Every function here is pure: it inspects a record snapshot and either
//! returns the single approval record to write or says why it cannot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{Identity, Role};
use crate::models::{ApprovalRecord, Decision, HandoverRequest, HandoverStatus, ReceiverSnapshot};

/// The two decision points of a handover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Department head approval
    Head,
    /// Receiving employee acceptance
    Receiver,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Head => "head",
            Stage::Receiver => "receiver",
        }
    }

    /// The stage a status is waiting on, if any
    pub fn awaited_by(status: HandoverStatus) -> Option<Stage> {
        match status {
            HandoverStatus::PendingHod => Some(Stage::Head),
            HandoverStatus::PendingFaculty => Some(Stage::Receiver),
            HandoverStatus::Approved | HandoverStatus::Rejected => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("the {stage} stage is not open, handover is {}", .status.as_str())]
    StageConflict { stage: Stage, status: HandoverStatus },

    #[error("only the HOD of {department} may decide the head stage")]
    NotHeadOfDepartment { department: String },

    #[error("only the designated receiver may decide the receiver stage")]
    NotReceiver,
}

/// How an identity is matched against a receiver snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverMatch {
    /// Canonical receiver id only
    #[default]
    Strict,
    /// Also accept the employee id, or the actor's full name appearing in the
    /// recorded receiver name. For records captured before receiver ids were
    /// reliable.
    Legacy,
}

impl ReceiverMatch {
    pub fn matches(&self, receiver: &ReceiverSnapshot, identity: &Identity) -> bool {
        if receiver.id == identity.id {
            return true;
        }
        match self {
            ReceiverMatch::Strict => false,
            ReceiverMatch::Legacy => {
                if !identity.employee_id.is_empty() && receiver.employee_id == identity.employee_id {
                    return true;
                }
                let full_name = identity.full_name().to_lowercase();
                !full_name.is_empty() && receiver.name.to_lowercase().contains(&full_name)
            }
        }
    }
}

/// A single approval write produced by a successful decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub stage: Stage,
    pub approval: ApprovalRecord,
}

impl Transition {
    /// Status of the record once this transition is written
    pub fn resulting_status(&self, record: &HandoverRequest) -> HandoverStatus {
        match self.stage {
            Stage::Head => HandoverStatus::derive(Some(&self.approval), None),
            Stage::Receiver => {
                HandoverStatus::derive(record.hod_approval.as_ref(), Some(&self.approval))
            }
        }
    }

    /// Write the approval onto an in-memory record
    pub fn apply_to(self, record: &mut HandoverRequest) {
        match self.stage {
            Stage::Head => record.hod_approval = Some(self.approval),
            Stage::Receiver => record.faculty_approval = Some(self.approval),
        }
    }
}

/// Head approval a new request starts with
pub fn initial_head_approval(sender: &Identity, created_at: DateTime<Utc>) -> Option<ApprovalRecord> {
    (sender.role == Role::Principal).then(|| ApprovalRecord::principal_bypass(created_at))
}

/// Head-stage decision. Eligibility is checked before the stage so that a
/// non-head is always told it is not their request.
pub fn decide_head(
    record: &HandoverRequest,
    actor: &Identity,
    decision: Decision,
    remarks: Option<String>,
    now: DateTime<Utc>,
) -> Result<Transition, WorkflowError> {
    if !actor.is_hod_of(&record.department) {
        return Err(WorkflowError::NotHeadOfDepartment {
            department: record.department.clone(),
        });
    }

    let status = record.status();
    if status != HandoverStatus::PendingHod || record.hod_approval.is_some() {
        return Err(WorkflowError::StageConflict {
            stage: Stage::Head,
            status,
        });
    }

    Ok(Transition {
        stage: Stage::Head,
        approval: ApprovalRecord::human(decision, actor.employee_id.clone(), now, remarks),
    })
}

/// Receiver-stage decision. The stage is checked first: acting out of order
/// is a conflict whoever attempts it.
pub fn decide_receiver(
    record: &HandoverRequest,
    actor: &Identity,
    decision: Decision,
    remarks: Option<String>,
    now: DateTime<Utc>,
    receiver_match: ReceiverMatch,
) -> Result<Transition, WorkflowError> {
    let status = record.status();
    if status != HandoverStatus::PendingFaculty || record.faculty_approval.is_some() {
        return Err(WorkflowError::StageConflict {
            stage: Stage::Receiver,
            status,
        });
    }

    if !receiver_match.matches(&record.receiver, actor) {
        return Err(WorkflowError::NotReceiver);
    }

    Ok(Transition {
        stage: Stage::Receiver,
        approval: ApprovalRecord::human(decision, actor.id.to_string(), now, remarks),
    })
}

/// Decide whichever stage the record is currently waiting on
pub fn decide(
    record: &HandoverRequest,
    actor: &Identity,
    decision: Decision,
    remarks: Option<String>,
    now: DateTime<Utc>,
    receiver_match: ReceiverMatch,
) -> Result<Transition, WorkflowError> {
    match Stage::awaited_by(record.status()) {
        Some(Stage::Head) => decide_head(record, actor, decision, remarks, now),
        Some(Stage::Receiver) => {
            decide_receiver(record, actor, decision, remarks, now, receiver_match)
        }
        // Terminal; the receiver stage is the last one that could have been open
        None => Err(WorkflowError::StageConflict {
            stage: Stage::Receiver,
            status: record.status(),
        }),
    }
}
