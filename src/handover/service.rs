//! Handover service: creation, listing and decisions
//!
//! Composes the store, the employee directory, the workflow engine and the
//! visibility rules, and broadcasts an event for every change.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::visibility::{self, HandoverView};
use super::workflow::{self, ReceiverMatch, Stage};
use crate::directory::EmployeeDirectory;
use crate::error::{AppError, FieldErrors, Result};
use crate::identity::{Identity, Role};
use crate::models::{
    CreateHandoverRequest, Decision, DecisionRequest, HandoverRequest, HandoverResponse,
    ReceiverSnapshot,
};
use crate::store::{HandoverFilter, Store};

/// Events emitted by the handover service
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandoverEvent {
    /// A handover was submitted
    Created { handover: HandoverResponse },
    /// A stage was decided
    Decided {
        stage: Stage,
        decision: Decision,
        handover: HandoverResponse,
    },
}

impl HandoverEvent {
    pub fn handover(&self) -> &HandoverRequest {
        match self {
            HandoverEvent::Created { handover } | HandoverEvent::Decided { handover, .. } => {
                &handover.handover
            }
        }
    }
}

/// Checked creation payload
#[derive(Debug)]
struct ValidDraft {
    receiver_id: Uuid,
    receiver_designation: String,
    receiver_department: String,
    reason: String,
    handover_start_date: NaiveDate,
    handover_end_date: NaiveDate,
}

fn required_text(fields: &mut FieldErrors, name: &str, value: &Option<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            fields.insert(name.to_string(), "This field is required".to_string());
            None
        }
    }
}

fn required<T: Copy>(fields: &mut FieldErrors, name: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        fields.insert(name.to_string(), "This field is required".to_string());
    }
    value
}

/// Validate a creation payload, reporting every faulty field at once
fn validate(payload: &CreateHandoverRequest, sender: &Identity) -> Result<ValidDraft> {
    let mut fields = FieldErrors::new();

    let receiver_id = required(&mut fields, "receiver_id", payload.receiver_id);
    let receiver_designation =
        required_text(&mut fields, "receiver_designation", &payload.receiver_designation);
    let receiver_department =
        required_text(&mut fields, "receiver_department", &payload.receiver_department);
    let reason = required_text(&mut fields, "reason", &payload.reason);
    let start = required(&mut fields, "handover_start_date", payload.handover_start_date);
    let end = required(&mut fields, "handover_end_date", payload.handover_end_date);

    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            fields.insert(
                "handover_end_date".to_string(),
                "End date must not be before the start date".to_string(),
            );
        }
    }
    if sender.department.trim().is_empty() {
        fields.insert(
            "department".to_string(),
            "Your account has no department, so no head could approve this".to_string(),
        );
    }
    if receiver_id == Some(sender.id) {
        fields.insert(
            "receiver_id".to_string(),
            "A charge cannot be handed over to yourself".to_string(),
        );
    }

    match (
        receiver_id,
        receiver_designation,
        receiver_department,
        reason,
        start,
        end,
    ) {
        (Some(receiver_id), Some(designation), Some(department), Some(reason), Some(start), Some(end))
            if fields.is_empty() =>
        {
            Ok(ValidDraft {
                receiver_id,
                receiver_designation: designation,
                receiver_department: department,
                reason,
                handover_start_date: start,
                handover_end_date: end,
            })
        }
        _ => Err(AppError::Validation {
            message: "Invalid handover request".to_string(),
            fields,
        }),
    }
}

fn clean_remarks(remarks: Option<String>) -> Option<String> {
    remarks
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

/// Service for the handover workflow
pub struct HandoverService {
    store: Store,
    directory: Arc<dyn EmployeeDirectory>,
    receiver_match: ReceiverMatch,
    event_tx: broadcast::Sender<HandoverEvent>,
}

impl HandoverService {
    pub fn new(
        store: Store,
        directory: Arc<dyn EmployeeDirectory>,
        receiver_match: ReceiverMatch,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            store,
            directory,
            receiver_match,
            event_tx,
        }
    }

    pub fn receiver_match(&self) -> ReceiverMatch {
        self.receiver_match
    }

    /// Subscribe to handover events
    pub fn subscribe(&self) -> broadcast::Receiver<HandoverEvent> {
        self.event_tx.subscribe()
    }

    /// Submit a new handover on behalf of `sender`
    pub async fn create(
        &self,
        payload: CreateHandoverRequest,
        sender: &Identity,
    ) -> Result<HandoverResponse> {
        let draft = validate(&payload, sender)?;

        let employee = self
            .directory
            .lookup(draft.receiver_id)
            .await?
            .ok_or_else(|| AppError::invalid_field("receiver_id", "No employee with this id"))?;

        let created_at = Utc::now();
        let handover = HandoverRequest {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            department: sender.department.clone(),
            receiver: ReceiverSnapshot {
                id: employee.id,
                employee_id: employee.employee_id.clone(),
                name: employee.full_name(),
                designation: draft.receiver_designation,
                department: draft.receiver_department,
            },
            reason: draft.reason,
            handover_start_date: draft.handover_start_date,
            handover_end_date: draft.handover_end_date,
            documents: payload.documents,
            assets: payload.assets,
            pending_tasks: payload.pending_tasks,
            remarks: clean_remarks(payload.remarks),
            hod_approval: workflow::initial_head_approval(sender, created_at),
            faculty_approval: None,
            created_at,
        };

        self.store.insert_handover(&handover).await?;

        let response = HandoverResponse::from(handover);
        tracing::info!(
            handover_id = %response.handover.id,
            sender_id = %sender.id,
            receiver_id = %response.handover.receiver.id,
            status = response.status.as_str(),
            "Handover created"
        );

        let _ = self.event_tx.send(HandoverEvent::Created {
            handover: response.clone(),
        });

        Ok(response)
    }

    /// Sent and received handovers of `identity`
    pub async fn list_for(&self, identity: &Identity) -> Result<HandoverView> {
        let filter = match self.receiver_match {
            ReceiverMatch::Strict => HandoverFilter::Involving {
                user_id: identity.id,
                department: (identity.role == Role::Hod).then(|| identity.department.clone()),
            },
            // Legacy matching can hit records by name only, so the resolver needs everything
            ReceiverMatch::Legacy => HandoverFilter::All,
        };

        let records = self.store.list_handovers(&filter).await?;
        Ok(visibility::resolve(records, identity, self.receiver_match))
    }

    /// A single handover, if `identity` may see it
    pub async fn get_for(&self, id: Uuid, identity: &Identity) -> Result<HandoverResponse> {
        let record = self.store.get_handover(id).await?;
        if !visibility::can_view(&record, identity, self.receiver_match) {
            // Same answer as a missing record, so ids cannot be probed
            return Err(AppError::NotFound(format!("Handover {} not found", id)));
        }
        Ok(record.into())
    }

    /// Decide whichever stage is currently open
    pub async fn decide(
        &self,
        id: Uuid,
        actor: &Identity,
        request: DecisionRequest,
    ) -> Result<HandoverResponse> {
        self.apply_decision(id, actor, request, None).await
    }

    /// Decide the head stage
    pub async fn decide_head(
        &self,
        id: Uuid,
        actor: &Identity,
        request: DecisionRequest,
    ) -> Result<HandoverResponse> {
        self.apply_decision(id, actor, request, Some(Stage::Head))
            .await
    }

    /// Decide the receiver stage
    pub async fn decide_receiver(
        &self,
        id: Uuid,
        actor: &Identity,
        request: DecisionRequest,
    ) -> Result<HandoverResponse> {
        self.apply_decision(id, actor, request, Some(Stage::Receiver))
            .await
    }

    async fn apply_decision(
        &self,
        id: Uuid,
        actor: &Identity,
        request: DecisionRequest,
        stage: Option<Stage>,
    ) -> Result<HandoverResponse> {
        let record = self.store.get_handover(id).await?;
        let now = Utc::now();
        let remarks = clean_remarks(request.remarks);

        let outcome = match stage {
            Some(Stage::Head) => workflow::decide_head(&record, actor, request.decision, remarks, now),
            Some(Stage::Receiver) => workflow::decide_receiver(
                &record,
                actor,
                request.decision,
                remarks,
                now,
                self.receiver_match,
            ),
            None => workflow::decide(
                &record,
                actor,
                request.decision,
                remarks,
                now,
                self.receiver_match,
            ),
        };

        let transition = outcome.map_err(|e| {
            tracing::warn!(handover_id = %id, actor_id = %actor.id, "Decision refused: {}", e);
            AppError::from(e)
        })?;

        let status = transition.resulting_status(&record);
        if !self.store.apply_transition(id, &transition, status).await? {
            let current = self.store.get_handover(id).await?;
            tracing::warn!(handover_id = %id, actor_id = %actor.id, "Decision lost to a concurrent one");
            return Err(AppError::StageConflict(format!(
                "the {} stage was decided by someone else, handover is {}",
                transition.stage,
                current.status().as_str()
            )));
        }

        let stage = transition.stage;
        let decision = transition.approval.decision;
        let mut updated = record;
        transition.apply_to(&mut updated);

        let response = HandoverResponse::from(updated);
        tracing::info!(
            handover_id = %id,
            actor_id = %actor.id,
            stage = stage.as_str(),
            decision = decision.as_str(),
            status = response.status.as_str(),
            "Handover stage decided"
        );

        let _ = self.event_tx.send(HandoverEvent::Decided {
            stage,
            decision,
            handover: response.clone(),
        });

        Ok(response)
    }
}
