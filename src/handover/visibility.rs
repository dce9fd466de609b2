//! Who sees which handovers, and which of them they can act on now

use serde::Serialize;

use crate::identity::{Identity, Role};
use crate::models::{HandoverRequest, HandoverResponse, HandoverStatus};

use super::workflow::ReceiverMatch;

/// A handover in someone's inbox
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedHandover {
    #[serde(flatten)]
    pub handover: HandoverResponse,
    /// Whether the viewer is the eligible actor for the stage now open
    pub actionable: bool,
}

/// Everything an identity can see, split into what they sent and what they received
#[derive(Debug, Clone, Default, Serialize)]
pub struct HandoverView {
    pub sent: Vec<HandoverResponse>,
    pub received: Vec<ReceivedHandover>,
}

/// Whether `identity` may see `record` in their received list
pub fn is_received_by(
    record: &HandoverRequest,
    identity: &Identity,
    receiver_match: ReceiverMatch,
) -> bool {
    match identity.role {
        // HODs follow the whole lifecycle of their department's requests
        Role::Hod => record.department == identity.department,
        _ => receiver_match.matches(&record.receiver, identity),
    }
}

/// Whether the stage currently open on `record` is one `identity` decides
pub fn is_actionable_by(
    record: &HandoverRequest,
    identity: &Identity,
    receiver_match: ReceiverMatch,
) -> bool {
    match record.status() {
        HandoverStatus::PendingHod => {
            identity.is_hod_of(&record.department)
                && !record.hod_approval.as_ref().is_some_and(|a| a.is_bypass())
        }
        HandoverStatus::PendingFaculty => {
            record.faculty_approval.is_none()
                && receiver_match.matches(&record.receiver, identity)
        }
        HandoverStatus::Approved | HandoverStatus::Rejected => false,
    }
}

/// Whether `identity` has any business reading `record`. The matched
/// receiver always may, even a head of another department.
pub fn can_view(record: &HandoverRequest, identity: &Identity, receiver_match: ReceiverMatch) -> bool {
    record.sender_id == identity.id
        || receiver_match.matches(&record.receiver, identity)
        || is_received_by(record, identity, receiver_match)
}

/// Split a record set into the sent and received views of one identity.
/// A record sent by the identity never appears in their received list.
pub fn resolve(
    records: impl IntoIterator<Item = HandoverRequest>,
    identity: &Identity,
    receiver_match: ReceiverMatch,
) -> HandoverView {
    let mut view = HandoverView::default();

    for record in records {
        if record.sender_id == identity.id {
            view.sent.push(record.into());
        } else if is_received_by(&record, identity, receiver_match) {
            let actionable = is_actionable_by(&record, identity, receiver_match);
            view.received.push(ReceivedHandover {
                handover: record.into(),
                actionable,
            });
        }
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handover::workflow::{decide_head, decide_receiver, initial_head_approval};
    use crate::models::{Decision, ReceiverSnapshot};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn person(role: Role, department: &str, first: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            employee_id: format!("EMP-{}", first),
            role,
            department: department.to_string(),
            first_name: first.to_string(),
            last_name: "Test".to_string(),
        }
    }

    fn handover(sender: &Identity, receiver: &Identity) -> HandoverRequest {
        let created_at = Utc::now();
        HandoverRequest {
            id: Uuid::new_v4(),
            sender_id: sender.id,
            department: sender.department.clone(),
            receiver: ReceiverSnapshot {
                id: receiver.id,
                employee_id: receiver.employee_id.clone(),
                name: receiver.full_name(),
                designation: "Lecturer".to_string(),
                department: receiver.department.clone(),
            },
            reason: "Medical leave".to_string(),
            handover_start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            handover_end_date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            documents: vec!["Lab register".to_string()],
            assets: vec![],
            pending_tasks: vec![],
            remarks: None,
            hod_approval: initial_head_approval(sender, created_at),
            faculty_approval: None,
            created_at,
        }
    }

    fn ids(items: &[ReceivedHandover]) -> Vec<Uuid> {
        items.iter().map(|r| r.handover.handover.id).collect()
    }

    #[test]
    fn test_sent_view_ignores_status() {
        let sender = person(Role::Teaching, "CS", "Ravi");
        let receiver = person(Role::Teaching, "CS", "Meera");
        let hod = person(Role::Hod, "CS", "Arun");

        let pending = handover(&sender, &receiver);
        let mut rejected = handover(&sender, &receiver);
        decide_head(&rejected, &hod, Decision::Rejected, None, Utc::now())
            .unwrap()
            .apply_to(&mut rejected);

        let view = resolve(vec![pending, rejected], &sender, ReceiverMatch::Strict);
        assert_eq!(view.sent.len(), 2);
        assert!(view.received.is_empty());
    }

    #[test]
    fn test_receiver_sees_own_requests_only() {
        let sender = person(Role::Teaching, "CS", "Ravi");
        let receiver = person(Role::Teaching, "CS", "Meera");
        let bystander = person(Role::Teaching, "CS", "Kiran");

        let record = handover(&sender, &receiver);
        let view = resolve(vec![record.clone()], &receiver, ReceiverMatch::Strict);
        assert_eq!(ids(&view.received), vec![record.id]);
        // Head stage still open: visible but not yet the receiver's move
        assert!(!view.received[0].actionable);

        let view = resolve(vec![record], &bystander, ReceiverMatch::Strict);
        assert!(view.sent.is_empty());
        assert!(view.received.is_empty());
    }

    #[test]
    fn test_hod_sees_whole_department_lifecycle() {
        let sender = person(Role::Teaching, "CS", "Ravi");
        let receiver = person(Role::Teaching, "CS", "Meera");
        let hod = person(Role::Hod, "CS", "Arun");
        let ee_sender = person(Role::Teaching, "EE", "Vijay");

        let pending = handover(&sender, &receiver);
        let mut approved = handover(&sender, &receiver);
        decide_head(&approved, &hod, Decision::Approved, None, Utc::now())
            .unwrap()
            .apply_to(&mut approved);
        decide_receiver(
            &approved,
            &receiver,
            Decision::Approved,
            None,
            Utc::now(),
            ReceiverMatch::Strict,
        )
        .unwrap()
        .apply_to(&mut approved);
        let other_department = handover(&ee_sender, &receiver);

        let view = resolve(
            vec![pending.clone(), approved.clone(), other_department],
            &hod,
            ReceiverMatch::Strict,
        );
        assert_eq!(ids(&view.received), vec![pending.id, approved.id]);
        assert!(view.received[0].actionable);
        assert!(!view.received[1].actionable);
    }

    #[test]
    fn test_bypassed_request_never_actionable_for_hod() {
        let principal = person(Role::Principal, "CS", "Sunita");
        let receiver = person(Role::Teaching, "CS", "Meera");
        let hod = person(Role::Hod, "CS", "Arun");

        let record = handover(&principal, &receiver);
        let view = resolve(vec![record.clone()], &hod, ReceiverMatch::Strict);
        assert_eq!(view.received.len(), 1);
        assert!(!view.received[0].actionable);

        let view = resolve(vec![record], &receiver, ReceiverMatch::Strict);
        assert!(view.received[0].actionable);
    }

    #[test]
    fn test_hod_sending_own_request_lands_in_sent_only() {
        let hod = person(Role::Hod, "CS", "Arun");
        let receiver = person(Role::Teaching, "CS", "Meera");
        let record = handover(&hod, &receiver);

        let view = resolve(vec![record], &hod, ReceiverMatch::Strict);
        assert_eq!(view.sent.len(), 1);
        assert!(view.received.is_empty());
    }

    #[test]
    fn test_legacy_match_uses_name_fallback() {
        let sender = person(Role::Teaching, "CS", "Ravi");
        let receiver = person(Role::Teaching, "CS", "Meera");
        let mut record = handover(&sender, &receiver);
        record.receiver.id = Uuid::new_v4();
        record.receiver.employee_id = String::new();

        assert!(resolve(vec![record.clone()], &receiver, ReceiverMatch::Strict)
            .received
            .is_empty());
        assert_eq!(
            resolve(vec![record], &receiver, ReceiverMatch::Legacy)
                .received
                .len(),
            1
        );
    }

    #[test]
    fn test_can_view() {
        let sender = person(Role::Teaching, "CS", "Ravi");
        let receiver = person(Role::Teaching, "CS", "Meera");
        let hod = person(Role::Hod, "CS", "Arun");
        let other_hod = person(Role::Hod, "EE", "Leela");
        let record = handover(&sender, &receiver);

        assert!(can_view(&record, &sender, ReceiverMatch::Strict));
        assert!(can_view(&record, &receiver, ReceiverMatch::Strict));
        assert!(can_view(&record, &hod, ReceiverMatch::Strict));
        assert!(!can_view(&record, &other_hod, ReceiverMatch::Strict));
    }

    #[test]
    fn test_receiver_heading_another_department_can_view() {
        let principal = person(Role::Principal, "CS", "Sunita");
        let ee_hod = person(Role::Hod, "EE", "Leela");
        let record = handover(&principal, &ee_hod);

        assert!(!is_received_by(&record, &ee_hod, ReceiverMatch::Strict));
        assert!(can_view(&record, &ee_hod, ReceiverMatch::Strict));
        assert!(is_actionable_by(&record, &ee_hod, ReceiverMatch::Strict));
    }
}
