//! Database store for handover requests

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::handover::workflow::{Stage, Transition};
use crate::models::{ApprovalRecord, HandoverRequest, HandoverStatus, ReceiverSnapshot};

const SELECT_HANDOVER: &str = r#"
    SELECT id, sender_id, department,
           receiver_id, receiver_employee_id, receiver_name, receiver_designation, receiver_department,
           reason, handover_start_date, handover_end_date, documents, assets, pending_tasks, remarks,
           hod_decision, hod_kind, hod_approver_id, hod_date, hod_remarks,
           faculty_decision, faculty_kind, faculty_approver_id, faculty_date, faculty_remarks,
           created_at
    FROM handovers
"#;

/// Apply the bundled schema migrations
pub async fn run_migrations(pool: &SqlitePool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Which records a listing should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoverFilter {
    All,
    /// Sent by or addressed to `user_id`, or belonging to `department`
    Involving {
        user_id: Uuid,
        department: Option<String>,
    },
}

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert_handover(&self, handover: &HandoverRequest) -> Result<()> {
        let hod = ApprovalColumns::from(handover.hod_approval.as_ref());
        let faculty = ApprovalColumns::from(handover.faculty_approval.as_ref());

        sqlx::query(
            r#"
            INSERT INTO handovers (
                id, sender_id, department,
                receiver_id, receiver_employee_id, receiver_name, receiver_designation, receiver_department,
                reason, handover_start_date, handover_end_date, documents, assets, pending_tasks, remarks,
                status,
                hod_decision, hod_kind, hod_approver_id, hod_date, hod_remarks,
                faculty_decision, faculty_kind, faculty_approver_id, faculty_date, faculty_remarks,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(handover.id.to_string())
        .bind(handover.sender_id.to_string())
        .bind(&handover.department)
        .bind(handover.receiver.id.to_string())
        .bind(&handover.receiver.employee_id)
        .bind(&handover.receiver.name)
        .bind(&handover.receiver.designation)
        .bind(&handover.receiver.department)
        .bind(&handover.reason)
        .bind(handover.handover_start_date)
        .bind(handover.handover_end_date)
        .bind(encode_list(&handover.documents)?)
        .bind(encode_list(&handover.assets)?)
        .bind(encode_list(&handover.pending_tasks)?)
        .bind(&handover.remarks)
        .bind(handover.status().as_str())
        .bind(hod.decision)
        .bind(hod.kind)
        .bind(hod.approver_id)
        .bind(hod.date)
        .bind(hod.remarks)
        .bind(faculty.decision)
        .bind(faculty.kind)
        .bind(faculty.approver_id)
        .bind(faculty.date)
        .bind(faculty.remarks)
        .bind(handover.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_handover(&self, id: Uuid) -> Result<HandoverRequest> {
        let row = sqlx::query_as::<_, HandoverRow>(&format!("{} WHERE id = ?", SELECT_HANDOVER))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Handover {} not found", id)))?;

        row.try_into()
    }

    pub async fn list_handovers(&self, filter: &HandoverFilter) -> Result<Vec<HandoverRequest>> {
        let rows = match filter {
            HandoverFilter::All => {
                sqlx::query_as::<_, HandoverRow>(&format!(
                    "{} ORDER BY created_at DESC",
                    SELECT_HANDOVER
                ))
                .fetch_all(&self.pool)
                .await?
            }
            HandoverFilter::Involving {
                user_id,
                department,
            } => {
                sqlx::query_as::<_, HandoverRow>(&format!(
                    "{} WHERE sender_id = ? OR receiver_id = ? OR department = ? ORDER BY created_at DESC",
                    SELECT_HANDOVER
                ))
                .bind(user_id.to_string())
                .bind(user_id.to_string())
                .bind(department.as_deref())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Write a stage decision if, and only if, that stage is still open.
    ///
    /// The open-stage check lives in the UPDATE's WHERE clause, so two
    /// concurrent decisions on the same stage cannot both land. Returns
    /// `false` when the row was not updated.
    pub async fn apply_transition(
        &self,
        id: Uuid,
        transition: &Transition,
        resulting_status: HandoverStatus,
    ) -> Result<bool> {
        let columns = ApprovalColumns::from(Some(&transition.approval));

        let sql = match transition.stage {
            Stage::Head => {
                r#"
                UPDATE handovers
                SET hod_decision = ?, hod_kind = ?, hod_approver_id = ?, hod_date = ?, hod_remarks = ?,
                    status = ?
                WHERE id = ? AND hod_decision IS NULL AND faculty_decision IS NULL
                "#
            }
            Stage::Receiver => {
                r#"
                UPDATE handovers
                SET faculty_decision = ?, faculty_kind = ?, faculty_approver_id = ?, faculty_date = ?,
                    faculty_remarks = ?, status = ?
                WHERE id = ? AND hod_decision = 'approved' AND faculty_decision IS NULL
                "#
            }
        };

        let result = sqlx::query(sql)
            .bind(columns.decision)
            .bind(columns.kind)
            .bind(columns.approver_id)
            .bind(columns.date)
            .bind(columns.remarks)
            .bind(resulting_status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn encode_list(items: &[String]) -> Result<String> {
    serde_json::to_string(items).map_err(|e| AppError::Internal(format!("Invalid list: {}", e)))
}

fn decode_list(field: &str, raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Internal(format!("Invalid {} column: {}", field, e)))
}

fn parse_uuid(field: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::Internal(format!("Invalid {} UUID: {}", field, e)))
}

/// Column values of one approval record
struct ApprovalColumns {
    decision: Option<&'static str>,
    kind: Option<&'static str>,
    approver_id: Option<String>,
    date: Option<DateTime<Utc>>,
    remarks: Option<String>,
}

impl From<Option<&ApprovalRecord>> for ApprovalColumns {
    fn from(record: Option<&ApprovalRecord>) -> Self {
        Self {
            decision: record.map(|r| r.decision.as_str()),
            kind: record.map(|r| r.kind.as_str()),
            approver_id: record.and_then(|r| r.approver_id.clone()),
            date: record.map(|r| r.date),
            remarks: record.and_then(|r| r.remarks.clone()),
        }
    }
}

fn approval_from_columns(
    stage: &str,
    decision: Option<String>,
    kind: Option<String>,
    approver_id: Option<String>,
    date: Option<DateTime<Utc>>,
    remarks: Option<String>,
) -> Result<Option<ApprovalRecord>> {
    let Some(decision) = decision else {
        return Ok(None);
    };

    let kind = kind.ok_or_else(|| AppError::Internal(format!("{} approval has no kind", stage)))?;
    let date = date.ok_or_else(|| AppError::Internal(format!("{} approval has no date", stage)))?;

    Ok(Some(ApprovalRecord {
        decision: decision
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid {} decision: {}", stage, e)))?,
        kind: kind
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid {} kind: {}", stage, e)))?,
        approver_id,
        date,
        remarks,
    }))
}

// Internal row type for sqlx

#[derive(sqlx::FromRow)]
struct HandoverRow {
    id: String,
    sender_id: String,
    department: String,
    receiver_id: String,
    receiver_employee_id: String,
    receiver_name: String,
    receiver_designation: String,
    receiver_department: String,
    reason: String,
    handover_start_date: NaiveDate,
    handover_end_date: NaiveDate,
    documents: String,
    assets: String,
    pending_tasks: String,
    remarks: Option<String>,
    hod_decision: Option<String>,
    hod_kind: Option<String>,
    hod_approver_id: Option<String>,
    hod_date: Option<DateTime<Utc>>,
    hod_remarks: Option<String>,
    faculty_decision: Option<String>,
    faculty_kind: Option<String>,
    faculty_approver_id: Option<String>,
    faculty_date: Option<DateTime<Utc>>,
    faculty_remarks: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HandoverRow> for HandoverRequest {
    type Error = AppError;

    fn try_from(row: HandoverRow) -> Result<Self> {
        Ok(HandoverRequest {
            id: parse_uuid("id", &row.id)?,
            sender_id: parse_uuid("sender_id", &row.sender_id)?,
            department: row.department,
            receiver: ReceiverSnapshot {
                id: parse_uuid("receiver_id", &row.receiver_id)?,
                employee_id: row.receiver_employee_id,
                name: row.receiver_name,
                designation: row.receiver_designation,
                department: row.receiver_department,
            },
            reason: row.reason,
            handover_start_date: row.handover_start_date,
            handover_end_date: row.handover_end_date,
            documents: decode_list("documents", &row.documents)?,
            assets: decode_list("assets", &row.assets)?,
            pending_tasks: decode_list("pending_tasks", &row.pending_tasks)?,
            remarks: row.remarks,
            hod_approval: approval_from_columns(
                "hod",
                row.hod_decision,
                row.hod_kind,
                row.hod_approver_id,
                row.hod_date,
                row.hod_remarks,
            )?,
            faculty_approval: approval_from_columns(
                "faculty",
                row.faculty_decision,
                row.faculty_kind,
                row.faculty_approver_id,
                row.faculty_date,
                row.faculty_remarks,
            )?,
            created_at: row.created_at,
        })
    }
}
