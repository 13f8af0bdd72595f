use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::ValidationErrors;
use crate::engine::approval::{StampDecision, apply_stamp, validate_levels};
use crate::engine::error::EngineError;
use crate::model::{ApprovalCategory, ApprovalLevel, ApprovalStamp, ApprovalStatus};

#[derive(Deserialize, ToSchema)]
pub struct CreateApproval {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 22)]
    pub organization_id: u64,
    #[schema(example = "leave", value_type = String)]
    pub category: ApprovalCategory,
    #[schema(example = "2026-02-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-02-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "family matter", nullable = true)]
    pub reason: Option<String>,
    /// Required when category is "leave".
    #[schema(example = "annual", nullable = true)]
    pub leave_category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct StampRequest {
    #[schema(example = 1)]
    pub level: u32,
    #[schema(example = 77)]
    pub approver_id: u64,
    #[schema(example = "approve", value_type = String)]
    pub decision: StampAction,
    #[schema(example = "incomplete attachment", nullable = true)]
    pub reject_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StampAction {
    Approve,
    Reject,
    Revision,
}

impl From<StampAction> for StampDecision {
    fn from(action: StampAction) -> Self {
        match action {
            StampAction::Approve => StampDecision::Approve,
            StampAction::Reject => StampDecision::Reject,
            StampAction::Revision => StampDecision::Revision,
        }
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ApprovalFilter {
    /// Filter by employee ID
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by overall status
    #[schema(example = "waiting")]
    pub status: Option<String>,
    /// Filter by category
    #[schema(example = "leave")]
    pub category: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct ApprovalResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = 22)]
    pub organization_id: u64,
    #[schema(example = "leave")]
    pub category: String,
    #[schema(example = "2026-02-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-02-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub leave_category: Option<String>,
    #[schema(example = "waiting")]
    pub status: String,
    #[schema(format = "date-time", value_type = String)]
    pub submitted_at: NaiveDateTime,
    pub revised_from: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct ApprovalListResponse {
    pub data: Vec<ApprovalResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(sqlx::FromRow)]
struct StampRow {
    id: u64,
    transaction_id: u64,
    level: u32,
    approver_id: Option<u64>,
    status: String,
    reject_reason: Option<String>,
    stamped_at: Option<NaiveDateTime>,
}

impl StampRow {
    fn into_model(self) -> Option<ApprovalStamp> {
        Some(ApprovalStamp {
            id: self.id,
            transaction_id: self.transaction_id,
            level: self.level,
            approver_id: self.approver_id,
            status: self.status.parse().ok()?,
            reject_reason: self.reject_reason,
            stamped_at: self.stamped_at,
        })
    }
}

fn internal(context: &'static str) -> impl Fn(sqlx::Error) -> actix_web::Error {
    move |e| {
        tracing::error!(error = %e, context, "approval query failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    }
}

async fn load_levels(
    pool: &MySqlPool,
    organization_id: u64,
) -> Result<Vec<ApprovalLevel>, sqlx::Error> {
    sqlx::query_as::<_, ApprovalLevel>(
        r#"
        SELECT organization_id, level, required_role
        FROM approval_levels
        WHERE organization_id = ?
        ORDER BY level
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

fn validate_create(payload: &CreateApproval) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    if payload.employee_id == 0 {
        errors.push("employee_id", "employee_id is required");
    }
    if payload.organization_id == 0 {
        errors.push("organization_id", "organization_id is required");
    }
    if payload.end_date < payload.start_date {
        errors.push("end_date", "end_date cannot be before start_date");
    }
    if payload.category == ApprovalCategory::Leave
        && payload
            .leave_category
            .as_deref()
            .map(|c| c.trim().is_empty())
            .unwrap_or(true)
    {
        errors.push("leave_category", "leave_category is required for leave requests");
    }
    errors
}

/* =========================
Submit approval request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/approval",
    request_body = CreateApproval,
    responses(
        (status = 200, description = "Request submitted", body = Object, example = json!({
            "id": 1, "status": "waiting"
        })),
        (status = 400, description = "Validation failed or approval chain broken", body = ValidationErrors),
        (status = 500, description = "Internal server error")
    ),
    tag = "Approval"
)]
pub async fn create_approval(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateApproval>,
) -> actix_web::Result<impl Responder> {
    let errors = validate_create(&payload);
    if !errors.is_empty() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let levels = load_levels(pool.get_ref(), payload.organization_id)
        .await
        .map_err(internal("load levels"))?;

    let max_level = match validate_levels(payload.organization_id, &levels) {
        Ok(n) => n,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })));
        }
    };

    let now = Local::now().naive_local();
    let mut tx = pool.begin().await.map_err(internal("begin"))?;

    let transaction_id = sqlx::query(
        r#"
        INSERT INTO approval_transactions
            (employee_id, organization_id, category, start_date, end_date,
             reason, leave_category, status, submitted_at, revised_from)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'waiting', ?, NULL)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.organization_id)
    .bind(payload.category.to_string())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.reason)
    .bind(&payload.leave_category)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(internal("insert transaction"))?
    .last_insert_id();

    for level in 1..=max_level {
        sqlx::query(
            r#"
            INSERT INTO approval_stamps (transaction_id, level, status)
            VALUES (?, ?, 'waiting')
            "#,
        )
        .bind(transaction_id)
        .bind(level)
        .execute(&mut *tx)
        .await
        .map_err(internal("insert stamp"))?;
    }

    tx.commit().await.map_err(internal("commit"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": transaction_id,
        "status": ApprovalStatus::Waiting.to_string()
    })))
}

/* =========================
Stamp a decision
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/approval/{transaction_id}/stamp",
    params(
        ("transaction_id" = u64, Path, description = "Transaction to stamp")
    ),
    request_body = StampRequest,
    responses(
        (status = 200, description = "Stamp recorded", body = Object, example = json!({
            "transaction_id": 1, "status": "reject"
        })),
        (status = 400, description = "Transaction closed or level unknown"),
        (status = 404, description = "Transaction not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Approval"
)]
pub async fn stamp_approval(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<StampRequest>,
) -> actix_web::Result<impl Responder> {
    let transaction_id = path.into_inner();

    // Transaction and stamps are read under row locks in the same
    // transaction that writes them back, so two approvers stamping
    // concurrently serialize and the second fold sees the first stamp.
    let mut tx = pool.begin().await.map_err(internal("begin"))?;

    let row = sqlx::query_as::<_, (u64, String)>(
        "SELECT organization_id, status FROM approval_transactions WHERE id = ? FOR UPDATE",
    )
    .bind(transaction_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal("load transaction"))?;

    let Some((organization_id, status)) = row else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Approval transaction not found"
        })));
    };
    let current_status: ApprovalStatus = status.parse().map_err(|_| {
        tracing::error!(transaction_id, %status, "unknown status in storage");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let levels = load_levels(pool.get_ref(), organization_id)
        .await
        .map_err(internal("load levels"))?;
    let max_level = validate_levels(organization_id, &levels).map_err(|e| {
        tracing::error!(transaction_id, error = %e, "stored approval chain invalid");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let rows = sqlx::query_as::<_, StampRow>(
        r#"
        SELECT id, transaction_id, level, approver_id, status, reject_reason, stamped_at
        FROM approval_stamps
        WHERE transaction_id = ?
        ORDER BY level
        FOR UPDATE
        "#,
    )
    .bind(transaction_id)
    .fetch_all(&mut *tx)
    .await
    .map_err(internal("load stamps"))?;
    let mut stamps: Vec<ApprovalStamp> = rows.into_iter().filter_map(StampRow::into_model).collect();

    let now = Local::now().naive_local();
    let new_status = match apply_stamp(
        transaction_id,
        current_status,
        &mut stamps,
        max_level,
        payload.level,
        payload.approver_id,
        payload.decision.into(),
        payload.reject_reason.clone(),
        now,
    ) {
        Ok(status) => status,
        Err(e @ (EngineError::TransactionClosed { .. } | EngineError::StampNotFound { .. })) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": e.to_string()
            })));
        }
        Err(e) => {
            tracing::error!(transaction_id, error = %e, "stamp failed");
            return Err(actix_web::error::ErrorInternalServerError("Internal Server Error"));
        }
    };

    if let Some(stamp) = stamps
        .iter()
        .find(|s| s.level == payload.level)
        .filter(|_| payload.decision != StampAction::Revision)
    {
        sqlx::query(
            r#"
            UPDATE approval_stamps
            SET status = ?, approver_id = ?, reject_reason = ?, stamped_at = ?
            WHERE transaction_id = ? AND level = ?
            "#,
        )
        .bind(stamp.status.to_string())
        .bind(stamp.approver_id)
        .bind(&stamp.reject_reason)
        .bind(stamp.stamped_at)
        .bind(transaction_id)
        .bind(payload.level)
        .execute(&mut *tx)
        .await
        .map_err(internal("update stamp"))?;
    }

    sqlx::query("UPDATE approval_transactions SET status = ? WHERE id = ?")
        .bind(new_status.to_string())
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(internal("update transaction"))?;

    tx.commit().await.map_err(internal("commit"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "transaction_id": transaction_id,
        "status": new_status.to_string()
    })))
}

/* =========================
Resubmit after revision
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/approval/{transaction_id}/resubmit",
    params(
        ("transaction_id" = u64, Path, description = "Revised transaction to resubmit")
    ),
    responses(
        (status = 200, description = "Resubmitted as a new transaction", body = Object, example = json!({
            "id": 2, "revised_from": 1, "status": "waiting"
        })),
        (status = 400, description = "Transaction is not in revision"),
        (status = 404, description = "Transaction not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Approval"
)]
pub async fn resubmit_approval(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let old_id = path.into_inner();

    let old = sqlx::query_as::<_, ApprovalResponse>(
        r#"
        SELECT id, employee_id, organization_id, category, start_date, end_date,
               reason, leave_category, status, submitted_at, revised_from
        FROM approval_transactions
        WHERE id = ?
        "#,
    )
    .bind(old_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(internal("load transaction"))?;

    let Some(old) = old else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Approval transaction not found"
        })));
    };
    if old.status != ApprovalStatus::Revision.to_string() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Only transactions in revision can be resubmitted"
        })));
    }

    let levels = load_levels(pool.get_ref(), old.organization_id)
        .await
        .map_err(internal("load levels"))?;
    let max_level = validate_levels(old.organization_id, &levels).map_err(|e| {
        tracing::error!(transaction_id = old_id, error = %e, "stored approval chain invalid");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let now = Local::now().naive_local();
    let mut tx = pool.begin().await.map_err(internal("begin"))?;

    // Fresh transaction, fresh stamps: the revised transaction's stamps are
    // invalidated, never reused.
    let new_id = sqlx::query(
        r#"
        INSERT INTO approval_transactions
            (employee_id, organization_id, category, start_date, end_date,
             reason, leave_category, status, submitted_at, revised_from)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'waiting', ?, ?)
        "#,
    )
    .bind(old.employee_id)
    .bind(old.organization_id)
    .bind(&old.category)
    .bind(old.start_date)
    .bind(old.end_date)
    .bind(&old.reason)
    .bind(&old.leave_category)
    .bind(now)
    .bind(old_id)
    .execute(&mut *tx)
    .await
    .map_err(internal("insert transaction"))?
    .last_insert_id();

    for level in 1..=max_level {
        sqlx::query(
            "INSERT INTO approval_stamps (transaction_id, level, status) VALUES (?, ?, 'waiting')",
        )
        .bind(new_id)
        .bind(level)
        .execute(&mut *tx)
        .await
        .map_err(internal("insert stamp"))?;
    }

    tx.commit().await.map_err(internal("commit"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": new_id,
        "revised_from": old_id,
        "status": ApprovalStatus::Waiting.to_string()
    })))
}

/* =========================
List approval transactions
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/approval",
    params(ApprovalFilter),
    responses(
        (status = 200, description = "Paginated approval list", body = ApprovalListResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Approval"
)]
pub async fn list_approvals(
    pool: web::Data<MySqlPool>,
    query: web::Query<ApprovalFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }
    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }
    if let Some(category) = query.category.as_deref() {
        where_sql.push_str(" AND category = ?");
        args.push(FilterValue::Str(category));
    }

    let count_sql = format!("SELECT COUNT(*) FROM approval_transactions{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q
        .fetch_one(pool.get_ref())
        .await
        .map_err(internal("count"))?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, organization_id, category, start_date, end_date,
               reason, leave_category, status, submitted_at, revised_from
        FROM approval_transactions
        {}
        ORDER BY submitted_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, ApprovalResponse>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }
    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(internal("list"))?;

    Ok(HttpResponse::Ok().json(ApprovalListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(category: ApprovalCategory, leave_category: Option<&str>) -> CreateApproval {
        CreateApproval {
            employee_id: 1000,
            organization_id: 22,
            category,
            start_date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 2, 4).unwrap(),
            reason: None,
            leave_category: leave_category.map(String::from),
        }
    }

    #[test]
    fn valid_leave_payload_passes() {
        assert!(validate_create(&payload(ApprovalCategory::Leave, Some("annual"))).is_empty());
    }

    #[test]
    fn leave_without_category_fails_with_field_name() {
        let errors = validate_create(&payload(ApprovalCategory::Leave, None));
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(errors.errors[0].field, "leave_category");
    }

    #[test]
    fn permits_do_not_need_leave_category() {
        assert!(validate_create(&payload(ApprovalCategory::LatePermit, None)).is_empty());
    }

    #[test]
    fn reversed_dates_collect_an_error() {
        let mut p = payload(ApprovalCategory::OutPermit, None);
        p.end_date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let errors = validate_create(&p);
        assert_eq!(errors.errors[0].field, "end_date");
    }

    #[test]
    fn all_failures_are_reported_together() {
        let mut p = payload(ApprovalCategory::Leave, None);
        p.employee_id = 0;
        p.end_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let errors = validate_create(&p);
        assert_eq!(errors.errors.len(), 3);
    }
}
