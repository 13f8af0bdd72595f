use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::ValidationErrors;
use crate::model::{Assignment, TransferCategory};

#[derive(Deserialize, ToSchema)]
pub struct CreateTransfer {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "rotation", value_type = String)]
    pub category: TransferCategory,
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    pub effective_date: NaiveDate,
    pub new_assignment: Assignment,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TransferFilter {
    /// Filter by employee ID
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by status
    #[schema(example = "submitted")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Pagination per page number
    #[schema(example = 10)]
    pub per_page: Option<u64>,
}

enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TransferResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "rotation")]
    pub category: String,
    #[schema(example = "2026-03-01", format = "date", value_type = String)]
    pub effective_date: NaiveDate,
    pub old_company_id: u64,
    pub old_organization_id: u64,
    pub old_position_id: u64,
    pub old_title_id: u64,
    pub old_branch_id: u64,
    pub new_company_id: u64,
    pub new_organization_id: u64,
    pub new_position_id: u64,
    pub new_title_id: u64,
    pub new_branch_id: u64,
    #[schema(example = "submitted")]
    pub status: String,
    pub is_processed: bool,
}

#[derive(Serialize, ToSchema)]
pub struct TransferListResponse {
    pub data: Vec<TransferResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

fn internal(context: &'static str) -> impl Fn(sqlx::Error) -> actix_web::Error {
    move |e| {
        tracing::error!(error = %e, context, "transfer query failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    }
}

fn validate_create(payload: &CreateTransfer, today: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    if payload.employee_id == 0 {
        errors.push("employee_id", "employee_id is required");
    }
    if payload.effective_date < today {
        errors.push("effective_date", "effective_date cannot be in the past");
    }
    let a = &payload.new_assignment;
    if a.company_id == 0 || a.organization_id == 0 || a.position_id == 0 {
        errors.push("new_assignment", "company, organization and position are required");
    }
    errors
}

/* =========================
Create transfer (draft)
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/transfer",
    request_body = CreateTransfer,
    responses(
        (status = 200, description = "Transfer created as draft", body = Object, example = json!({
            "id": 1, "status": "draft"
        })),
        (status = 400, description = "Validation failed", body = ValidationErrors),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Transfer"
)]
pub async fn create_transfer(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTransfer>,
) -> actix_web::Result<impl Responder> {
    let today = Local::now().date_naive();
    let errors = validate_create(&payload, today);
    if !errors.is_empty() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    // Capture the current assignment as the "old" tuple so the record
    // stays meaningful after the employee row is overwritten.
    let current = sqlx::query_as::<_, (u64, u64, u64, u64, u64)>(
        r#"
        SELECT company_id, organization_id, position_id, title_id, branch_id
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(payload.employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(internal("load employee"))?;

    let Some((company_id, organization_id, position_id, title_id, branch_id)) = current else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Employee not found"
        })));
    };

    let id = sqlx::query(
        r#"
        INSERT INTO employee_transfers
            (employee_id, category, effective_date,
             old_company_id, old_organization_id, old_position_id, old_title_id, old_branch_id,
             new_company_id, new_organization_id, new_position_id, new_title_id, new_branch_id,
             status, is_processed)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft', 0)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.category.to_string())
    .bind(payload.effective_date)
    .bind(company_id)
    .bind(organization_id)
    .bind(position_id)
    .bind(title_id)
    .bind(branch_id)
    .bind(payload.new_assignment.company_id)
    .bind(payload.new_assignment.organization_id)
    .bind(payload.new_assignment.position_id)
    .bind(payload.new_assignment.title_id)
    .bind(payload.new_assignment.branch_id)
    .execute(pool.get_ref())
    .await
    .map_err(internal("insert transfer"))?
    .last_insert_id();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": id,
        "status": "draft"
    })))
}

/* =========================
Submit transfer
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/transfer/{transfer_id}/submit",
    params(
        ("transfer_id" = u64, Path, description = "Transfer to submit")
    ),
    responses(
        (status = 200, description = "Transfer submitted", body = Object, example = json!({
            "message": "Transfer submitted"
        })),
        (status = 400, description = "Transfer not found or not a draft"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Transfer"
)]
pub async fn submit_transfer(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let transfer_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE employee_transfers SET status = 'submitted' WHERE id = ? AND status = 'draft'",
    )
    .bind(transfer_id)
    .execute(pool.get_ref())
    .await
    .map_err(internal("submit"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Transfer not found or not a draft"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Transfer submitted"
    })))
}

/* =========================
Cancel transfer
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/transfer/{transfer_id}/cancel",
    params(
        ("transfer_id" = u64, Path, description = "Transfer to cancel")
    ),
    responses(
        (status = 200, description = "Transfer canceled", body = Object, example = json!({
            "message": "Transfer canceled"
        })),
        (status = 400, description = "Transfer not found or already processed"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Transfer"
)]
pub async fn cancel_transfer(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let transfer_id = path.into_inner();

    // Transferred records are terminal; the processed flag keeps a racing
    // sweep and a cancellation from both winning.
    let result = sqlx::query(
        r#"
        UPDATE employee_transfers
        SET status = 'canceled'
        WHERE id = ?
          AND status IN ('draft', 'submitted')
          AND is_processed = 0
        "#,
    )
    .bind(transfer_id)
    .execute(pool.get_ref())
    .await
    .map_err(internal("cancel"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Transfer not found or already processed"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Transfer canceled"
    })))
}

/* =========================
List transfers
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/transfer",
    params(TransferFilter),
    responses(
        (status = 200, description = "Paginated transfer list", body = TransferListResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Transfer"
)]
pub async fn list_transfers(
    pool: web::Data<MySqlPool>,
    query: web::Query<TransferFilter>,
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

    let count_sql = format!("SELECT COUNT(*) FROM employee_transfers{}", where_sql);
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
        SELECT id, employee_id, category, effective_date,
               old_company_id, old_organization_id, old_position_id, old_title_id, old_branch_id,
               new_company_id, new_organization_id, new_position_id, new_title_id, new_branch_id,
               status, is_processed
        FROM employee_transfers
        {}
        ORDER BY effective_date DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, TransferResponse>(&data_sql);
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

    Ok(HttpResponse::Ok().json(TransferListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
