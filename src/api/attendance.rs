use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::ValidationErrors;
use crate::engine::EngineError;
use crate::engine::calculator::recalculate_range;
use crate::repo::MySqlStore;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceFilter {
    #[schema(example = 1000)]
    pub employee_id: u64,
    /// First day of the range, inclusive
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from: NaiveDate,
    /// Last day of the range, inclusive
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub to: NaiveDate,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRow {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "09:12:00", value_type = Option<String>)]
    pub in_time: Option<NaiveTime>,
    #[schema(example = "18:00:00", value_type = Option<String>)]
    pub out_time: Option<NaiveTime>,
    #[schema(example = 2)]
    pub late_minutes: i64,
    #[schema(example = 0)]
    pub overtime_minutes: i64,
    #[schema(example = "0", value_type = String)]
    pub overtime_value: Decimal,
    #[schema(example = "late")]
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RecalculateRequest {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub to: NaiveDate,
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    if to < from {
        errors.push("to", "to cannot be before from");
    }
    errors
}

/* =========================
List attendance
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceFilter),
    responses(
        (status = 200, description = "Computed attendance for the range", body = [AttendanceRow]),
        (status = 400, description = "Validation failed", body = ValidationErrors),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    let errors = validate_range(query.from, query.to);
    if !errors.is_empty() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let rows = sqlx::query_as::<_, AttendanceRow>(
        r#"
        SELECT employee_id, date, in_time, out_time,
               late_minutes, overtime_minutes, overtime_value, status
        FROM attendance
        WHERE employee_id = ? AND date BETWEEN ? AND ?
        ORDER BY date
        "#,
    )
    .bind(query.employee_id)
    .bind(query.from)
    .bind(query.to)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, employee_id = query.employee_id, "attendance list failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(rows))
}

/* =========================
Recalculate range
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/attendance/recalculate",
    request_body = RecalculateRequest,
    responses(
        (status = 200, description = "Range recomputed", body = Object, example = json!({
            "computed": 31, "warnings": []
        })),
        (status = 400, description = "Validation failed or employee has no attendance configuration"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Attendance"
)]
pub async fn recalculate(
    pool: web::Data<MySqlPool>,
    payload: web::Json<RecalculateRequest>,
) -> actix_web::Result<impl Responder> {
    let errors = validate_range(payload.from, payload.to);
    if !errors.is_empty() {
        return Ok(HttpResponse::BadRequest().json(errors));
    }

    let store = MySqlStore::new(pool.get_ref().clone());
    match recalculate_range(&store, payload.employee_id, payload.from, payload.to).await {
        Ok(report) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "computed": report.computed,
            "warnings": report.warnings,
        }))),
        Err(EngineError::MissingConfig(employee_id)) => {
            Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": format!("Employee {employee_id} has no attendance configuration")
            })))
        }
        Err(e) => {
            tracing::error!(error = %e, employee_id = payload.employee_id, "recalculation failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_range_is_rejected() {
        let from = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let errors = validate_range(from, to);
        assert_eq!(errors.errors[0].field, "to");
    }

    #[test]
    fn single_day_range_passes() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert!(validate_range(day, day).is_empty());
    }
}
