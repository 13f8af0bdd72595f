//! MySQL-backed implementation of the engine's persistence seam.
//!
//! Uses the runtime sqlx API throughout; every call borrows a pooled
//! connection for its own duration, and the paired writes (normalized logs
//! + capture cursor, transfer apply + assignment overwrite, leave usage +
//! balance bump) each run inside one transaction.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::MySqlPool;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::store::EngineStore;
use crate::model::{
    ApprovalCategory, Attendance, AttendanceConfig, Device, EmployeeTransfer, Holiday,
    LeaveBalance, NormalizedLog, OvertimeRate, PunchDirection, ShiftSchedule,
};

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(value: &str) -> EngineResult<T>
where
    T: std::str::FromStr<Err = strum::ParseError>,
{
    value
        .parse::<T>()
        .map_err(|e| EngineError::Storage(sqlx::Error::Decode(Box::new(e))))
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    employee_id: u64,
    company_id: u64,
    device_employee_id: Option<String>,
    shift_id: u64,
    schedule_id: u64,
    overtime_mode: String,
}

impl ConfigRow {
    fn into_model(self) -> EngineResult<AttendanceConfig> {
        Ok(AttendanceConfig {
            employee_id: self.employee_id,
            company_id: self.company_id,
            device_employee_id: self
                .device_employee_id
                .filter(|pin| !pin.trim().is_empty()),
            shift_id: self.shift_id,
            schedule_id: self.schedule_id,
            overtime_mode: decode(&self.overtime_mode)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransferRow {
    id: u64,
    employee_id: u64,
    category: String,
    effective_date: NaiveDate,
    old_company_id: u64,
    old_organization_id: u64,
    old_position_id: u64,
    old_title_id: u64,
    old_branch_id: u64,
    new_company_id: u64,
    new_organization_id: u64,
    new_position_id: u64,
    new_title_id: u64,
    new_branch_id: u64,
    status: String,
    is_processed: bool,
}

impl TransferRow {
    fn into_model(self) -> EngineResult<EmployeeTransfer> {
        Ok(EmployeeTransfer {
            id: self.id,
            employee_id: self.employee_id,
            category: decode(&self.category)?,
            effective_date: self.effective_date,
            old_assignment: crate::model::Assignment {
                company_id: self.old_company_id,
                organization_id: self.old_organization_id,
                position_id: self.old_position_id,
                title_id: self.old_title_id,
                branch_id: self.old_branch_id,
            },
            new_assignment: crate::model::Assignment {
                company_id: self.new_company_id,
                organization_id: self.new_organization_id,
                position_id: self.new_position_id,
                title_id: self.new_title_id,
                branch_id: self.new_branch_id,
            },
            status: decode(&self.status)?,
            is_processed: self.is_processed,
        })
    }
}

impl EngineStore for MySqlStore {
    async fn active_devices(&self) -> EngineResult<Vec<Device>> {
        let devices = sqlx::query_as::<_, Device>(
            r#"
            SELECT id, company_id, name, ip_address, port,
                   retrieval_times, last_captured_at, is_active
            FROM devices
            WHERE is_active = 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(devices)
    }

    async fn polling_targets(&self, company_id: u64) -> EngineResult<Vec<AttendanceConfig>> {
        let rows = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT employee_id, company_id, device_employee_id,
                   shift_id, schedule_id, overtime_mode
            FROM attendance_configs
            WHERE company_id = ?
              AND device_employee_id IS NOT NULL
              AND device_employee_id <> ''
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ConfigRow::into_model).collect()
    }

    async fn logged_days(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<HashMap<(u64, NaiveDate), NaiveTime>> {
        let rows = sqlx::query_as::<_, (u64, NaiveDate, NaiveTime)>(
            r#"
            SELECT employee_id, date, MAX(time)
            FROM attendance_logs
            WHERE date BETWEEN ? AND ?
            GROUP BY employee_id, date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(employee_id, date, time)| ((employee_id, date), time))
            .collect())
    }

    async fn save_normalized_logs(
        &self,
        device_id: u64,
        cursor: NaiveDateTime,
        entries: &[NormalizedLog],
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await?;

        let check_out = PunchDirection::CheckOut.to_string();
        for entry in entries {
            // unique key on (employee_id, date, direction): check-ins are
            // written once, check-outs move forward as later punches arrive
            if entry.direction == check_out {
                sqlx::query(
                    r#"
                    INSERT INTO attendance_logs (employee_id, date, time, direction)
                    VALUES (?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE time = VALUES(time)
                    "#,
                )
                .bind(entry.employee_id)
                .bind(entry.date)
                .bind(entry.time)
                .bind(&entry.direction)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(
                    r#"
                    INSERT IGNORE INTO attendance_logs (employee_id, date, time, direction)
                    VALUES (?, ?, ?, ?)
                    "#,
                )
                .bind(entry.employee_id)
                .bind(entry.date)
                .bind(entry.time)
                .bind(&entry.direction)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r#"
            UPDATE devices
            SET last_captured_at = ?
            WHERE id = ? AND (last_captured_at IS NULL OR last_captured_at < ?)
            "#,
        )
        .bind(cursor)
        .bind(device_id)
        .bind(cursor)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn attendance_config(&self, employee_id: u64) -> EngineResult<Option<AttendanceConfig>> {
        let row = sqlx::query_as::<_, ConfigRow>(
            r#"
            SELECT employee_id, company_id, device_employee_id,
                   shift_id, schedule_id, overtime_mode
            FROM attendance_configs
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ConfigRow::into_model).transpose()
    }

    async fn shift_schedule(&self, schedule_id: u64) -> EngineResult<Option<ShiftSchedule>> {
        let name = sqlx::query_scalar::<_, String>(
            "SELECT name FROM shift_schedules WHERE id = ?",
        )
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(name) = name else {
            return Ok(None);
        };

        let details = sqlx::query_as::<_, crate::model::ShiftDetail>(
            r#"
            SELECT id, schedule_id, weekday, in_time, out_time,
                   early_in_time, max_out_time, late_tolerance_minutes, is_off
            FROM shift_details
            WHERE schedule_id = ?
            ORDER BY weekday
            "#,
        )
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ShiftSchedule {
            id: schedule_id,
            name,
            details,
        }))
    }

    async fn holidays(&self, from: NaiveDate, to: NaiveDate) -> EngineResult<Vec<Holiday>> {
        let holidays = sqlx::query_as::<_, Holiday>(
            "SELECT date, name FROM holidays WHERE date BETWEEN ? AND ?",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(holidays)
    }

    async fn day_logs(&self, employee_id: u64, date: NaiveDate) -> EngineResult<Vec<NormalizedLog>> {
        let logs = sqlx::query_as::<_, NormalizedLog>(
            r#"
            SELECT employee_id, date, time, direction
            FROM attendance_logs
            WHERE employee_id = ? AND date = ?
            ORDER BY time
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn has_approved_request(
        &self,
        employee_id: u64,
        date: NaiveDate,
        category: ApprovalCategory,
    ) -> EngineResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM approval_transactions
                WHERE employee_id = ?
                  AND category = ?
                  AND status = 'approve'
                  AND ? BETWEEN start_date AND end_date
            )
            "#,
        )
        .bind(employee_id)
        .bind(category.to_string())
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn approved_leave_category(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> EngineResult<Option<String>> {
        let category = sqlx::query_scalar::<_, Option<String>>(
            r#"
            SELECT leave_category FROM approval_transactions
            WHERE employee_id = ?
              AND category = 'leave'
              AND status = 'approve'
              AND ? BETWEEN start_date AND end_date
            ORDER BY submitted_at DESC
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category.flatten())
    }

    async fn overtime_rates(&self) -> EngineResult<Vec<OvertimeRate>> {
        let rates = sqlx::query_as::<_, OvertimeRate>(
            "SELECT id, hour_threshold, multiplier FROM overtime_rates ORDER BY hour_threshold",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rates)
    }

    async fn leave_balances(&self, employee_id: u64) -> EngineResult<Vec<LeaveBalance>> {
        let balances = sqlx::query_as::<_, LeaveBalance>(
            r#"
            SELECT id, employee_id, name, category, quota, used, credit,
                   expiry_date, priority
            FROM leave_balances
            WHERE employee_id = ?
            ORDER BY priority, expiry_date
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(balances)
    }

    async fn record_leave_usage(
        &self,
        balance_id: u64,
        employee_id: u64,
        date: NaiveDate,
    ) -> EngineResult<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT IGNORE INTO leave_usages (balance_id, employee_id, date)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(balance_id)
        .bind(employee_id)
        .bind(date)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE leave_balances SET used = used + 1 WHERE id = ?")
            .bind(balance_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn upsert_attendance(&self, record: &Attendance) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, in_time, out_time, late_minutes,
                 overtime_minutes, overtime_value, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                in_time = VALUES(in_time),
                out_time = VALUES(out_time),
                late_minutes = VALUES(late_minutes),
                overtime_minutes = VALUES(overtime_minutes),
                overtime_value = VALUES(overtime_value),
                status = VALUES(status)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.in_time)
        .bind(record.out_time)
        .bind(record.late_minutes)
        .bind(record.overtime_minutes)
        .bind(record.overtime_value)
        .bind(record.status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_transfers(&self, effective: NaiveDate) -> EngineResult<Vec<EmployeeTransfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT id, employee_id, category, effective_date,
                   old_company_id, old_organization_id, old_position_id,
                   old_title_id, old_branch_id,
                   new_company_id, new_organization_id, new_position_id,
                   new_title_id, new_branch_id,
                   status, is_processed
            FROM employee_transfers
            WHERE status = 'submitted'
              AND effective_date = ?
              AND is_processed = 0
            "#,
        )
        .bind(effective)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransferRow::into_model).collect()
    }

    async fn apply_transfer(&self, transfer: &EmployeeTransfer) -> EngineResult<bool> {
        let mut tx = self.pool.begin().await?;

        // The guarded update is the idempotence point: a concurrent or
        // repeated sweep hits zero rows and backs off.
        let claimed = sqlx::query(
            r#"
            UPDATE employee_transfers
            SET status = 'transferred', is_processed = 1
            WHERE id = ? AND status = 'submitted' AND is_processed = 0
            "#,
        )
        .bind(transfer.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE employees
            SET company_id = ?, organization_id = ?, position_id = ?,
                title_id = ?, branch_id = ?
            WHERE id = ?
            "#,
        )
        .bind(transfer.new_assignment.company_id)
        .bind(transfer.new_assignment.organization_id)
        .bind(transfer.new_assignment.position_id)
        .bind(transfer.new_assignment.title_id)
        .bind(transfer.new_assignment.branch_id)
        .bind(transfer.employee_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
