use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// An employee's entitlement to one leave category.
///
/// `priority` decides deduction order when several balances could cover the
/// same leave: lower number is consumed first.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "name": "Annual 2026",
    "category": "annual",
    "quota": 12,
    "used": 3,
    "credit": 0,
    "expiry_date": "2026-12-31",
    "priority": 1
}))]
pub struct LeaveBalance {
    pub id: u64,
    pub employee_id: u64,
    pub name: String,
    pub category: String,
    pub quota: i32,
    pub used: i32,
    pub credit: i32,
    #[schema(value_type = String, format = "date")]
    pub expiry_date: NaiveDate,
    pub priority: i32,
}

impl LeaveBalance {
    pub fn remaining(&self) -> i32 {
        self.quota + self.credit - self.used
    }

    pub fn usable_on(&self, date: NaiveDate) -> bool {
        self.remaining() > 0 && date <= self.expiry_date
    }
}
