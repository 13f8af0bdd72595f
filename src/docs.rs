use crate::api::approval::{
    ApprovalFilter, ApprovalListResponse, ApprovalResponse, CreateApproval, StampRequest,
};
use crate::api::attendance::{AttendanceFilter, AttendanceRow, RecalculateRequest};
use crate::api::transfer::{CreateTransfer, TransferFilter, TransferListResponse, TransferResponse};
use crate::api::{FieldError, ValidationErrors};
use crate::model::Assignment;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Attendance Engine API",
        version = "1.0.0",
        description = r#"
## HRM Attendance Engine

This API fronts the **attendance engine**: the background service that polls
fingerprint terminals, normalizes their punch logs, and computes daily
attendance for every employee.

### 🔹 Key Features
- **Approval Workflows**
  - Submit leave, late-permit, early-out, out-permit and overtime requests
  - Multi-level stamping with reject and revision flows
- **Employee Transfers**
  - Draft, submit and cancel transfers applied on their effective date
- **Attendance**
  - Inspect computed daily records and trigger range recalculation

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::approval::create_approval,
        crate::api::approval::stamp_approval,
        crate::api::approval::resubmit_approval,
        crate::api::approval::list_approvals,

        crate::api::transfer::create_transfer,
        crate::api::transfer::submit_transfer,
        crate::api::transfer::cancel_transfer,
        crate::api::transfer::list_transfers,

        crate::api::attendance::list_attendance,
        crate::api::attendance::recalculate
    ),
    components(
        schemas(
            CreateApproval,
            StampRequest,
            ApprovalFilter,
            ApprovalResponse,
            ApprovalListResponse,
            CreateTransfer,
            TransferFilter,
            TransferResponse,
            TransferListResponse,
            Assignment,
            AttendanceFilter,
            AttendanceRow,
            RecalculateRequest,
            FieldError,
            ValidationErrors
        )
    ),
    tags(
        (name = "Approval", description = "Approval workflow APIs"),
        (name = "Transfer", description = "Employee transfer APIs"),
        (name = "Attendance", description = "Attendance record APIs"),
    )
)]
pub struct ApiDoc;
