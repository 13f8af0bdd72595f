pub mod approval;
pub mod attendance;
pub mod device;
pub mod leave;
pub mod overtime;
pub mod punch;
pub mod shift;
pub mod transfer;

pub use approval::{ApprovalCategory, ApprovalLevel, ApprovalStamp, ApprovalStatus, ApprovalTransaction};
pub use attendance::{Attendance, AttendanceConfig, AttendanceStatus};
pub use device::Device;
pub use leave::LeaveBalance;
pub use overtime::{OvertimeMode, OvertimeRate};
pub use punch::{NormalizedLog, PunchDirection, RawPunch};
pub use shift::{Holiday, ShiftDetail, ShiftSchedule};
pub use transfer::{Assignment, EmployeeTransfer, TransferCategory, TransferStatus};
