pub mod approval;
pub mod attendance;
pub mod transfer;

use serde::Serialize;
use utoipa::ToSchema;

/// One field-level validation failure. Requests failing validation are
/// rejected synchronously with the full list; nothing is persisted.
#[derive(Debug, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "end_date")]
    pub field: String,
    #[schema(example = "end_date cannot be before start_date")]
    pub message: String,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}
