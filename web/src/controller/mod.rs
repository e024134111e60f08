use serde::Serialize;
use utoipa::ToSchema;

pub(crate) mod alert_controller;
pub(crate) mod command_controller;
pub(crate) mod device_report_controller;
pub(crate) mod health_check_controller;
pub(crate) mod location_controller;

/// Body returned when a command or report is accepted.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    success: bool,
}

impl SuccessResponse {
    pub fn accepted() -> Self {
        Self { success: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_success_response() {
        let serialized = serde_json::to_value(SuccessResponse::accepted()).unwrap();
        assert_eq!(serialized, json!({"success": true}));
    }
}
