use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fixed response envelope for deletes and failures: `{"status": bool, "message": string}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusMessage {
    pub status: bool,
    pub message: String,
}

impl StatusMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_shape() {
        let value = serde_json::to_value(StatusMessage::ok("File deleted successfully")).unwrap();
        assert_eq!(value["status"], true);
        assert_eq!(value["message"], "File deleted successfully");

        let value = serde_json::to_value(StatusMessage::error("File not found")).unwrap();
        assert_eq!(value["status"], false);
    }
}
