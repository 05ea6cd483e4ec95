use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success wrapper: `{ success: true, message?, ...payload }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    payload: T,
    #[serde(skip)]
    status: StatusCode,
}

/// Payload for responses that only carry a message.
#[derive(Debug, Serialize)]
pub struct Empty {}

impl<T: Serialize> Envelope<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload,
            status: StatusCode::OK,
        }
    }

    pub fn created(payload: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(payload)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<Empty> {
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(Empty {}).with_message(message)
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Count {
        count: usize,
    }

    #[test]
    fn payload_is_flattened_next_to_success() {
        let env = Envelope::created(Count { count: 3 }).with_message("Successfully imported 3 contacts");
        assert_eq!(env.status, StatusCode::CREATED);
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["count"], 3);
        assert_eq!(v["message"], "Successfully imported 3 contacts");
        assert!(v.get("status").is_none());
    }

    #[test]
    fn message_only_envelope_has_no_payload_fields() {
        let v = serde_json::to_value(Envelope::message("Contact deleted successfully")).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["message"], "Contact deleted successfully");
    }
}
