use serde::Serialize;
use utoipa::ToSchema;

/// Pagination block carried in the envelope's `meta` field; list endpoints
/// fill it, everything else sends it empty.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

/// Error payload mirrored into the envelope when a request fails.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorData {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
            meta,
        }
    }
}

impl ApiResponse<ErrorData> {
    /// Failure envelope: the message doubles as the error payload so every
    /// client sees the same string whichever field it reads.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            data: Some(ErrorData {
                error: message.clone(),
            }),
            message,
            meta: Some(Meta::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_mirrors_message_into_error_payload() {
        let resp = ApiResponse::failure("Not Found");
        assert_eq!(resp.message, "Not Found");
        assert_eq!(resp.data.unwrap().error, "Not Found");
        assert!(resp.meta.is_some());
    }
}
