//! Request handling for the HTTP surface, independent of the socket layer.

use std::io::Read;

use consult_core::errors::ConsultError;
use consult_core::identity::Caller;
use consult_core::requests::{NewConsultation, ReplyRequest};
use consult_db::service::ConsultService;
use consult_search::search_doctors;
use serde::Serialize;
use serde_json::{Value, json};

use super::routes::{Method, Route, route};

pub const DOCTOR_ID_HEADER: &str = "X-Doctor-Id";
pub const PRIVILEGED_HEADER: &str = "X-Doctor-Privileged";

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// A request as read off the wire.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub doctor_id: Option<String>,
    pub privileged: bool,
    pub body: Vec<u8>,
}

impl ApiRequest {
    fn caller(&self) -> Option<Caller> {
        let doctor_id = self.doctor_id.as_deref().map(str::trim)?;
        if doctor_id.is_empty() {
            return None;
        }
        Some(Caller {
            doctor_id: doctor_id.to_string(),
            privileged: self.privileged,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { status, body },
            Err(error) => {
                tracing::error!(%error, "response serialization failed");
                Self::error(500, "unexpected", "internal server error")
            }
        }
    }

    pub(super) fn error(status: u16, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": { "kind": kind, "message": message.into() } }),
        }
    }
}

impl From<ConsultError> for ApiResponse {
    fn from(error: ConsultError) -> Self {
        match error {
            ConsultError::Validation(reason) => Self::error(400, "validation", reason),
            not_found @ ConsultError::NotFound { .. } => {
                Self::error(404, "not_found", not_found.to_string())
            }
            ConsultError::Unexpected(error) => {
                tracing::error!(error = %error, "request failed");
                Self::error(500, "unexpected", "internal server error")
            }
        }
    }
}

/// Read at most `limit` bytes of body. Longer bodies are refused with 413
/// without reading the rest.
pub fn read_body(reader: impl Read, limit: u64) -> Result<Vec<u8>, ApiResponse> {
    let mut body = Vec::new();
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|error| {
            tracing::warn!(%error, "failed to read request body");
            ApiResponse::error(400, "validation", "unreadable request body")
        })?;
    if u64::try_from(body.len()).unwrap_or(u64::MAX) > limit {
        return Err(ApiResponse::error(
            413,
            "validation",
            format!("request body exceeds {limit} bytes"),
        ));
    }
    Ok(body)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ConsultError> {
    serde_json::from_slice(body)
        .map_err(|e| ConsultError::validation(format!("invalid JSON body: {e}")))
}

/// Route and execute one request.
pub async fn handle(service: &ConsultService, request: &ApiRequest) -> ApiResponse {
    let Some(route) = route(request.method, &request.url) else {
        return ApiResponse::error(404, "not_found", format!("no route for {}", request.url));
    };
    let Some(caller) = request.caller() else {
        return ApiResponse::error(
            401,
            "unauthorized",
            format!("missing {DOCTOR_ID_HEADER} header"),
        );
    };

    let result = match route {
        Route::Create => match parse_body::<NewConsultation>(&request.body) {
            Ok(body) => service
                .create_consultation(&caller, &body)
                .await
                .map(|record| ApiResponse::json(201, &record)),
            Err(error) => Err(error),
        },
        Route::Sent => service
            .sent_consultations(&caller)
            .await
            .map(|sent| ApiResponse::json(200, &sent)),
        Route::Received => service
            .received_consultations(&caller)
            .await
            .map(|received| ApiResponse::json(200, &received)),
        Route::Detail(id) => service
            .consultation_detail(&caller, &id)
            .await
            .map(|detail| ApiResponse::json(200, &detail)),
        Route::Reply(id) => match parse_body::<ReplyRequest>(&request.body) {
            Ok(body) => service
                .reply_to_consultation(&caller, &id, &body)
                .await
                .map(|summary| ApiResponse::json(200, &summary)),
            Err(error) => Err(error),
        },
        Route::Search(query) => search_doctors(service, &query, &caller)
            .await
            .map(|hits| ApiResponse::json(200, &hits))
            .map_err(ConsultError::from),
    };

    result.unwrap_or_else(|error| {
        if error.is_client_error() {
            tracing::debug!(url = %request.url, %error, "request rejected");
        }
        ApiResponse::from(error)
    })
}

#[cfg(test)]
mod tests {
    use consult_core::entities::{Doctor, PatientSnapshot};
    use pretty_assertions::assert_eq;

    use crate::context::test_support::test_context;

    use super::*;

    fn get(url: &str, doctor: &str) -> ApiRequest {
        ApiRequest {
            method: Method::Get,
            url: url.into(),
            doctor_id: Some(doctor.into()),
            privileged: false,
            body: Vec::new(),
        }
    }

    fn with_body(method: Method, url: &str, doctor: &str, body: &Value) -> ApiRequest {
        ApiRequest {
            method,
            body: serde_json::to_vec(body).unwrap(),
            ..get(url, doctor)
        }
    }

    #[test]
    fn body_within_limit_is_read_whole() {
        let body = read_body(&b"{\"reply\":\"ok\"}"[..], 64).unwrap();
        assert_eq!(body, b"{\"reply\":\"ok\"}");
        assert_eq!(read_body(&[b'x'; 64][..], 64).unwrap().len(), 64);
    }

    #[test]
    fn oversized_body_is_refused() {
        let huge = vec![b'x'; 1024];
        let response = read_body(&huge[..], 100).unwrap_err();
        assert_eq!(response.status, 413);
        assert_eq!(response.body["error"]["kind"], "validation");
    }

    async fn seed(svc: &ConsultService) {
        for (id, name) in [("d1", "Ali"), ("d2", "Sara"), ("d3", "Alireza")] {
            svc.register_doctor(&Doctor {
                id: id.into(),
                name: name.into(),
                lname: String::new(),
                email: String::new(),
                phone: String::new(),
                workplace: None,
                verified: true,
            })
            .await
            .unwrap();
        }
        svc.register_patient(&PatientSnapshot {
            id: "p10".into(),
            owner_doctor_id: "d1".into(),
            display_name: "Jane Roe".into(),
            submit_status: false,
            outcome_status: false,
            updated_at: chrono::Utc::now(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn create_reply_detail_over_http_shapes() {
        let ctx = test_context().await;
        let svc = &ctx.service;
        seed(svc).await;

        let created = handle(
            svc,
            &with_body(
                Method::Post,
                "/consultations",
                "d1",
                &json!({"patient_id": "p10", "consult_message": "Need advice", "consult_doctor_ids": ["d2"]}),
            ),
        )
        .await;
        assert_eq!(created.status, 201);
        let id = created.body["id"].as_str().unwrap().to_string();
        assert_eq!(created.body["participants"][0]["doctor_id"], "d2");

        let replied = handle(
            svc,
            &with_body(Method::Put, &format!("/consultations/{id}"), "d2", &json!({"reply": "Try X"})),
        )
        .await;
        assert_eq!(replied.status, 200);
        assert_eq!(
            replied.body,
            json!({"consultation_id": id, "doctor_id": "d2", "reply": "Try X", "all_replied": true})
        );

        let detail = handle(svc, &get(&format!("/consultations/{id}"), "d1")).await;
        assert_eq!(detail.status, 200);
        assert_eq!(detail.body["status"], "complete");
        assert_eq!(detail.body["patient"]["name"], "Jane Roe");
    }

    #[tokio::test]
    async fn error_statuses() {
        let ctx = test_context().await;
        let svc = &ctx.service;
        seed(svc).await;

        let empty_invitees = handle(
            svc,
            &with_body(
                Method::Post,
                "/consultations",
                "d1",
                &json!({"patient_id": "p10", "consult_message": "Q", "consult_doctor_ids": []}),
            ),
        )
        .await;
        assert_eq!(empty_invitees.status, 400);
        assert_eq!(empty_invitees.body["error"]["kind"], "validation");

        let missing = handle(svc, &get("/consultations/con-00000000", "d1")).await;
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body["error"]["kind"], "not_found");

        let bad_json = handle(
            svc,
            &ApiRequest {
                method: Method::Put,
                body: b"not json".to_vec(),
                ..get("/consultations/con-00000000", "d2")
            },
        )
        .await;
        assert_eq!(bad_json.status, 400);

        let blank_search = handle(svc, &get("/consultations/search/%20", "d1")).await;
        assert_eq!(blank_search.status, 400);

        let anonymous = handle(
            svc,
            &ApiRequest {
                doctor_id: None,
                ..get("/consultations/sent", "")
            },
        )
        .await;
        assert_eq!(anonymous.status, 401);

        let unrouted = handle(svc, &get("/nowhere", "d1")).await;
        assert_eq!(unrouted.status, 404);
    }

    #[tokio::test]
    async fn search_excludes_caller() {
        let ctx = test_context().await;
        let svc = &ctx.service;
        seed(svc).await;

        let hits = handle(svc, &get("/consultations/search/ali", "d1")).await;
        assert_eq!(hits.status, 200);
        let ids: Vec<_> = hits.body.as_array().unwrap().iter().map(|h| h["id"].clone()).collect();
        assert_eq!(ids, [json!("d3")]);
    }
}
