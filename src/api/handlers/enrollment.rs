use actix_web::{
    http::{header, StatusCode},
    web::{self, BytesMut, Data},
    HttpRequest, HttpResponse, Resource, ResponseError,
};
use futures::StreamExt;
use tracing::{error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    api::types::{EnrollmentResponse, ErrorResponse},
    core::services::enrollment::EnrollmentService,
    utils::error::EnrollmentError,
};

/// Request limits applied by the enrollment handler.
#[derive(Debug, Clone, Copy)]
pub struct EnrollmentLimits {
    pub max_payload_bytes: usize,
}

impl ResponseError for EnrollmentError {
    fn status_code(&self) -> StatusCode {
        match self {
            EnrollmentError::Auth(_) => StatusCode::UNAUTHORIZED,
            EnrollmentError::Validation(_) => StatusCode::BAD_REQUEST,
            EnrollmentError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            EnrollmentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

pub fn resource() -> Resource {
    web::resource("/enroll").route(web::post().to(enroll))
}

async fn enroll(
    service: Data<EnrollmentService>,
    limits: Data<EnrollmentLimits>,
    request: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, EnrollmentError> {
    let span = info_span!("enroll", request_id = %Uuid::new_v4());

    process(&service, *limits.get_ref(), &request, payload)
        .instrument(span.clone())
        .await
        .map_err(|e| {
            span.in_scope(|| match &e {
                EnrollmentError::Internal(_) => error!(error = %e, "Enrollment failed"),
                _ => warn!(error = %e, status = %e.status_code(), "Enrollment rejected"),
            });
            e
        })
}

async fn process(
    service: &EnrollmentService,
    limits: EnrollmentLimits,
    request: &HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, EnrollmentError> {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let target = service.prepare(authorization).await?;
    let body = read_body(payload, limits.max_payload_bytes).await?;
    let receipt = service.complete(target, &body).await?;

    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(&receipt)))
}

async fn read_body(mut payload: web::Payload, limit: usize) -> Result<BytesMut, EnrollmentError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| EnrollmentError::Validation(format!("unreadable request body: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(EnrollmentError::PayloadTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
