//! Axum extractors that run a [`Shape`] check before the handler sees the input.
//!
//! Rejections are RFC 9457 problems: 422 `VALIDATION_FAILED` for shape violations,
//! 400/415 for bodies that are not JSON at all.

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use serde_json::{Map, Value};

use crate::api::problem::{self, Problem, ProblemResponse};
use crate::validation::{Location, Shape, ShapeError, ValidationFailed};

/// Header carrying the request id set by the ingress.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Validated JSON request body.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

/// Validated query string. Every value arrives as a string and is coerced by the schema.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

/// Validated path parameters.
#[derive(Debug, Clone)]
pub struct ValidatedPath<T>(pub T);

/// Validated path parameters and JSON body, checked together so one 422 lists
/// the violations of both.
#[derive(Debug, Clone)]
pub struct ValidatedPathJson<P, B>(pub P, pub B);

pub fn request_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn shape_rejection(err: ShapeError, instance: &str, request_id: Option<String>) -> ProblemResponse {
    match err {
        ShapeError::Invalid(failed) => {
            tracing::warn!(
                location = %failed.location,
                errors = failed.errors.len(),
                instance,
                "request rejected by validation"
            );
            problem::validation_failed(&failed, instance, request_id)
        }
        ShapeError::Decode { shape, source } => {
            tracing::error!(shape, error = %source, "validated record does not fit its type");
            let mut p = problem::internal_error("An internal error occurred")
                .with_code("INTERNAL")
                .with_instance(instance);
            if let Some(id) = request_id {
                p = p.with_request_id(id);
            }
            p.into()
        }
    }
}

/// One rejection for several independently checked inputs: a decode failure wins,
/// otherwise every validation failure goes into a single 422.
fn combined_rejection(
    errors: impl IntoIterator<Item = ShapeError>,
    instance: &str,
    request_id: Option<String>,
) -> ProblemResponse {
    let mut failures: Vec<ValidationFailed> = Vec::new();
    for err in errors {
        match err {
            ShapeError::Invalid(failed) => failures.push(failed),
            decode @ ShapeError::Decode { .. } => {
                return shape_rejection(decode, instance, request_id)
            }
        }
    }
    tracing::warn!(
        locations = failures.len(),
        errors = failures.iter().map(|f| f.errors.len()).sum::<usize>(),
        instance,
        "request rejected by validation"
    );
    problem::validation_failed_all(&failures, instance, request_id)
}

fn input_rejection(
    status: StatusCode,
    code: &str,
    detail: String,
    instance: &str,
    request_id: Option<String>,
) -> ProblemResponse {
    tracing::warn!(status = status.as_u16(), code, instance, "malformed request input");
    let title = status.canonical_reason().unwrap_or("Bad Request");
    let mut p = Problem::new(status, title, detail)
        .with_code(code)
        .with_instance(instance);
    if let Some(id) = request_id {
        p = p.with_request_id(id);
    }
    p.into()
}

fn json_rejection_code(rej: &JsonRejection) -> &'static str {
    match rej {
        JsonRejection::MissingJsonContentType(_) => "UNSUPPORTED_MEDIA_TYPE",
        JsonRejection::JsonSyntaxError(_) => "INVALID_JSON",
        JsonRejection::JsonDataError(_) => "INVALID_JSON",
        JsonRejection::BytesRejection(_) => "BODY_READ_FAILED",
        _ => "BAD_REQUEST",
    }
}

fn strings_to_object(map: HashMap<String, String>) -> Value {
    Value::Object(
        map.into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>(),
    )
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: Shape,
{
    type Rejection = ProblemResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let instance = req.uri().path().to_owned();
        let request_id = request_id_from(req.headers());

        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rej| {
                input_rejection(
                    rej.status(),
                    json_rejection_code(&rej),
                    rej.body_text(),
                    &instance,
                    request_id.clone(),
                )
            })?;

        T::from_input(Location::Body, &value)
            .map(ValidatedJson)
            .map_err(|e| shape_rejection(e, &instance, request_id))
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: Shape,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();
        let request_id = request_id_from(&parts.headers);

        let Query(raw) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).map_err(|rej| {
            input_rejection(
                StatusCode::BAD_REQUEST,
                "INVALID_QUERY",
                rej.body_text(),
                &instance,
                request_id.clone(),
            )
        })?;

        T::from_input(Location::Query, &strings_to_object(raw))
            .map(ValidatedQuery)
            .map_err(|e| shape_rejection(e, &instance, request_id))
    }
}

impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    S: Send + Sync,
    T: Shape,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();
        let request_id = request_id_from(&parts.headers);

        let Path(raw) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|rej| {
                input_rejection(
                    rej.status(),
                    "INVALID_PATH",
                    rej.body_text(),
                    &instance,
                    request_id.clone(),
                )
            })?;

        T::from_input(Location::Path, &strings_to_object(raw))
            .map(ValidatedPath)
            .map_err(|e| shape_rejection(e, &instance, request_id))
    }
}

impl<S, P, B> FromRequest<S> for ValidatedPathJson<P, B>
where
    S: Send + Sync,
    P: Shape + Send,
    B: Shape,
{
    type Rejection = ProblemResponse;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let instance = req.uri().path().to_owned();
        let request_id = request_id_from(req.headers());
        let (mut parts, body) = req.into_parts();

        let Path(raw) = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map_err(|rej| {
                input_rejection(
                    rej.status(),
                    "INVALID_PATH",
                    rej.body_text(),
                    &instance,
                    request_id.clone(),
                )
            })?;
        let path = P::from_input(Location::Path, &strings_to_object(raw));

        let req = Request::from_parts(parts, body);
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rej| {
                input_rejection(
                    rej.status(),
                    json_rejection_code(&rej),
                    rej.body_text(),
                    &instance,
                    request_id.clone(),
                )
            })?;
        let body = B::from_input(Location::Body, &value);

        match (path, body) {
            (Ok(p), Ok(b)) => Ok(ValidatedPathJson(p, b)),
            (p, b) => Err(combined_rejection(
                [p.err(), b.err()].into_iter().flatten(),
                &instance,
                request_id,
            )),
        }
    }
}
