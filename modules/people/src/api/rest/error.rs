use modkit::{internal_error, ProblemResponse};

use crate::domain::error::DomainError;

/// Map a domain error to an RFC 9457 response.
pub fn domain_error_to_problem(
    e: &DomainError,
    instance: &str,
    request_id: Option<String>,
) -> ProblemResponse {
    let problem = match e {
        // Both inputs are validated records; a collision means two shapes declare the same field.
        DomainError::FieldCollision { .. } => {
            internal_error(e.to_string()).with_code("FIELD_COLLISION")
        }
    };

    let problem = problem.with_instance(instance);
    match request_id {
        Some(id) => problem.with_request_id(id).into(),
        None => problem.into(),
    }
}
