use std::sync::Arc;

use axum::{
    http::{HeaderMap, Uri},
    response::{IntoResponse, Json},
    Extension,
};
use modkit::api::extract::request_id_from;
use modkit::api::response::created_json;
use modkit::validation::Record;
use modkit::{ProblemResponse, ValidatedJson, ValidatedPath, ValidatedPathJson, ValidatedQuery};
use tracing::{error, info};

use crate::api::rest::dto::{DeveloperDto, PersonDto, PersonIdPath, ShowPersonQuery, UpdatePersonReq};
use crate::api::rest::error::domain_error_to_problem;
use crate::domain::service::Service;

/// `GET /`
pub async fn home(Extension(svc): Extension<Arc<Service>>) -> Json<Record> {
    info!("Greeting requested");
    Json(svc.greeting())
}

/// `POST /person/new`
pub async fn create_person(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<PersonDto>,
) -> impl IntoResponse {
    info!("Creating person: {} {}", req.first_name, req.last_name);
    let person = svc.create_person(req.into());
    created_json(PersonDto::from(person))
}

/// `POST /developer/new`
pub async fn create_developer(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedJson(req): ValidatedJson<DeveloperDto>,
) -> impl IntoResponse {
    info!("Creating developer: {}", req.email);
    let developer = svc.create_developer(req.into());
    created_json(DeveloperDto::from(developer))
}

/// `GET /person/detail?name=&age=`
pub async fn show_person(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedQuery(query): ValidatedQuery<ShowPersonQuery>,
) -> Json<Record> {
    info!("Showing person with query: {:?}", query);
    Json(svc.show_person(query.name.as_deref(), query.age))
}

/// `GET /person/detail/{person_id}`
pub async fn show_person_by_id(
    Extension(svc): Extension<Arc<Service>>,
    ValidatedPath(path): ValidatedPath<PersonIdPath>,
) -> Json<Record> {
    info!("Showing person with id: {}", path.person_id);
    Json(svc.person_exists(path.person_id))
}

/// `PUT /person/{person_id}`; path and body violations are reported together.
pub async fn update_person(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
    headers: HeaderMap,
    ValidatedPathJson(path, req): ValidatedPathJson<PersonIdPath, UpdatePersonReq>,
) -> Result<Json<Record>, ProblemResponse> {
    info!("Updating person {}", path.person_id);

    match svc.update_person(path.person_id, req.person.into(), req.location.into()) {
        Ok(merged) => Ok(Json(merged)),
        Err(e) => {
            error!("Failed to update person {}: {}", path.person_id, e);
            Err(domain_error_to_problem(
                &e,
                uri.path(),
                request_id_from(&headers),
            ))
        }
    }
}
