use axum::{Extension, Router};
use modkit::api::{Missing, OpenApiRegistry, OperationBuilder, ParamLocation};
use std::sync::Arc;

use crate::api::rest::{dto, handlers};
use crate::domain::service::Service;

pub fn register_routes(
    mut router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
) -> anyhow::Result<Router> {
    // GET / - Greeting
    router = OperationBuilder::<Missing, Missing, ()>::get("/")
        .operation_id("people.home")
        .summary("Greeting")
        .description("Single-entry greeting mapping")
        .tag("people")
        .handler(handlers::home)
        .json_response(200, "Greeting")
        .register(router, openapi);

    // POST /person/new - Validate and echo a person
    router = OperationBuilder::<Missing, Missing, ()>::post("/person/new")
        .operation_id("people.create_person")
        .summary("Create a person")
        .description("Validate a person record and return its normalized form")
        .tag("people")
        .json_request::<dto::PersonDto>(openapi, "Person to validate")
        .handler(handlers::create_person)
        .json_response_with_schema::<dto::PersonDto>(openapi, 201, "Normalized person")
        .problem_response(openapi, 400, "Bad Request")
        .with_422_validation_error(openapi)
        .register(router, openapi);

    // POST /developer/new - Validate and echo a developer
    router = OperationBuilder::<Missing, Missing, ()>::post("/developer/new")
        .operation_id("people.create_developer")
        .summary("Create a developer")
        .description("Validate a person record extended with email, site and payment card")
        .tag("people")
        .json_request::<dto::DeveloperDto>(openapi, "Developer to validate")
        .handler(handlers::create_developer)
        .json_response_with_schema::<dto::DeveloperDto>(openapi, 201, "Normalized developer")
        .problem_response(openapi, 400, "Bad Request")
        .with_422_validation_error(openapi)
        .register(router, openapi);

    // GET /person/detail - Query parameters
    router = OperationBuilder::<Missing, Missing, ()>::get("/person/detail")
        .operation_id("people.show_person")
        .summary("Show person by query")
        .description("Echo a validated name and age as a one-entry mapping")
        .tag("people")
        .shape_params::<dto::ShowPersonQuery>(ParamLocation::Query)
        .handler(handlers::show_person)
        .json_response(200, "Name to age mapping")
        .with_422_validation_error(openapi)
        .register(router, openapi);

    // GET /person/detail/{person_id} - Path parameter
    router = OperationBuilder::<Missing, Missing, ()>::get("/person/detail/{person_id}")
        .operation_id("people.show_person_by_id")
        .summary("Show person by id")
        .tag("people")
        .shape_params::<dto::PersonIdPath>(ParamLocation::Path)
        .handler(handlers::show_person_by_id)
        .json_response(200, "Existence message keyed by id")
        .with_422_validation_error(openapi)
        .register(router, openapi);

    // PUT /person/{person_id} - Merge person and location
    router = OperationBuilder::<Missing, Missing, ()>::put("/person/{person_id}")
        .operation_id("people.update_person")
        .summary("Update person")
        .description("Validate a person and a location and return their fields as one mapping")
        .tag("people")
        .shape_params::<dto::PersonIdPath>(ParamLocation::Path)
        .json_request::<dto::UpdatePersonReq>(openapi, "Person and location")
        .handler(handlers::update_person)
        .json_response(200, "Merged person and location fields")
        .problem_response(openapi, 400, "Bad Request")
        .with_422_validation_error(openapi)
        .problem_response(openapi, 500, "Internal Server Error")
        .register(router, openapi);

    router = router.layer(Extension(service));

    Ok(router)
}
