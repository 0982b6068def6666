//! End-to-end checks of the people routes behind the ingress middleware.

use std::collections::HashMap;
use std::sync::Arc;

use api_ingress::ApiIngress;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use modkit::{ConfigProvider, ModuleCtxBuilder, ModuleEntry, ModuleRegistry};
use people::People;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

struct MapProvider(HashMap<String, Value>);

impl ConfigProvider for MapProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&Value> {
        self.0.get(module_name)
    }
}

async fn app_with(modules: HashMap<String, Value>) -> Router {
    let ingress = Arc::new(ApiIngress::default());
    let people = Arc::new(People::default());
    let registry = ModuleRegistry::builder()
        .register(
            ModuleEntry::new("api_ingress", ingress.clone())
                .with_rest_host(ingress.clone())
                .with_stateful(ingress),
        )
        .register(
            ModuleEntry::new("people", people.clone())
                .depends_on(&["api_ingress"])
                .with_rest(people),
        )
        .build()
        .unwrap();

    let ctx = ModuleCtxBuilder::new(CancellationToken::new())
        .with_config_provider(Arc::new(MapProvider(modules)))
        .build();
    registry.run_init_phase(&ctx).await.unwrap();
    registry.run_rest_phase(&ctx, Router::new()).unwrap()
}

async fn app() -> Router {
    app_with(HashMap::new()).await
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header("x-request-id", "test-rid")
        .body(Body::empty())
        .unwrap()
}

fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-request-id", "test-rid")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn person() -> Value {
    json!({
        "first_name": "Facundo",
        "last_name": "García Martoni",
        "age": 21,
        "hair_color": "blonde",
        "is_married": false
    })
}

fn error_pointers(body: &Value) -> Vec<(String, String)> {
    body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["pointer"].as_str().unwrap().to_string(),
                e["code"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn home_returns_greeting() {
    let (status, body) = send(app().await, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Hello": "World"}));
}

#[tokio::test]
async fn greeting_comes_from_module_config() {
    let app = app_with(HashMap::from([(
        "people".to_string(),
        json!({"greeting_key": "Hola", "greeting_value": "Mundo"}),
    )]))
    .await;
    let (_, body) = send(app, get("/")).await;
    assert_eq!(body, json!({"Hola": "Mundo"}));
}

#[tokio::test]
async fn documented_person_round_trips() {
    let (status, body) = send(app().await, json_req("POST", "/person/new", person())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, person());
}

#[tokio::test]
async fn person_optionals_default_to_null() {
    let (status, body) = send(
        app().await,
        json_req(
            "POST",
            "/person/new",
            json!({"first_name": "Ada", "last_name": "Lovelace", "age": 36, "nickname": "A"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!({"first_name": "Ada", "last_name": "Lovelace", "age": 36, "hair_color": null, "is_married": null})
    );
}

#[tokio::test]
async fn person_violations_are_422_problems() {
    let mut bad = person();
    bad["age"] = json!(0);
    bad["hair_color"] = json!("green");

    let (status, body) = send(app().await, json_req("POST", "/person/new", bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["status"], 422);
    assert_eq!(body["instance"], "/person/new");
    assert_eq!(body["request_id"], "test-rid");
    assert_eq!(
        error_pointers(&body),
        vec![
            ("/age".to_string(), "constraint_violation".to_string()),
            ("/hair_color".to_string(), "invalid_enum".to_string()),
        ]
    );
    assert_eq!(body["errors"][0]["location"], "body");
}

#[tokio::test]
async fn malformed_json_is_400() {
    let req = Request::post("/person/new")
        .header("content-type", "application/json")
        .body(Body::from("{\"first_name\":"))
        .unwrap();
    let (status, body) = send(app().await, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
}

#[tokio::test]
async fn developer_is_created_with_normalized_card() {
    let mut dev = person();
    dev["email"] = json!("facundo@example.com");
    dev["site"] = json!("https://platzi.com");
    dev["payment_card"] = json!("4111-1111-1111-1111");
    let (status, body) = send(app().await, json_req("POST", "/developer/new", dev)).await;

    // Dashes are not whitespace: the card is rejected
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_pointers(&body),
        vec![("/payment_card".to_string(), "type_mismatch".to_string())]
    );

    let mut dev = person();
    dev["email"] = json!("facundo@example.com");
    dev["site"] = json!("https://platzi.com");
    dev["payment_card"] = json!("4111 1111 1111 1111");
    let (status, body) = send(app().await, json_req("POST", "/developer/new", dev)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["payment_card"], "4111111111111111");
    assert_eq!(body["site"], "https://platzi.com");
    assert_eq!(body["first_name"], "Facundo");
}

#[tokio::test]
async fn developer_missing_fields_and_base_violations() {
    let (status, body) = send(app().await, json_req("POST", "/developer/new", person())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_pointers(&body),
        vec![
            ("/email".to_string(), "missing".to_string()),
            ("/site".to_string(), "missing".to_string()),
            ("/payment_card".to_string(), "missing".to_string()),
        ]
    );

    let mut dev = person();
    dev["age"] = json!(116);
    dev["email"] = json!("facundo@example.com");
    dev["site"] = json!("https://platzi.com");
    dev["payment_card"] = json!("4111 1111 1111 1111");
    let (status, body) = send(app().await, json_req("POST", "/developer/new", dev)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_pointers(&body),
        vec![("/age".to_string(), "constraint_violation".to_string())]
    );
}

#[tokio::test]
async fn show_person_by_query() {
    let (status, body) = send(app().await, get("/person/detail?name=Ada&age=36")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Ada": 36}));

    let (status, body) = send(app().await, get("/person/detail?age=18")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"null": 18}));

    let (status, body) = send(app().await, get("/person/detail?name=Ada&age=17")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["location"], "query");
    assert_eq!(body["errors"][0]["code"], "constraint_violation");

    let (status, body) = send(app().await, get("/person/detail?name=Ada")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["code"], "missing");
}

#[tokio::test]
async fn show_person_by_path() {
    let (status, body) = send(app().await, get("/person/detail/42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"42": "It exists"}));

    for bad in ["0", "-1"] {
        let (status, body) = send(app().await, get(&format!("/person/detail/{bad}"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{bad}");
        assert_eq!(body["errors"][0]["location"], "path");
        assert_eq!(body["errors"][0]["code"], "constraint_violation");
    }

    let (status, body) = send(app().await, get("/person/detail/abc")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"][0]["code"], "type_mismatch");
}

#[tokio::test]
async fn put_on_the_detail_route_is_not_an_update() {
    let body = json!({"person": person(), "location": {}});
    let (status, _) = send(app().await, json_req("PUT", "/person/detail", body)).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn update_person_merges_records() {
    let body = json!({
        "person": person(),
        "location": {"city": "Bogotá", "state": "Cundinamarca", "country": "Colombia"}
    });
    let (status, merged) = send(app().await, json_req("PUT", "/person/7", body)).await;
    assert_eq!(status, StatusCode::OK);

    let obj = merged.as_object().unwrap();
    assert_eq!(obj.len(), 8);
    for key in [
        "first_name",
        "last_name",
        "age",
        "hair_color",
        "is_married",
        "city",
        "state",
        "country",
    ] {
        assert!(obj.contains_key(key), "{key}");
    }
    assert_eq!(merged["country"], "Colombia");
}

#[tokio::test]
async fn update_person_reports_nested_pointers() {
    let body = json!({
        "person": {"first_name": "A", "last_name": "B", "age": 200},
        "location": {"city": "", "state": "S", "country": "C"}
    });
    let (status, resp) = send(app().await, json_req("PUT", "/person/7", body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        error_pointers(&resp),
        vec![
            ("/person/age".to_string(), "constraint_violation".to_string()),
            ("/location/city".to_string(), "constraint_violation".to_string()),
        ]
    );

    let (status, resp) = send(
        app().await,
        json_req(
            "PUT",
            "/person/0",
            json!({"person": {"first_name": ""}, "location": {}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let located: Vec<(String, String)> = resp["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["location"].as_str().unwrap().to_string(),
                e["pointer"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    let expected: Vec<(String, String)> = [
        ("path", "/person_id"),
        ("body", "/person/first_name"),
        ("body", "/person/last_name"),
        ("body", "/person/age"),
        ("body", "/location/city"),
        ("body", "/location/state"),
        ("body", "/location/country"),
    ]
    .iter()
    .map(|(l, p)| (l.to_string(), p.to_string()))
    .collect();
    assert_eq!(located, expected);
}

#[tokio::test]
async fn openapi_lists_people_operations() {
    let (status, doc) = send(app().await, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);

    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/",
        "/person/new",
        "/developer/new",
        "/person/detail",
        "/person/detail/{person_id}",
        "/person/{person_id}",
    ] {
        assert!(paths.contains_key(path), "{path}");
    }

    let params = &doc["paths"]["/person/detail"]["get"]["parameters"];
    assert_eq!(params[0]["name"], "name");
    assert_eq!(params[0]["required"], false);
    assert_eq!(params[1]["name"], "age");
    assert_eq!(params[1]["schema"]["type"], "integer");

    let schemas = doc["components"]["schemas"].as_object().unwrap();
    for name in ["PersonDto", "DeveloperDto", "UpdatePersonReq", "Problem"] {
        assert!(schemas.contains_key(name), "{name}");
    }
}
