use std::collections::BTreeMap;

use modkit::api::{OperationSpec, ParamLocation, ParamSpec};
use serde_json::{json, Map, Value};

use crate::model::ComponentsRegistry;

#[derive(serde::Serialize)]
pub struct OpenApi {
    pub openapi: &'static str,
    pub info: OpenApiInfo,
    pub paths: BTreeMap<String, BTreeMap<String, Value>>,
    pub components: OpenApiComponents,
}

#[derive(serde::Serialize)]
pub struct OpenApiInfo {
    pub title: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

#[derive(serde::Serialize, Default)]
pub struct OpenApiComponents {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
}

impl OpenApiComponents {
    pub fn from_registry(registry: &ComponentsRegistry) -> serde_json::Result<Self> {
        let mut schemas = BTreeMap::new();
        for (name, schema) in &registry.schemas {
            schemas.insert(name.clone(), serde_json::to_value(schema)?);
        }
        Ok(Self { schemas })
    }
}

impl OpenApi {
    /// Assemble the document from operation specs and collected component schemas.
    pub fn assemble<'a>(
        specs: impl IntoIterator<Item = &'a OperationSpec>,
        components: &ComponentsRegistry,
    ) -> serde_json::Result<Self> {
        let mut paths: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        for spec in specs {
            paths
                .entry(spec.path.clone())
                .or_default()
                .insert(spec.method.as_str().to_lowercase(), operation(spec, components));
        }

        Ok(Self {
            openapi: "3.1.0",
            info: OpenApiInfo {
                title: "People API",
                version: env!("CARGO_PKG_VERSION"),
                description: Some("Schema-validated people, developer and location records"),
            },
            paths,
            components: OpenApiComponents::from_registry(components)?,
        })
    }
}

fn operation(spec: &OperationSpec, components: &ComponentsRegistry) -> Value {
    let mut op = Map::new();
    op.insert(
        "operationId".into(),
        Value::String(
            spec.operation_id
                .clone()
                .unwrap_or_else(|| spec.handler_id.clone()),
        ),
    );
    if let Some(summary) = &spec.summary {
        op.insert("summary".into(), Value::String(summary.clone()));
    }
    if let Some(description) = &spec.description {
        op.insert("description".into(), Value::String(description.clone()));
    }
    if !spec.tags.is_empty() {
        op.insert("tags".into(), json!(spec.tags));
    }
    if !spec.params.is_empty() {
        op.insert(
            "parameters".into(),
            Value::Array(spec.params.iter().map(parameter).collect()),
        );
    }

    if let Some(req) = &spec.request_body {
        let mut rb = Map::new();
        if let Some(desc) = &req.description {
            rb.insert("description".into(), Value::String(desc.clone()));
        }
        rb.insert("required".into(), Value::Bool(req.required));
        rb.insert(
            "content".into(),
            content(components, req.content_type, req.schema_name.as_deref()),
        );
        op.insert("requestBody".into(), Value::Object(rb));
    }

    let mut responses = Map::new();
    for resp in &spec.responses {
        responses.insert(
            resp.status.to_string(),
            json!({
                "description": resp.description,
                "content": content(components, resp.content_type, resp.schema_name.as_deref()),
            }),
        );
    }
    op.insert("responses".into(), Value::Object(responses));

    Value::Object(op)
}

fn parameter(param: &ParamSpec) -> Value {
    let location = match param.location {
        ParamLocation::Path => "path",
        ParamLocation::Query => "query",
    };
    let mut p = Map::new();
    p.insert("name".into(), Value::String(param.name.clone()));
    p.insert("in".into(), Value::String(location.into()));
    p.insert(
        "required".into(),
        Value::Bool(param.required || param.location == ParamLocation::Path),
    );
    if let Some(desc) = &param.description {
        p.insert("description".into(), Value::String(desc.clone()));
    }
    p.insert("schema".into(), json!({ "type": param.param_type }));
    Value::Object(p)
}

/// `{ <content_type>: { schema } }`, referencing a component when one is registered.
fn content(components: &ComponentsRegistry, content_type: &str, schema_name: Option<&str>) -> Value {
    let schema = match schema_name {
        Some(name) if components.has_schema(name) => {
            json!({ "$ref": format!("#/components/schemas/{name}") })
        }
        _ => match content_type {
            "text/plain" | "text/html" => json!({ "type": "string" }),
            _ => json!({ "type": "object" }),
        },
    };
    let mut content = Map::new();
    content.insert(content_type.to_string(), json!({ "schema": schema }));
    Value::Object(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit::api::{RequestBodySpec, ResponseSpec};
    use utoipa::openapi::{schema::ObjectBuilder, RefOr, Schema};

    fn spec() -> OperationSpec {
        OperationSpec {
            method: axum::http::Method::PUT,
            path: "/person/{person_id}".into(),
            operation_id: Some("people:update".into()),
            summary: Some("Update".into()),
            description: None,
            tags: vec!["People".into()],
            params: vec![ParamSpec {
                name: "person_id".into(),
                location: ParamLocation::Path,
                required: false,
                description: None,
                param_type: "integer".into(),
            }],
            request_body: Some(RequestBodySpec {
                content_type: "application/json",
                description: None,
                schema_name: Some("UpdatePerson".into()),
                required: true,
            }),
            responses: vec![ResponseSpec {
                status: 200,
                content_type: "application/json",
                description: "Merged".into(),
                schema_name: Some("Unregistered".into()),
            }],
            handler_id: "put:_person__person_id_".into(),
        }
    }

    #[test]
    fn operation_refs_known_components_and_inlines_unknown() {
        let mut components = ComponentsRegistry::default();
        components.register_schema(
            "UpdatePerson",
            RefOr::T(Schema::Object(ObjectBuilder::new().build())),
        );
        let spec = spec();
        let doc = serde_json::to_value(OpenApi::assemble([&spec], &components).unwrap()).unwrap();

        let op = &doc["paths"]["/person/{person_id}"]["put"];
        assert_eq!(op["operationId"], "people:update");
        assert_eq!(op["parameters"][0]["in"], "path");
        assert_eq!(op["parameters"][0]["required"], true);
        assert_eq!(op["parameters"][0]["schema"]["type"], "integer");
        assert_eq!(
            op["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/UpdatePerson"
        );
        assert_eq!(
            op["responses"]["200"]["content"]["application/json"]["schema"]["type"],
            "object"
        );
        assert!(doc["components"]["schemas"].get("UpdatePerson").is_some());
        assert_eq!(doc["info"]["title"], "People API");
    }
}
