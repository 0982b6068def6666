use serde_json::{Map, Number, Value};

use super::error::{FieldError, Location, ValidationFailed};
use super::field::{FieldKind, FieldSpec};
use super::formats;

/// Normalized record produced by a successful check.
pub type Record = Map<String, Value>;

/// Named set of field specs, optionally layered over a base shape.
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    base: Option<Box<Schema>>,
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            name,
            base: None,
            fields,
        }
    }

    /// Derived shape: the full `base` check runs first, then `fields`.
    pub fn extends(name: &'static str, base: &Schema, fields: Vec<FieldSpec>) -> Self {
        Self {
            name,
            base: Some(Box::new(base.clone())),
            fields,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All fields in check order: base fields before own fields.
    pub fn fields(&self) -> Vec<&FieldSpec> {
        let mut out = self.base.as_ref().map(|b| b.fields()).unwrap_or_default();
        out.extend(self.fields.iter());
        out
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.base.as_ref().and_then(|b| b.field(name)))
    }

    /// Check a request body.
    pub fn validate(&self, input: &Value) -> Result<Record, ValidationFailed> {
        self.validate_at(Location::Body, input)
    }

    /// Check `input` field by field.
    ///
    /// Coercions: integers accept JSON integers, integral floats and decimal strings;
    /// booleans accept JSON booleans and `true/false/1/0/yes/no/on/off`; text accepts
    /// strings only. Undeclared keys are dropped. Every violation is collected; no
    /// partial record is returned on failure.
    pub fn validate_at(&self, location: Location, input: &Value) -> Result<Record, ValidationFailed> {
        let Some(obj) = input.as_object() else {
            return Err(ValidationFailed::single(
                location,
                FieldError::TypeMismatch {
                    pointer: String::new(),
                    expected: "object",
                },
            ));
        };

        let mut record = Record::new();
        let mut errors = Vec::new();
        self.collect(obj, "", &mut record, &mut errors);

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(ValidationFailed::new(location, errors))
        }
    }

    fn collect(
        &self,
        obj: &Map<String, Value>,
        prefix: &str,
        record: &mut Record,
        errors: &mut Vec<FieldError>,
    ) {
        if let Some(base) = &self.base {
            base.collect(obj, prefix, record, errors);
        }

        for spec in &self.fields {
            let pointer = format!("{prefix}/{}", escape_pointer_token(spec.name));
            match obj.get(spec.name).filter(|v| !v.is_null()) {
                None if spec.required => errors.push(FieldError::MissingField { pointer }),
                None => {
                    record.insert(spec.name.to_string(), spec.default.clone());
                }
                Some(raw) => {
                    if let Some(value) = check_value(spec, raw, &pointer, errors) {
                        record.insert(spec.name.to_string(), value);
                    }
                }
            }
        }
    }
}

/// Coerce and bound-check one supplied value. Pushes errors and returns `None` on failure.
fn check_value(
    spec: &FieldSpec,
    raw: &Value,
    pointer: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let mismatch = |errors: &mut Vec<FieldError>| {
        errors.push(FieldError::TypeMismatch {
            pointer: pointer.to_string(),
            expected: spec.kind.expected(),
        });
        None
    };

    match &spec.kind {
        FieldKind::Text => {
            let Some(s) = raw.as_str() else {
                return mismatch(errors);
            };
            check_length(spec, s, pointer, errors).then(|| Value::String(s.to_string()))
        }
        FieldKind::Integer => {
            let Some(n) = coerce_integer(raw) else {
                return mismatch(errors);
            };
            let mut ok = true;
            for bound in spec.bounds.iter().filter(|b| !b.holds(n)) {
                errors.push(FieldError::ConstraintViolation {
                    pointer: pointer.to_string(),
                    message: bound.message(),
                });
                ok = false;
            }
            ok.then(|| Value::Number(Number::from(n)))
        }
        FieldKind::Boolean => match coerce_bool(raw) {
            Some(b) => Some(Value::Bool(b)),
            None => mismatch(errors),
        },
        FieldKind::Enum(members) => {
            let Some(s) = raw.as_str() else {
                return mismatch(errors);
            };
            if members.iter().any(|m| *m == s) {
                Some(Value::String(s.to_string()))
            } else {
                errors.push(FieldError::InvalidEnumValue {
                    pointer: pointer.to_string(),
                    allowed: *members,
                });
                None
            }
        }
        FieldKind::Email => match raw.as_str() {
            Some(s) if formats::is_email(s) => Some(Value::String(s.to_string())),
            _ => mismatch(errors),
        },
        FieldKind::Url => match raw.as_str() {
            Some(s) if formats::is_http_url(s) => Some(Value::String(s.to_string())),
            _ => mismatch(errors),
        },
        FieldKind::PaymentCard => match raw.as_str().and_then(formats::normalize_card_number) {
            Some(digits) => Some(Value::String(digits)),
            None => mismatch(errors),
        },
        FieldKind::Nested(shape) => {
            let Some(obj) = raw.as_object() else {
                return mismatch(errors);
            };
            let before = errors.len();
            let mut nested = Record::new();
            shape.collect(obj, pointer, &mut nested, errors);
            (errors.len() == before).then_some(Value::Object(nested))
        }
    }
}

fn check_length(spec: &FieldSpec, s: &str, pointer: &str, errors: &mut Vec<FieldError>) -> bool {
    let len = s.chars().count();
    if let Some(min) = spec.min_length.filter(|min| len < *min) {
        errors.push(FieldError::ConstraintViolation {
            pointer: pointer.to_string(),
            message: format!("ensure this value has at least {min} characters"),
        });
        return false;
    }
    if let Some(max) = spec.max_length.filter(|max| len > *max) {
        errors.push(FieldError::ConstraintViolation {
            pointer: pointer.to_string(),
            message: format!("ensure this value has at most {max} characters"),
        });
        return false;
    }
    true
}

fn coerce_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
