use serde_json::Value;

use super::schema::Schema;

/// Kind of value a field accepts, with the coercions described on [`Schema::validate`].
#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    /// Closed set of string members.
    Enum(&'static [&'static str]),
    Email,
    /// Absolute `http`/`https` URL with a host.
    Url,
    /// Card number passing format and checksum checks.
    PaymentCard,
    Nested(Box<Schema>),
}

impl FieldKind {
    /// Human name used in type mismatch messages.
    pub fn expected(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Enum(_) => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Email => "email address",
            FieldKind::Url => "http or https URL",
            FieldKind::PaymentCard => "payment card number",
            FieldKind::Nested(_) => "object",
        }
    }

    /// OpenAPI primitive type for parameter documentation.
    pub fn openapi_type(&self) -> &'static str {
        match self {
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Nested(_) => "object",
            _ => "string",
        }
    }
}

/// Numeric bound on an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Gt(i64),
    Ge(i64),
    Lt(i64),
    Le(i64),
}

impl Bound {
    pub fn holds(&self, v: i64) -> bool {
        match *self {
            Bound::Gt(b) => v > b,
            Bound::Ge(b) => v >= b,
            Bound::Lt(b) => v < b,
            Bound::Le(b) => v <= b,
        }
    }

    pub fn message(&self) -> String {
        match *self {
            Bound::Gt(b) => format!("ensure this value is greater than {b}"),
            Bound::Ge(b) => format!("ensure this value is greater than or equal to {b}"),
            Bound::Lt(b) => format!("ensure this value is less than {b}"),
            Bound::Le(b) => format!("ensure this value is less than or equal to {b}"),
        }
    }
}

/// Declaration of one field: kind, presence rule, default and bounds.
///
/// ```ignore
/// FieldSpec::text("first_name").length(1, 50);
/// FieldSpec::integer("age").gt(0).le(115);
/// FieldSpec::enumeration("hair_color", &["white", "brown"]).optional();
/// ```
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) kind: FieldKind,
    pub(crate) required: bool,
    pub(crate) default: Value,
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) bounds: Vec<Bound>,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: Value::Null,
            min_length: None,
            max_length: None,
            bounds: Vec::new(),
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn enumeration(name: &'static str, members: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Enum(members))
    }

    pub fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn url(name: &'static str) -> Self {
        Self::new(name, FieldKind::Url)
    }

    pub fn payment_card(name: &'static str) -> Self {
        Self::new(name, FieldKind::PaymentCard)
    }

    pub fn nested(name: &'static str, shape: &Schema) -> Self {
        Self::new(name, FieldKind::Nested(Box::new(shape.clone())))
    }

    /// Absent or `null` resolves to the default instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Optional with an explicit fallback value.
    pub fn default_value(mut self, value: Value) -> Self {
        self.required = false;
        self.default = value;
        self
    }

    /// Inclusive character-count bounds for text.
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max);
        self
    }

    pub fn gt(self, b: i64) -> Self {
        self.bound(Bound::Gt(b))
    }

    pub fn ge(self, b: i64) -> Self {
        self.bound(Bound::Ge(b))
    }

    pub fn lt(self, b: i64) -> Self {
        self.bound(Bound::Lt(b))
    }

    pub fn le(self, b: i64) -> Self {
        self.bound(Bound::Le(b))
    }

    fn bound(mut self, b: Bound) -> Self {
        self.bounds.push(b);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}
