use modkit::validation::Record;
use serde_json::Value;

/// Closed set of accepted hair colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HairColor {
    White,
    Brown,
    Black,
    Blonde,
    Red,
}

impl HairColor {
    pub const ALL: [HairColor; 5] = [
        HairColor::White,
        HairColor::Brown,
        HairColor::Black,
        HairColor::Blonde,
        HairColor::Red,
    ];

    /// Wire names, in declaration order.
    pub const NAMES: &'static [&'static str] = &["white", "brown", "black", "blonde", "red"];

    pub fn as_str(self) -> &'static str {
        match self {
            HairColor::White => "white",
            HairColor::Brown => "brown",
            HairColor::Black => "black",
            HairColor::Blonde => "blonde",
            HairColor::Red => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    pub age: i64,
    pub hair_color: Option<HairColor>,
    pub is_married: Option<bool>,
}

/// A person with verified contact and billing details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Developer {
    pub person: Person,
    pub email: String,
    pub site: String,
    /// Digits only.
    pub payment_card: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Person {
    /// Flat field map. Absent optionals become `null`.
    pub fn into_record(self) -> Record {
        Record::from_iter([
            ("first_name".to_string(), Value::from(self.first_name)),
            ("last_name".to_string(), Value::from(self.last_name)),
            ("age".to_string(), Value::from(self.age)),
            (
                "hair_color".to_string(),
                Value::from(self.hair_color.map(HairColor::as_str)),
            ),
            ("is_married".to_string(), Value::from(self.is_married)),
        ])
    }
}

impl Location {
    pub fn into_record(self) -> Record {
        Record::from_iter([
            ("city".to_string(), Value::from(self.city)),
            ("state".to_string(), Value::from(self.state)),
            ("country".to_string(), Value::from(self.country)),
        ])
    }
}
