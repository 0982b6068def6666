//! Field constraints for every record and bound parameter the module accepts.

use modkit::validation::{FieldSpec, Schema};
use once_cell::sync::Lazy;

use super::model::HairColor;

pub static PERSON: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "Person",
        vec![
            FieldSpec::text("first_name").length(1, 50),
            FieldSpec::text("last_name").length(1, 50),
            FieldSpec::integer("age").gt(0).le(115),
            FieldSpec::enumeration("hair_color", HairColor::NAMES).optional(),
            FieldSpec::boolean("is_married").optional(),
        ],
    )
});

/// Person plus contact and billing fields. The Person check always runs first.
pub static DEVELOPER: Lazy<Schema> = Lazy::new(|| {
    Schema::extends(
        "Developer",
        &PERSON,
        vec![
            FieldSpec::email("email"),
            FieldSpec::url("site"),
            FieldSpec::payment_card("payment_card"),
        ],
    )
});

pub static LOCATION: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "Location",
        vec![
            FieldSpec::text("city").length(1, 50),
            FieldSpec::text("state").length(1, 50),
            FieldSpec::text("country").length(1, 50),
        ],
    )
});

/// `PUT /person/{person_id}` body.
pub static UPDATE_PERSON: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "UpdatePerson",
        vec![
            FieldSpec::nested("person", &PERSON),
            FieldSpec::nested("location", &LOCATION),
        ],
    )
});

pub static SHOW_PERSON_QUERY: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "ShowPersonQuery",
        vec![
            FieldSpec::text("name").length(1, 50).optional(),
            FieldSpec::integer("age").ge(18),
        ],
    )
});

pub static PERSON_ID_PATH: Lazy<Schema> = Lazy::new(|| {
    Schema::new("PersonIdPath", vec![FieldSpec::integer("person_id").gt(0)])
});
