use modkit::validation::{Schema, Shape};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::model::{Developer, HairColor, Location, Person};
use crate::domain::schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HairColorDto {
    White,
    Brown,
    Black,
    Blonde,
    Red,
}

/// REST DTO for a person record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "first_name": "Facundo",
    "last_name": "García Martoni",
    "age": 21,
    "hair_color": "blonde",
    "is_married": false
}))]
pub struct PersonDto {
    /// 1 to 50 characters
    pub first_name: String,
    /// 1 to 50 characters
    pub last_name: String,
    /// Greater than 0, at most 115
    pub age: i64,
    pub hair_color: Option<HairColorDto>,
    pub is_married: Option<bool>,
}

/// REST DTO for a developer: person fields plus contact and billing details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeveloperDto {
    #[serde(flatten)]
    pub person: PersonDto,
    pub email: String,
    /// http or https URL
    pub site: String,
    /// Card number; returned as digits only
    pub payment_card: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocationDto {
    pub city: String,
    pub state: String,
    pub country: String,
}

/// REST DTO for `PUT /person/{person_id}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePersonReq {
    pub person: PersonDto,
    pub location: LocationDto,
}

/// REST DTO for query parameters of `GET /person/detail`
#[derive(Debug, Clone, Deserialize)]
pub struct ShowPersonQuery {
    pub name: Option<String>,
    pub age: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonIdPath {
    pub person_id: i64,
}

impl Shape for PersonDto {
    fn schema() -> &'static Schema {
        &schema::PERSON
    }
}

impl Shape for DeveloperDto {
    fn schema() -> &'static Schema {
        &schema::DEVELOPER
    }
}

impl Shape for LocationDto {
    fn schema() -> &'static Schema {
        &schema::LOCATION
    }
}

impl Shape for UpdatePersonReq {
    fn schema() -> &'static Schema {
        &schema::UPDATE_PERSON
    }
}

impl Shape for ShowPersonQuery {
    fn schema() -> &'static Schema {
        &schema::SHOW_PERSON_QUERY
    }
}

impl Shape for PersonIdPath {
    fn schema() -> &'static Schema {
        &schema::PERSON_ID_PATH
    }
}

// Conversion implementations between REST DTOs and domain models

impl From<HairColorDto> for HairColor {
    fn from(c: HairColorDto) -> Self {
        match c {
            HairColorDto::White => HairColor::White,
            HairColorDto::Brown => HairColor::Brown,
            HairColorDto::Black => HairColor::Black,
            HairColorDto::Blonde => HairColor::Blonde,
            HairColorDto::Red => HairColor::Red,
        }
    }
}

impl From<HairColor> for HairColorDto {
    fn from(c: HairColor) -> Self {
        match c {
            HairColor::White => HairColorDto::White,
            HairColor::Brown => HairColorDto::Brown,
            HairColor::Black => HairColorDto::Black,
            HairColor::Blonde => HairColorDto::Blonde,
            HairColor::Red => HairColorDto::Red,
        }
    }
}

impl From<PersonDto> for Person {
    fn from(dto: PersonDto) -> Self {
        Self {
            first_name: dto.first_name,
            last_name: dto.last_name,
            age: dto.age,
            hair_color: dto.hair_color.map(Into::into),
            is_married: dto.is_married,
        }
    }
}

impl From<Person> for PersonDto {
    fn from(p: Person) -> Self {
        Self {
            first_name: p.first_name,
            last_name: p.last_name,
            age: p.age,
            hair_color: p.hair_color.map(Into::into),
            is_married: p.is_married,
        }
    }
}

impl From<DeveloperDto> for Developer {
    fn from(dto: DeveloperDto) -> Self {
        Self {
            person: dto.person.into(),
            email: dto.email,
            site: dto.site,
            payment_card: dto.payment_card,
        }
    }
}

impl From<Developer> for DeveloperDto {
    fn from(d: Developer) -> Self {
        Self {
            person: d.person.into(),
            email: d.email,
            site: d.site,
            payment_card: d.payment_card,
        }
    }
}

impl From<LocationDto> for Location {
    fn from(dto: LocationDto) -> Self {
        Self {
            city: dto.city,
            state: dto.state,
            country: dto.country,
        }
    }
}
