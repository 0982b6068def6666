use modkit::validation::Record;
use serde_json::Value;
use tracing::{debug, info};

use super::error::DomainError;
use super::model::{Developer, Location, Person};
use crate::config::PeopleConfig;

/// Stateless operations over already validated records.
#[derive(Debug, Clone)]
pub struct Service {
    config: PeopleConfig,
}

impl Service {
    pub fn new(config: PeopleConfig) -> Self {
        Self { config }
    }

    pub fn greeting(&self) -> Record {
        Record::from_iter([(
            self.config.greeting_key.clone(),
            Value::from(self.config.greeting_value.clone()),
        )])
    }

    pub fn create_person(&self, person: Person) -> Person {
        debug!(first_name = %person.first_name, "person accepted");
        person
    }

    pub fn create_developer(&self, developer: Developer) -> Developer {
        debug!(first_name = %developer.person.first_name, "developer accepted");
        developer
    }

    /// `{name: age}`; the key is `"null"` when no name was given.
    pub fn show_person(&self, name: Option<&str>, age: i64) -> Record {
        Record::from_iter([(name.unwrap_or("null").to_string(), Value::from(age))])
    }

    pub fn person_exists(&self, person_id: i64) -> Record {
        Record::from_iter([(person_id.to_string(), Value::from("It exists"))])
    }

    /// Person fields and location fields as one mapping.
    pub fn update_person(
        &self,
        person_id: i64,
        person: Person,
        location: Location,
    ) -> Result<Record, DomainError> {
        let merged = merge_disjoint(person.into_record(), location.into_record())?;
        info!(person_id, fields = merged.len(), "person updated");
        Ok(merged)
    }
}

/// Union of two records. Fails if any key appears in both.
pub fn merge_disjoint(mut left: Record, right: Record) -> Result<Record, DomainError> {
    if let Some(key) = right.keys().find(|k| left.contains_key(k.as_str())) {
        return Err(DomainError::field_collision(key.clone()));
    }
    left.extend(right);
    Ok(left)
}
