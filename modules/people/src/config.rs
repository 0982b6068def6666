use serde::{Deserialize, Serialize};

/// `modules.people` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PeopleConfig {
    /// Key of the single entry returned by `GET /`.
    #[serde(default = "default_greeting_key")]
    pub greeting_key: String,
    #[serde(default = "default_greeting_value")]
    pub greeting_value: String,
}

fn default_greeting_key() -> String {
    "Hello".to_string()
}

fn default_greeting_value() -> String {
    "World".to_string()
}

impl Default for PeopleConfig {
    fn default() -> Self {
        Self {
            greeting_key: default_greeting_key(),
            greeting_value: default_greeting_value(),
        }
    }
}
