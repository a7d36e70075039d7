use std::path::{Path, PathBuf};

use typed_builder::TypedBuilder;

pub static ENV_FIXTURES: &str = "BILLMOCK_FIXTURES";
pub static ENV_FILTERABLE_FIELDS: &str = "BILLMOCK_FILTERABLE_FIELDS";

/// Runtime settings, read from the environment (and `.env`, if present).
#[derive(Debug, Clone, Default, PartialEq, TypedBuilder)]
pub struct Config {
    /// JSON file used to seed the store.
    #[builder(default, setter(strip_option, into))]
    fixtures: Option<PathBuf>,
    /// Extra filterable fields, e.g. `(invoiceitem,customer,invoice)`.
    #[builder(default, setter(strip_option, into))]
    filterable_fields: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let non_empty = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            fixtures: non_empty(ENV_FIXTURES).map(PathBuf::from),
            filterable_fields: non_empty(ENV_FILTERABLE_FIELDS),
        }
    }

    pub fn fixtures(&self) -> Option<&Path> {
        self.fixtures.as_deref()
    }

    pub fn filterable_fields(&self) -> Option<&str> {
        self.filterable_fields.as_deref()
    }
}
