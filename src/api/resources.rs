use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use validator::{Validate, ValidationError, ValidationErrors};

lazy_static! {
    static ref RE_OBJECT_NAME: Regex = Regex::new(r"^[a-z][a-z_]*$").unwrap();
    static ref RE_FIELD_NAME: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
}

/// The object type a list is made of, e.g. `invoice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Validate)]
pub struct ResourceKind {
    #[validate(length(min = 1, max = 40), regex(path = *RE_OBJECT_NAME))]
    object: String,
}

impl ResourceKind {
    pub fn new(object: &str) -> Self {
        Self {
            object: object.to_string(),
        }
    }

    pub fn object(&self) -> &str {
        self.object.as_ref()
    }

    pub fn plural(&self) -> String {
        format!("{}s", self.object)
    }

    /// Collection url, e.g. `/v1/invoices`.
    pub fn url(&self) -> String {
        format!("/v1/{}", self.plural())
    }
}

fn validate_field_names(fields: &BTreeSet<String>) -> Result<(), ValidationError> {
    match fields.iter().find(|f| !RE_FIELD_NAME.is_match(f)) {
        Some(field) => {
            let mut err = ValidationError::new("field_name");
            err.add_param("value".into(), field);
            Err(err)
        }
        None => Ok(()),
    }
}

/// Per-resource list configuration.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ResourceDefinition {
    #[validate(nested)]
    kind: ResourceKind,
    #[validate(length(min = 1, max = 10), regex(path = *RE_FIELD_NAME))]
    id_prefix: String,
    #[validate(custom(function = validate_field_names))]
    filterable_by: BTreeSet<String>,
}

impl ResourceDefinition {
    pub fn new(object: &str, id_prefix: &str, filterable_by: &[&str]) -> Self {
        Self {
            kind: ResourceKind::new(object),
            id_prefix: id_prefix.to_string(),
            filterable_by: filterable_by.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn id_prefix(&self) -> &str {
        self.id_prefix.as_ref()
    }

    pub fn filterable_by(&self) -> &BTreeSet<String> {
        &self.filterable_by
    }
}

/// Registry of known resources, keyed by object name.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    definitions: HashMap<String, ResourceDefinition>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// The resources the mock serves out of the box.
    pub fn with_defaults() -> Self {
        let mut resources = Self::new();
        for definition in [
            ResourceDefinition::new("invoice", "in", &["customer", "status", "subscription"]),
            ResourceDefinition::new("invoiceitem", "ii", &[]),
            ResourceDefinition::new("customer", "cus", &[]),
            ResourceDefinition::new("subscription", "sub", &[]),
            ResourceDefinition::new("charge", "ch", &[]),
            ResourceDefinition::new("product", "prod", &[]),
            ResourceDefinition::new("price", "price", &[]),
        ] {
            resources
                .definitions
                .insert(definition.kind().object().to_string(), definition);
        }
        resources
    }

    pub fn register(&mut self, definition: ResourceDefinition) -> Result<(), ValidationErrors> {
        definition.validate()?;
        debug!("Registering resource {}", definition.kind().object());
        self.definitions
            .insert(definition.kind().object().to_string(), definition);
        Ok(())
    }

    /// Declares additional filterable fields on a registered resource.
    /// Returns `Ok(false)` when the resource is unknown.
    pub fn add_filterable_fields(
        &mut self,
        object: &str,
        fields: &[&str],
    ) -> Result<bool, ValidationErrors> {
        let Some(definition) = self.definitions.get(object) else {
            return Ok(false);
        };
        let mut definition = definition.clone();
        definition
            .filterable_by
            .extend(fields.iter().map(|f| f.to_string()));
        self.register(definition)?;
        Ok(true)
    }

    /// Looks a resource up by object name (`invoice`) or plural (`invoices`).
    pub fn find(&self, name: &str) -> Option<&ResourceDefinition> {
        self.definitions.get(name).or_else(|| {
            name.strip_suffix('s')
                .and_then(|singular| self.definitions.get(singular))
        })
    }
}
