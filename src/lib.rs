use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use api::Resources;
use entity::Record;
use serde_json::{Map, Value};
use store::Store;
use tracing::{debug, info};

pub mod api;
pub mod config;
pub mod store;

/// Adds the filterable fields configured in `BILLMOCK_FILTERABLE_FIELDS`.
///
/// The value lists groups of `(object,field,...)`, separated by commas,
/// e.g. `(invoiceitem,customer,invoice),(charge,customer)`.
pub fn register_filterable_fields(
    mut resources: Resources,
    config: &config::Config,
) -> Result<Resources> {
    debug!("register_filterable_fields");
    let Some(v) = config.filterable_fields() else {
        return Ok(resources);
    };
    let groups: Vec<&str> = v
        .strip_prefix('(')
        .ok_or_else(|| anyhow!("BILLMOCK_FILTERABLE_FIELDS must start with an opening parenthesis."))?
        .strip_suffix(')')
        .ok_or_else(|| anyhow!("BILLMOCK_FILTERABLE_FIELDS must end with a closing parenthesis."))?
        .split("),(")
        .collect();
    for group in groups {
        debug!("Processing {group}");
        let p: Vec<&str> = group.split(',').map(str::trim).collect();
        if p.len() < 2 {
            bail!("Invalid value {group} inside BILLMOCK_FILTERABLE_FIELDS");
        }
        let object = p[0];
        let known = resources
            .add_filterable_fields(object, &p[1..])
            .map_err(|e| anyhow!("Invalid field name for {object}: {e}"))?;
        if !known {
            bail!("Unknown resource {object} inside BILLMOCK_FILTERABLE_FIELDS");
        }
    }

    Ok(resources)
}

/// Seeds the store from a JSON document of the form
/// `{"invoice": [{...}, ...], "customer": [...]}`.
pub fn seed_store(store: &Store, resources: &Resources, json: &str) -> Result<usize> {
    let fixtures: Map<String, Value> =
        serde_json::from_str(json).context("Fixtures must be a JSON object")?;
    let mut count = 0;
    for (name, records) in fixtures {
        let definition = resources
            .find(&name)
            .ok_or_else(|| anyhow!("Unknown resource {name} in fixtures"))?;
        let Value::Array(records) = records else {
            bail!("Fixtures for {name} must be an array");
        };
        for value in records {
            let record = Record::try_from(value)
                .map_err(|v| anyhow!("Fixture for {name} is not an object: {v}"))?;
            store
                .insert(definition, record)
                .with_context(|| format!("Storing {name} fixture"))?;
            count += 1;
        }
    }
    Ok(count)
}

pub fn load_fixtures(store: &Store, resources: &Resources, path: &Path) -> Result<usize> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read fixtures {}", path.display()))?;
    let count = seed_store(store, resources, &json)?;
    info!("Loaded {} fixture records from {}", count, path.display());
    Ok(count)
}

/// Turns `key=value` arguments into request parameters. Values that parse
/// as JSON keep their type; keys ending in `[]` collect into an array.
pub fn parse_request_params(args: impl IntoIterator<Item = String>) -> Result<Map<String, Value>> {
    let mut params = Map::new();
    for arg in args {
        let (key, raw) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected key=value, got {arg}"))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        if key.ends_with("[]") {
            let entry = params
                .entry(key.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(value);
            }
        } else {
            params.insert(key.to_string(), value);
        }
    }
    Ok(params)
}
