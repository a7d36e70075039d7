use entity::{Record, ID_FIELD};
use serde_json::Value;

/// A filter operand reduced to the identifier it stands for.
///
/// List filters accept either a bare id (`customer=cus_1`) or an expanded
/// object carrying that id (`customer={"id": "cus_1", ...}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOperand {
    Literal(String),
    Reference { id: String },
}

impl FilterOperand {
    /// Returns `None` for values that carry no identifier (null, booleans,
    /// arrays, objects without a string `id`). Numbers count as ids in
    /// their string form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(FilterOperand::Literal(s.clone())),
            Value::Number(n) => Some(FilterOperand::Literal(n.to_string())),
            Value::Object(fields) => fields
                .get(ID_FIELD)
                .and_then(Value::as_str)
                .map(|id| FilterOperand::Reference { id: id.to_string() }),
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            FilterOperand::Literal(id) => id,
            FilterOperand::Reference { id } => id,
        }
    }
}

/// Equality filter on one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    field_name: String,
    value: Value,
    operand: Option<FilterOperand>,
}

impl FieldFilter {
    pub fn new(field_name: &str, value: Value) -> Self {
        let operand = FilterOperand::from_value(&value);
        Self {
            field_name: field_name.to_string(),
            value,
            operand,
        }
    }

    pub fn field_name(&self) -> &str {
        self.field_name.as_ref()
    }

    /// A record matches when its field equals the filter value, or when
    /// both sides resolve to the same identifier. A missing field compares
    /// as null.
    pub fn matches(&self, record: &Record) -> bool {
        let field = record.get(&self.field_name).unwrap_or(&Value::Null);
        if *field == self.value {
            return true;
        }
        match (&self.operand, FilterOperand::from_value(field)) {
            (Some(expected), Some(actual)) => expected.id() == actual.id(),
            _ => false,
        }
    }
}
