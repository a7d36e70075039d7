pub mod filter;
mod list_resource;
pub mod list_view;
pub mod resources;
pub mod types;

pub use list_resource::{api_list_resource, ListQuery};
pub use list_view::{ListObject, PagedView};
pub use resources::{ResourceDefinition, ResourceKind, Resources};
pub use types::{CursorParam, ListParams};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Eq, PartialEq)]
pub enum ApiErrors {
    #[error("Internal server error")]
    InternalServerError,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No such object id: {id}")]
    CursorNotFound { param: CursorParam, id: String },
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),
}

impl ApiErrors {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiErrors::BadRequest(_) => 400,
            ApiErrors::NotFound(_) | ApiErrors::CursorNotFound { .. } => 404,
            ApiErrors::InternalServerError | ApiErrors::UnknownAttribute(_) => 500,
        }
    }

    /// Body in the shape the billing API uses for error responses.
    pub fn error_body(&self) -> ErrorBody {
        let (kind, param) = match self {
            ApiErrors::CursorNotFound { param, .. } => {
                ("invalid_request_error", Some(param.to_string()))
            }
            ApiErrors::BadRequest(_) | ApiErrors::NotFound(_) => ("invalid_request_error", None),
            ApiErrors::InternalServerError | ApiErrors::UnknownAttribute(_) => ("api_error", None),
        };
        ErrorBody {
            error: ErrorDetail {
                kind,
                message: self.to_string(),
                param,
            },
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize, Debug, PartialEq)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    param: Option<String>,
}
