pub mod record;

pub use record::Record;

pub static ID_FIELD: &str = "id";
pub static CREATED_FIELD: &str = "created";
pub static ACTIVE_FIELD: &str = "active";
pub static OBJECT_FIELD: &str = "object";
