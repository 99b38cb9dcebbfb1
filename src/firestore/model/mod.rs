mod database_id;
mod field_path;
mod geo_point;
mod resource_path;
mod timestamp;
mod vector_value;

pub use database_id::DatabaseId;
pub use field_path::{FieldPath, IntoFieldPath};
pub use geo_point::GeoPoint;
pub use resource_path::ResourcePath;
pub use timestamp::Timestamp;
pub use vector_value::VectorValue;
