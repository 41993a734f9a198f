mod api_types;
mod collection;
mod hnsw_parameters;
mod metadata;
mod record;

pub use api_types::*;
pub use collection::*;
pub use hnsw_parameters::*;
pub use metadata::*;
pub use record::*;
