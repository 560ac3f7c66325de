mod repository;
mod schema;

pub use repository::{KeywordClaim, Repository};
