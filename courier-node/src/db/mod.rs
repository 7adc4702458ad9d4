mod types;
pub use types::DbError;

mod bucket;
pub use bucket::Bucket;

mod merge_operators;
pub use merge_operators::index_key;

mod builder;
pub use builder::Builder;
