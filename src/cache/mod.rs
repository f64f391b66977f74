mod record;
mod store;
mod table;

pub use record::{CacheRecord, CacheSchema, PROGRAM_COLUMN, VALUE_COLUMN};
pub use store::ResultCache;
