mod error;
mod path;
mod store;

pub use error::StorageError;
pub use path::StoredPath;
pub use store::{BoxReader, FileStore};
