//! Object storage for batch files.
//!
//! [`ObjectStore`] is the storage boundary, with in-memory and
//! local-filesystem backends. [`BatchWriter`] and [`ObjectSetSelector`] sit on
//! top of it.

pub mod codec;
pub mod error;
pub mod keys;
pub mod local;
pub mod memory;
pub mod selector;
pub mod store;
pub mod writer;

pub use codec::{decode_rows, encode_rows};
pub use error::StorageError;
pub use keys::{batch_key, day_prefix, normalize_prefix};
pub use local::LocalFsStore;
pub use memory::MemoryObjectStore;
pub use selector::{filter_by_hour, ObjectSetSelector};
pub use store::{ObjectMeta, ObjectStore};
pub use writer::BatchWriter;
