pub mod controller;
pub mod models;
pub mod storage;
pub mod store;
pub use controller::*;
pub use models::*;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::ChatStore;
