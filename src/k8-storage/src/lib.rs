mod error;
mod interface;
mod memory;

pub use error::StorageError;
pub use interface::DeletePropagation;
pub use interface::StorageEvent;
pub use interface::StorageInterface;
pub use interface::StorageList;
pub use interface::object_meta;
pub use interface::object_revision;
pub use memory::InMemoryStorage;

pub type SharedStorage = std::sync::Arc<dyn StorageInterface>;
