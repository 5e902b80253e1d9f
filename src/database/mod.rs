pub mod manager;
pub mod memory;
pub mod models;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use models::enhancement::{Enhancement, EnhancementDraft};
pub use repository::EnhancementRepository;
pub use store::{EnhancementFilter, EnhancementStore};
