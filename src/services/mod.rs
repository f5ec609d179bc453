pub mod password;
pub mod store;

// Re-export commonly used items
pub use password::{is_hashed, PasswordHasher, Pbkdf2Hasher};
pub use store::{JsonFileStore, MemoryStore, RecordStore};
