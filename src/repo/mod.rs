pub mod document_store;
pub mod memory_store;
pub mod pg_store;
pub mod redis_store;

pub use document_store::DocumentStore;
pub use memory_store::InMemoryDocumentStore;
pub use pg_store::PgDocumentStore;
pub use redis_store::RedisDocumentStore;
