//! Durable storage for notifications: the source of truth the producer reads
//! from and the consumer writes delivery outcomes back to.

pub mod memory;
pub mod postgres;
mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::Store;
