//! SeaORM entity models for the PSA sync service.

pub mod connection;
pub mod knowledge_item;
pub mod sync_record;

pub use connection::Entity as PsaConnection;
pub use knowledge_item::Entity as KnowledgeItem;
pub use sync_record::Entity as SyncRecord;
