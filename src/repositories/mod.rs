//! Repository layer encapsulating SeaORM operations.

pub mod connection;
pub mod knowledge_item;
pub mod sync_record;

pub use connection::ConnectionRepository;
pub use knowledge_item::KnowledgeItemRepository;
pub use sync_record::SyncRecordRepository;
