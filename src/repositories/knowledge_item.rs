//! Knowledge item repository for database operations
//!
//! Lookup paths mirror the upsert identity used by the sync orchestrator:
//! items with a source ID are matched on (user, category, source_id), items
//! without one on (user, category, title).

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::knowledge_item::{self, Entity as KnowledgeItem, KnowledgeCategory};

/// Input for inserting a new knowledge item.
#[derive(Debug, Clone)]
pub struct NewKnowledgeItem {
    pub user_id: Uuid,
    pub category: KnowledgeCategory,
    pub subcategory: String,
    pub title: String,
    pub content: JsonValue,
    pub summary: String,
    pub source_id: Option<String>,
    pub source_name: Option<String>,
}

/// Replacement fields applied when a mirrored record is re-synced.
#[derive(Debug, Clone)]
pub struct KnowledgeItemUpdate {
    pub title: String,
    pub subcategory: String,
    pub content: JsonValue,
    pub summary: String,
    pub source_name: Option<String>,
}

/// Repository for knowledge item database operations
#[derive(Debug, Clone)]
pub struct KnowledgeItemRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl KnowledgeItemRepository {
    /// Creates a new KnowledgeItemRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds an item by its upsert identity (user, category, source_id)
    pub async fn find_by_source(
        &self,
        user_id: Uuid,
        category: KnowledgeCategory,
        source_id: &str,
    ) -> Result<Option<knowledge_item::Model>> {
        Ok(KnowledgeItem::find()
            .filter(knowledge_item::Column::UserId.eq(user_id))
            .filter(knowledge_item::Column::Category.eq(category))
            .filter(knowledge_item::Column::SourceId.eq(source_id))
            .one(&*self.db)
            .await?)
    }

    /// Finds an item without a source ID by (user, category, title)
    pub async fn find_by_title(
        &self,
        user_id: Uuid,
        category: KnowledgeCategory,
        title: &str,
    ) -> Result<Option<knowledge_item::Model>> {
        Ok(KnowledgeItem::find()
            .filter(knowledge_item::Column::UserId.eq(user_id))
            .filter(knowledge_item::Column::Category.eq(category))
            .filter(knowledge_item::Column::Title.eq(title))
            .one(&*self.db)
            .await?)
    }

    /// Inserts a new knowledge item
    pub async fn insert(&self, input: NewKnowledgeItem) -> Result<knowledge_item::Model> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let active = knowledge_item::ActiveModel {
            id: Set(id),
            user_id: Set(input.user_id),
            category: Set(input.category),
            subcategory: Set(input.subcategory),
            title: Set(input.title),
            content: Set(input.content),
            summary: Set(input.summary),
            source_id: Set(input.source_id),
            source_name: Set(input.source_name),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        active.insert(&*self.db).await?;

        let fetched = KnowledgeItem::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("knowledge item not persisted"))
    }

    /// Replaces the mirrored fields of an existing item in place
    pub async fn update_content(
        &self,
        id: Uuid,
        update: KnowledgeItemUpdate,
    ) -> Result<knowledge_item::Model> {
        let existing = KnowledgeItem::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Knowledge item '{}' not found", id))?;

        let mut model: knowledge_item::ActiveModel = existing.into();
        model.title = Set(update.title);
        model.subcategory = Set(update.subcategory);
        model.content = Set(update.content);
        model.summary = Set(update.summary);
        model.source_name = Set(update.source_name);
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Lists a user's items, optionally narrowed to one category
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        category: Option<KnowledgeCategory>,
    ) -> Result<Vec<knowledge_item::Model>> {
        let mut query = KnowledgeItem::find()
            .filter(knowledge_item::Column::UserId.eq(user_id))
            .order_by_asc(knowledge_item::Column::CreatedAt)
            .order_by_asc(knowledge_item::Column::Id);

        if let Some(category) = category {
            query = query.filter(knowledge_item::Column::Category.eq(category));
        }

        Ok(query.all(&*self.db).await?)
    }
}
