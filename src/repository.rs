use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    ChapterOverview, DocumentContext, Interaction, InteractionFlag, NewInteraction, Project, StyleContext,
    StyleProfile, SubscriptionTier,
};

/// Persistence seam for the coaching engine.
///
/// Every lookup returns `Ok(None)` for a missing row; ownership decisions are
/// left to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoachingRepository: Send + Sync {
    /// Document with its scene, chapter, project and optional style profile
    async fn find_document_context(&self, document_id: &str) -> Result<Option<DocumentContext>>;
    async fn find_project(&self, project_id: &str) -> Result<Option<Project>>;
    async fn find_chapter_overview(&self, chapter_id: &str) -> Result<Option<ChapterOverview>>;
    async fn subscription_tier(&self, user_id: &str) -> Result<Option<SubscriptionTier>>;
    /// Interactions created by `user_id` at or after `since`
    async fn count_interactions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u32>;
    async fn create_interaction(&self, interaction: NewInteraction) -> Result<Interaction>;
    async fn find_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>>;
    /// Set one lifecycle flag and return the updated record
    async fn set_interaction_flag(&self, interaction_id: &str, flag: InteractionFlag) -> Result<Option<Interaction>>;
    async fn list_project_interactions(&self, project_id: &str, user_id: &str, limit: usize) -> Result<Vec<Interaction>>;
    async fn get_or_create_style_profile(&self, project_id: &str) -> Result<StyleProfile>;
    async fn upsert_style_profile(&self, project_id: &str, context: StyleContext) -> Result<StyleProfile>;
}

/// SQLite-backed repository
pub struct SqliteRepository {
    database: Database,
}

impl SqliteRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Open the database at `database_url` and wrap it
    pub fn open(database_url: &str) -> Result<Self> {
        let database = Database::new(database_url)?;
        Ok(Self { database })
    }

    /// Underlying database handle, for manuscript writes outside the coaching surface
    pub fn database(&self) -> &Database {
        &self.database
    }
}

#[async_trait]
impl CoachingRepository for SqliteRepository {
    async fn find_document_context(&self, document_id: &str) -> Result<Option<DocumentContext>> {
        self.database.get_document_context(document_id)
    }

    async fn find_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.database.get_project(project_id)
    }

    async fn find_chapter_overview(&self, chapter_id: &str) -> Result<Option<ChapterOverview>> {
        self.database.get_chapter_overview(chapter_id)
    }

    async fn subscription_tier(&self, user_id: &str) -> Result<Option<SubscriptionTier>> {
        self.database.get_subscription_tier(user_id)
    }

    async fn count_interactions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u32> {
        self.database.count_interactions_since(user_id, since)
    }

    async fn create_interaction(&self, interaction: NewInteraction) -> Result<Interaction> {
        self.database.add_interaction(interaction)
    }

    async fn find_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>> {
        self.database.get_interaction(interaction_id)
    }

    async fn set_interaction_flag(&self, interaction_id: &str, flag: InteractionFlag) -> Result<Option<Interaction>> {
        self.database.set_interaction_flag(interaction_id, flag)
    }

    async fn list_project_interactions(&self, project_id: &str, user_id: &str, limit: usize) -> Result<Vec<Interaction>> {
        self.database.list_project_interactions(project_id, user_id, limit)
    }

    async fn get_or_create_style_profile(&self, project_id: &str) -> Result<StyleProfile> {
        self.database.get_or_create_style_profile(project_id)
    }

    async fn upsert_style_profile(&self, project_id: &str, context: StyleContext) -> Result<StyleProfile> {
        self.database.upsert_style_profile(project_id, &context)
    }
}
