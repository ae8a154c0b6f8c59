use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{CoachError, Result};
use crate::models::{
    Chapter, ChapterOverview, Document, DocumentContext, Formality, Intensity, Interaction, InteractionFlag,
    InteractionFlags, NewInteraction, NewProject, PointOfView, Project, RequestType, Scene, SceneDocument,
    StyleContext, StyleProfile, SubscriptionTier, Tense,
};
use crate::schema::{ai_interactions, chapters, documents, projects, scenes, style_profiles, subscriptions, users};
use crate::temperature::word_count_of;

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Store enumerations as their upper-snake literals
macro_rules! sql_literal {
    ($($ty:ty),+ $(,)?) => {$(
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: CoachError| FromSqlError::Other(Box::new(e)))
            }
        }
    )+};
}

sql_literal!(PointOfView, Tense, Formality, Intensity, RequestType, SubscriptionTier);

/// Database manager for handling connections and operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (creating if needed) the database at a `sqlite:` URL with default pool settings
    pub fn new(database_url: &str) -> Result<Self> {
        Self::open(database_url, 8, Duration::from_secs(30))
    }

    /// Open the database described by configuration
    pub fn from_config(config: &DatabaseConfig, database_url: &str) -> Result<Self> {
        Self::open(
            database_url,
            config.max_connections,
            Duration::from_secs(config.connection_timeout_secs),
        )
    }

    fn open(database_url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let path = database_url
            .strip_prefix("sqlite:")
            .map_or(database_url, |rest| rest.trim_start_matches("//"));

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Set up connection manager and pool
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.busy_timeout(Duration::from_secs(5))
        });
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(timeout)
            .build(manager)?;

        // Run migrations
        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2026-01-10-000000_create_tables/up.sql"))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    // ── Manuscript glue ────────────────────────────────────────────────────

    /// Create a user and return its id
    pub fn create_user(&self, email: &str, name: Option<&str>) -> Result<String> {
        let conn = self.get_connection()?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                users::TABLE,
                users::ID,
                users::EMAIL,
                users::NAME,
                users::CREATED_AT
            ),
            params![id, email, name, Utc::now()],
        )?;

        Ok(id)
    }

    /// Set (or replace) a user's subscription tier
    pub fn set_subscription_tier(&self, user_id: &str, tier: SubscriptionTier) -> Result<()> {
        let conn = self.get_connection()?;

        conn.execute(
            &format!(
                "INSERT INTO {table} ({id}, {user}, {tier}) VALUES (?1, ?2, ?3) \
                 ON CONFLICT({user}) DO UPDATE SET {tier} = excluded.{tier}",
                table = subscriptions::TABLE,
                id = subscriptions::ID,
                user = subscriptions::USER_ID,
                tier = subscriptions::TIER
            ),
            params![Uuid::new_v4().to_string(), user_id, tier],
        )?;

        Ok(())
    }

    /// Subscription tier on record, if any
    pub fn get_subscription_tier(&self, user_id: &str) -> Result<Option<SubscriptionTier>> {
        let conn = self.get_connection()?;

        let tier = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?1",
                    subscriptions::TIER,
                    subscriptions::TABLE,
                    subscriptions::USER_ID
                ),
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(tier)
    }

    /// Create a project
    pub fn create_project(&self, new_project: NewProject) -> Result<Project> {
        let conn = self.get_connection()?;
        let project = Project {
            id: Uuid::new_v4().to_string(),
            user_id: new_project.user_id,
            title: new_project.title,
            genre: new_project.genre,
            created_at: Utc::now(),
        };

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
                projects::TABLE,
                projects::ID,
                projects::USER_ID,
                projects::TITLE,
                projects::GENRE,
                projects::CREATED_AT
            ),
            params![project.id, project.user_id, project.title, project.genre, project.created_at],
        )?;

        Ok(project)
    }

    /// Create a chapter
    pub fn create_chapter(&self, project_id: &str, title: &str, order_index: i64) -> Result<Chapter> {
        let conn = self.get_connection()?;
        let chapter = Chapter {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            order_index,
        };

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                chapters::TABLE,
                chapters::ID,
                chapters::PROJECT_ID,
                chapters::TITLE,
                chapters::ORDER_INDEX
            ),
            params![chapter.id, chapter.project_id, chapter.title, chapter.order_index],
        )?;

        Ok(chapter)
    }

    /// Create a scene
    pub fn create_scene(&self, chapter_id: &str, title: &str, order_index: i64) -> Result<Scene> {
        let conn = self.get_connection()?;
        let scene = Scene {
            id: Uuid::new_v4().to_string(),
            chapter_id: chapter_id.to_string(),
            title: title.to_string(),
            order_index,
        };

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                scenes::TABLE,
                scenes::ID,
                scenes::CHAPTER_ID,
                scenes::TITLE,
                scenes::ORDER_INDEX
            ),
            params![scene.id, scene.chapter_id, scene.title, scene.order_index],
        )?;

        Ok(scene)
    }

    /// Write a scene's document, recomputing its stored word count
    pub fn save_document(&self, scene_id: &str, content: &str) -> Result<Document> {
        let conn = self.get_connection()?;
        let word_count = i64::try_from(word_count_of(content)).unwrap_or(i64::MAX);

        conn.execute(
            &format!(
                "INSERT INTO {table} ({id}, {scene}, {content}, {words}, {updated}) VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT({scene}) DO UPDATE SET {content} = excluded.{content}, \
                 {words} = excluded.{words}, {updated} = excluded.{updated}",
                table = documents::TABLE,
                id = documents::ID,
                scene = documents::SCENE_ID,
                content = documents::CONTENT,
                words = documents::WORD_COUNT,
                updated = documents::UPDATED_AT
            ),
            params![Uuid::new_v4().to_string(), scene_id, content, word_count, Utc::now()],
        )?;

        Self::query_document_by_scene(&conn, scene_id)?
            .ok_or_else(|| CoachError::Other("Failed to retrieve saved document".to_string()))
    }

    /// Get a project by id
    pub fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        let conn = self.get_connection()?;
        Self::query_project(&conn, project_id)
    }

    /// Resolve document → scene → chapter → project, plus the project's style profile
    pub fn get_document_context(&self, document_id: &str) -> Result<Option<DocumentContext>> {
        let conn = self.get_connection()?;

        let Some(document) = Self::query_document(&conn, document_id)? else {
            return Ok(None);
        };
        let Some(scene) = Self::query_scene(&conn, &document.scene_id)? else {
            return Ok(None);
        };
        let Some(chapter) = Self::query_chapter(&conn, &scene.chapter_id)? else {
            return Ok(None);
        };
        let Some(project) = Self::query_project(&conn, &chapter.project_id)? else {
            return Ok(None);
        };
        let style_profile = Self::query_style_profile(&conn, &project.id)?;

        Ok(Some(DocumentContext {
            document,
            scene,
            chapter,
            project,
            style_profile,
        }))
    }

    /// Chapter with its project and ordered scenes
    pub fn get_chapter_overview(&self, chapter_id: &str) -> Result<Option<ChapterOverview>> {
        let conn = self.get_connection()?;

        let Some(chapter) = Self::query_chapter(&conn, chapter_id)? else {
            return Ok(None);
        };
        let Some(project) = Self::query_project(&conn, &chapter.project_id)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY {}, {}",
            scenes::TABLE,
            scenes::CHAPTER_ID,
            scenes::ORDER_INDEX,
            scenes::ID
        ))?;
        let scene_rows = stmt
            .query_map(params![chapter_id], Self::map_scene)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut scenes = Vec::with_capacity(scene_rows.len());
        for scene in scene_rows {
            let document = Self::query_document_by_scene(&conn, &scene.id)?;
            scenes.push(SceneDocument { scene, document });
        }

        Ok(Some(ChapterOverview {
            chapter,
            project,
            scenes,
        }))
    }

    // ── Style profiles ─────────────────────────────────────────────────────

    /// Style profile for a project, if one exists
    pub fn get_style_profile(&self, project_id: &str) -> Result<Option<StyleProfile>> {
        let conn = self.get_connection()?;
        Self::query_style_profile(&conn, project_id)
    }

    /// Style profile for a project, creating the default on first access
    pub fn get_or_create_style_profile(&self, project_id: &str) -> Result<StyleProfile> {
        let conn = self.get_connection()?;
        let defaults = StyleContext::default();

        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                style_profiles::TABLE,
                style_profiles::ID,
                style_profiles::PROJECT_ID,
                style_profiles::POV,
                style_profiles::TENSE,
                style_profiles::FORMALITY,
                style_profiles::CUSTOM_RULES
            ),
            params![
                Uuid::new_v4().to_string(),
                project_id,
                defaults.pov,
                defaults.tense,
                defaults.formality,
                serde_json::to_string(&defaults.custom_rules)?
            ],
        )?;

        Self::query_style_profile(&conn, project_id)?
            .ok_or_else(|| CoachError::Other("Failed to retrieve style profile".to_string()))
    }

    /// Replace a project's style settings, creating the profile if needed
    pub fn upsert_style_profile(&self, project_id: &str, context: &StyleContext) -> Result<StyleProfile> {
        let conn = self.get_connection()?;

        conn.execute(
            &format!(
                "INSERT INTO {table} ({id}, {project}, {pov}, {tense}, {formality}, {rules}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT({project}) DO UPDATE SET {pov} = excluded.{pov}, {tense} = excluded.{tense}, \
                 {formality} = excluded.{formality}, {rules} = excluded.{rules}",
                table = style_profiles::TABLE,
                id = style_profiles::ID,
                project = style_profiles::PROJECT_ID,
                pov = style_profiles::POV,
                tense = style_profiles::TENSE,
                formality = style_profiles::FORMALITY,
                rules = style_profiles::CUSTOM_RULES
            ),
            params![
                Uuid::new_v4().to_string(),
                project_id,
                context.pov,
                context.tense,
                context.formality,
                serde_json::to_string(&context.custom_rules)?
            ],
        )?;

        Self::query_style_profile(&conn, project_id)?
            .ok_or_else(|| CoachError::Other("Failed to retrieve style profile".to_string()))
    }

    // ── Interaction log ────────────────────────────────────────────────────

    /// Number of interactions a user created at or after `since`
    pub fn count_interactions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u32> {
        let conn = self.get_connection()?;

        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND {} >= ?2",
                ai_interactions::TABLE,
                ai_interactions::USER_ID,
                ai_interactions::CREATED_AT
            ),
            params![user_id, since],
            |row| row.get(0),
        )?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Append an interaction to the log
    pub fn add_interaction(&self, new_interaction: NewInteraction) -> Result<Interaction> {
        let conn = self.get_connection()?;
        let interaction = Interaction {
            id: Uuid::new_v4().to_string(),
            user_id: new_interaction.user_id,
            project_id: new_interaction.project_id,
            document_id: new_interaction.document_id,
            request_type: new_interaction.request_type,
            request_text: new_interaction.request_text,
            response_text: new_interaction.response_text,
            intensity: new_interaction.intensity,
            created_at: Utc::now(),
            flags: InteractionFlags::default(),
        };

        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                ai_interactions::TABLE,
                ai_interactions::ID,
                ai_interactions::USER_ID,
                ai_interactions::PROJECT_ID,
                ai_interactions::DOCUMENT_ID,
                ai_interactions::REQUEST_TYPE,
                ai_interactions::REQUEST_TEXT,
                ai_interactions::RESPONSE_TEXT,
                ai_interactions::FEEDBACK_INTENSITY,
                ai_interactions::CREATED_AT
            ),
            params![
                interaction.id,
                interaction.user_id,
                interaction.project_id,
                interaction.document_id,
                interaction.request_type,
                interaction.request_text,
                interaction.response_text,
                interaction.intensity,
                interaction.created_at
            ],
        )?;

        Ok(interaction)
    }

    /// Get an interaction by id
    pub fn get_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>> {
        let conn = self.get_connection()?;
        Self::query_interaction(&conn, interaction_id)
    }

    /// Set one follow-up flag. Only flag columns are ever updated.
    pub fn set_interaction_flag(&self, interaction_id: &str, flag: InteractionFlag) -> Result<Option<Interaction>> {
        let conn = self.get_connection()?;
        let column = match flag {
            InteractionFlag::Acknowledged => ai_interactions::ACKNOWLEDGED,
            InteractionFlag::Dismissed => ai_interactions::DISMISSED,
            InteractionFlag::Flagged => ai_interactions::FLAGGED,
        };

        conn.execute(
            &format!(
                "UPDATE {} SET {} = 1 WHERE {} = ?1",
                ai_interactions::TABLE,
                column,
                ai_interactions::ID
            ),
            params![interaction_id],
        )?;

        Self::query_interaction(&conn, interaction_id)
    }

    /// A user's interactions within a project, newest first
    pub fn list_project_interactions(&self, project_id: &str, user_id: &str, limit: usize) -> Result<Vec<Interaction>> {
        let conn = self.get_connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 AND {} = ?2 ORDER BY {} DESC LIMIT ?3",
            ai_interactions::TABLE,
            ai_interactions::PROJECT_ID,
            ai_interactions::USER_ID,
            ai_interactions::CREATED_AT
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let interactions = stmt
            .query_map(params![project_id, user_id, limit], Self::map_interaction)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(interactions)
    }

    // ── Row lookups ────────────────────────────────────────────────────────

    fn query_project(conn: &Connection, project_id: &str) -> Result<Option<Project>> {
        let project = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", projects::TABLE, projects::ID),
                params![project_id],
                Self::map_project,
            )
            .optional()?;
        Ok(project)
    }

    fn query_chapter(conn: &Connection, chapter_id: &str) -> Result<Option<Chapter>> {
        let chapter = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", chapters::TABLE, chapters::ID),
                params![chapter_id],
                Self::map_chapter,
            )
            .optional()?;
        Ok(chapter)
    }

    fn query_scene(conn: &Connection, scene_id: &str) -> Result<Option<Scene>> {
        let scene = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", scenes::TABLE, scenes::ID),
                params![scene_id],
                Self::map_scene,
            )
            .optional()?;
        Ok(scene)
    }

    fn query_document(conn: &Connection, document_id: &str) -> Result<Option<Document>> {
        let document = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", documents::TABLE, documents::ID),
                params![document_id],
                Self::map_document,
            )
            .optional()?;
        Ok(document)
    }

    fn query_document_by_scene(conn: &Connection, scene_id: &str) -> Result<Option<Document>> {
        let document = conn
            .query_row(
                &format!("SELECT * FROM {} WHERE {} = ?1", documents::TABLE, documents::SCENE_ID),
                params![scene_id],
                Self::map_document,
            )
            .optional()?;
        Ok(document)
    }

    fn query_style_profile(conn: &Connection, project_id: &str) -> Result<Option<StyleProfile>> {
        let profile = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?1",
                    style_profiles::TABLE,
                    style_profiles::PROJECT_ID
                ),
                params![project_id],
                Self::map_style_profile,
            )
            .optional()?;
        Ok(profile)
    }

    fn query_interaction(conn: &Connection, interaction_id: &str) -> Result<Option<Interaction>> {
        let interaction = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?1",
                    ai_interactions::TABLE,
                    ai_interactions::ID
                ),
                params![interaction_id],
                Self::map_interaction,
            )
            .optional()?;
        Ok(interaction)
    }

    // ── Row mapping ────────────────────────────────────────────────────────

    fn map_project(row: &Row) -> rusqlite::Result<Project> {
        Ok(Project {
            id: row.get(projects::ID)?,
            user_id: row.get(projects::USER_ID)?,
            title: row.get(projects::TITLE)?,
            genre: row.get(projects::GENRE)?,
            created_at: row.get(projects::CREATED_AT)?,
        })
    }

    fn map_chapter(row: &Row) -> rusqlite::Result<Chapter> {
        Ok(Chapter {
            id: row.get(chapters::ID)?,
            project_id: row.get(chapters::PROJECT_ID)?,
            title: row.get(chapters::TITLE)?,
            order_index: row.get(chapters::ORDER_INDEX)?,
        })
    }

    fn map_scene(row: &Row) -> rusqlite::Result<Scene> {
        Ok(Scene {
            id: row.get(scenes::ID)?,
            chapter_id: row.get(scenes::CHAPTER_ID)?,
            title: row.get(scenes::TITLE)?,
            order_index: row.get(scenes::ORDER_INDEX)?,
        })
    }

    fn map_document(row: &Row) -> rusqlite::Result<Document> {
        Ok(Document {
            id: row.get(documents::ID)?,
            scene_id: row.get(documents::SCENE_ID)?,
            content: row.get(documents::CONTENT)?,
            word_count: row.get(documents::WORD_COUNT)?,
            updated_at: row.get(documents::UPDATED_AT)?,
        })
    }

    fn map_style_profile(row: &Row) -> rusqlite::Result<StyleProfile> {
        let rules_json: String = row.get(style_profiles::CUSTOM_RULES)?;
        let custom_rules = serde_json::from_str(&rules_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        Ok(StyleProfile {
            id: row.get(style_profiles::ID)?,
            project_id: row.get(style_profiles::PROJECT_ID)?,
            context: StyleContext {
                pov: row.get(style_profiles::POV)?,
                tense: row.get(style_profiles::TENSE)?,
                formality: row.get(style_profiles::FORMALITY)?,
                custom_rules,
            },
        })
    }

    fn map_interaction(row: &Row) -> rusqlite::Result<Interaction> {
        Ok(Interaction {
            id: row.get(ai_interactions::ID)?,
            user_id: row.get(ai_interactions::USER_ID)?,
            project_id: row.get(ai_interactions::PROJECT_ID)?,
            document_id: row.get(ai_interactions::DOCUMENT_ID)?,
            request_type: row.get(ai_interactions::REQUEST_TYPE)?,
            request_text: row.get(ai_interactions::REQUEST_TEXT)?,
            response_text: row.get(ai_interactions::RESPONSE_TEXT)?,
            intensity: row.get(ai_interactions::FEEDBACK_INTENSITY)?,
            created_at: row.get(ai_interactions::CREATED_AT)?,
            flags: InteractionFlags {
                acknowledged: row.get(ai_interactions::ACKNOWLEDGED)?,
                dismissed: row.get(ai_interactions::DISMISSED)?,
                flagged: row.get(ai_interactions::FLAGGED)?,
            },
        })
    }
}
