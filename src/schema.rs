//! Database schema definitions
//!
//! Table and column names used with rusqlite. The DDL itself lives in
//! `migrations/` and is embedded at compile time by [`crate::db`].

/// Users table schema
pub mod users {
    /// Table name
    pub const TABLE: &str = "users";
    /// Primary key column
    pub const ID: &str = "id";
    /// Login email column
    pub const EMAIL: &str = "email";
    /// Display name column
    pub const NAME: &str = "name";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Subscriptions table schema
pub mod subscriptions {
    /// Table name
    pub const TABLE: &str = "subscriptions";
    /// Primary key column
    pub const ID: &str = "id";
    /// Foreign key to users table (unique)
    pub const USER_ID: &str = "user_id";
    /// Tier literal column
    pub const TIER: &str = "tier";
}

/// Projects table schema
pub mod projects {
    /// Table name
    pub const TABLE: &str = "projects";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning user column
    pub const USER_ID: &str = "user_id";
    /// Title column
    pub const TITLE: &str = "title";
    /// Optional genre column
    pub const GENRE: &str = "genre";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Chapters table schema
pub mod chapters {
    /// Table name
    pub const TABLE: &str = "chapters";
    /// Primary key column
    pub const ID: &str = "id";
    /// Parent project column
    pub const PROJECT_ID: &str = "project_id";
    /// Title column
    pub const TITLE: &str = "title";
    /// Ordering column
    pub const ORDER_INDEX: &str = "order_index";
}

/// Scenes table schema
pub mod scenes {
    /// Table name
    pub const TABLE: &str = "scenes";
    /// Primary key column
    pub const ID: &str = "id";
    /// Parent chapter column
    pub const CHAPTER_ID: &str = "chapter_id";
    /// Title column
    pub const TITLE: &str = "title";
    /// Ordering column
    pub const ORDER_INDEX: &str = "order_index";
}

/// Documents table schema
pub mod documents {
    /// Table name
    pub const TABLE: &str = "documents";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning scene column (unique)
    pub const SCENE_ID: &str = "scene_id";
    /// Plain-text content column
    pub const CONTENT: &str = "content";
    /// Stored word count column
    pub const WORD_COUNT: &str = "word_count";
    /// Last update column
    pub const UPDATED_AT: &str = "updated_at";
}

/// Style profiles table schema
pub mod style_profiles {
    /// Table name
    pub const TABLE: &str = "style_profiles";
    /// Primary key column
    pub const ID: &str = "id";
    /// Owning project column (unique)
    pub const PROJECT_ID: &str = "project_id";
    /// Point of view literal column
    pub const POV: &str = "pov";
    /// Tense literal column
    pub const TENSE: &str = "tense";
    /// Register literal column
    pub const FORMALITY: &str = "formality";
    /// JSON-encoded custom rules column
    pub const CUSTOM_RULES: &str = "custom_rules";
}

/// Coaching interaction log schema
pub mod ai_interactions {
    /// Table name
    pub const TABLE: &str = "ai_interactions";
    /// Primary key column
    pub const ID: &str = "id";
    /// Requesting user column
    pub const USER_ID: &str = "user_id";
    /// Optional project column
    pub const PROJECT_ID: &str = "project_id";
    /// Optional document column
    pub const DOCUMENT_ID: &str = "document_id";
    /// Request type literal column
    pub const REQUEST_TYPE: &str = "request_type";
    /// Submitted passage or question column
    pub const REQUEST_TEXT: &str = "request_text";
    /// Model output column
    pub const RESPONSE_TEXT: &str = "response_text";
    /// Intensity literal column
    pub const FEEDBACK_INTENSITY: &str = "feedback_intensity";
    /// Acknowledged flag column
    pub const ACKNOWLEDGED: &str = "acknowledged";
    /// Dismissed flag column
    pub const DISMISSED: &str = "dismissed";
    /// Flagged flag column
    pub const FLAGGED: &str = "flagged";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}
