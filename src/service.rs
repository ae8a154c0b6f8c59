//! Coaching orchestrator and interaction lifecycle.
//!
//! Every entry point verifies the ownership chain before doing anything else.
//! Missing and foreign resources surface with the same message; only the logs
//! record which one it was.

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::client::CompletionClient;
use crate::error::{CoachError, Result};
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{
    FocusArea, Intensity, Interaction, InteractionFlag, NewInteraction, RequestType, StyleContext, StyleProfile,
    SubscriptionTier, TemperatureCheckReport, UsageSummary,
};
use crate::prompt::{build_craft_qa_prompt, build_passage_prompt, ProjectContext};
use crate::quota::{check_quota, daily_limit, start_of_day, start_of_month, QuotaDecision};
use crate::repository::CoachingRepository;
use crate::temperature::{TemperatureAnalyzer, TemperatureMetrics};
use crate::validation::InputValidator;

/// Maximum interactions returned by [`CoachingService::list_interactions`]
pub const INTERACTION_HISTORY_LIMIT: usize = 50;

/// Note attached to every chapter temperature check
pub const TEMPERATURE_CHECK_NOTE: &str =
    "Coarse aggregate of stored word counts. Request scene temperatures for full text metrics.";

/// Text metrics for one scene of a chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTemperature {
    pub scene_id: String,
    pub title: String,
    pub metrics: TemperatureMetrics,
}

pub struct CoachingService {
    repository: Box<dyn CoachingRepository>,
    client: Box<dyn CompletionClient>,
    analyzer: TemperatureAnalyzer,
    metrics: MetricsCollector,
}

impl CoachingService {
    pub fn new(repository: Box<dyn CoachingRepository>, client: Box<dyn CompletionClient>) -> Result<Self> {
        let analyzer = TemperatureAnalyzer::new()?;
        Ok(Self {
            repository,
            client,
            analyzer,
            metrics: MetricsCollector::default(),
        })
    }

    // ── Coaching requests ──────────────────────────────────────────────────

    /// Ask the coach to observe a passage from one of the user's documents
    #[instrument(skip(self, passage, focus_areas))]
    pub async fn analyze_passage(
        &self,
        user_id: &str,
        document_id: &str,
        passage: &str,
        intensity: Intensity,
        focus_areas: &[FocusArea],
    ) -> Result<Interaction> {
        let result = self
            .run_passage_analysis(user_id, document_id, passage, intensity, focus_areas)
            .await;
        self.observe(RequestType::PassageAnalysis, "analyze_passage", result)
    }

    async fn run_passage_analysis(
        &self,
        user_id: &str,
        document_id: &str,
        passage: &str,
        intensity: Intensity,
        focus_areas: &[FocusArea],
    ) -> Result<Interaction> {
        let context = self
            .repository
            .find_document_context(document_id)
            .await?
            .ok_or(CoachError::NotFound("Document"))?;
        ensure_owner("Document", &context.project.user_id, user_id)?;

        self.enforce_quota(user_id).await?;

        let word_count = InputValidator::validate_passage(passage)?;
        debug!(word_count, "Passage accepted");

        let default_style = StyleContext::default();
        let style = context
            .style_profile
            .as_ref()
            .map_or(&default_style, |profile| &profile.context);
        let focus_areas = InputValidator::dedupe_focus_areas(focus_areas);
        let prompt = build_passage_prompt(
            passage,
            ProjectContext {
                genre: context.project.genre.as_deref(),
                style,
            },
            intensity,
            &focus_areas,
        );

        let response_text = self.call_model(&prompt).await?;

        let interaction = self
            .repository
            .create_interaction(NewInteraction {
                user_id: user_id.to_string(),
                project_id: Some(context.project.id),
                document_id: Some(context.document.id),
                request_type: RequestType::PassageAnalysis,
                request_text: passage.to_string(),
                response_text,
                intensity,
            })
            .await?;

        info!(interaction_id = %interaction.id, "Passage analysis recorded");
        Ok(interaction)
    }

    /// Ask a free-form craft question within a project. Not subject to the daily quota.
    #[instrument(skip(self, question, context))]
    pub async fn craft_qa(
        &self,
        user_id: &str,
        project_id: &str,
        question: &str,
        context: Option<&str>,
    ) -> Result<Interaction> {
        let result = self.run_craft_qa(user_id, project_id, question, context).await;
        self.observe(RequestType::CraftQa, "craft_qa", result)
    }

    async fn run_craft_qa(
        &self,
        user_id: &str,
        project_id: &str,
        question: &str,
        context: Option<&str>,
    ) -> Result<Interaction> {
        let project = self
            .repository
            .find_project(project_id)
            .await?
            .ok_or(CoachError::NotFound("Project"))?;
        ensure_owner("Project", &project.user_id, user_id)?;

        InputValidator::validate_question(question)?;

        let prompt = build_craft_qa_prompt(&project.title, project.genre.as_deref(), question, context);
        let response_text = self.call_model(&prompt).await?;

        let interaction = self
            .repository
            .create_interaction(NewInteraction {
                user_id: user_id.to_string(),
                project_id: Some(project.id),
                document_id: None,
                request_type: RequestType::CraftQa,
                request_text: question.to_string(),
                response_text,
                intensity: Intensity::Standard,
            })
            .await?;

        info!(interaction_id = %interaction.id, "Craft question recorded");
        Ok(interaction)
    }

    async fn enforce_quota(&self, user_id: &str) -> Result<()> {
        let tier = self.effective_tier(user_id).await?;
        let daily_count = self
            .repository
            .count_interactions_since(user_id, start_of_day(Local::now()))
            .await?;

        if let QuotaDecision::Deny(reason) = check_quota(tier, daily_count) {
            warn!(tier = %tier, daily_count, "Quota denied");
            self.metrics.record_quota_denial(tier);
            return Err(CoachError::QuotaExceeded(reason));
        }

        Ok(())
    }

    async fn call_model(&self, prompt: &str) -> Result<String> {
        let timer = OperationTimer::new("model_call");
        let outcome = self.client.complete(prompt).await;
        let elapsed = timer.elapsed();
        self.metrics.record_model_call(elapsed, outcome.is_ok());

        outcome.map_err(|e| {
            warn!(error = %e, duration_ms = elapsed.as_millis(), "Model call failed");
            CoachError::ServiceUnavailable
        })
    }

    fn observe<T>(&self, request_type: RequestType, operation: &'static str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.metrics.record_coaching_request(request_type, "success"),
            Err(e) => {
                info!(operation, kind = e.kind(), "Coaching request rejected");
                self.metrics.record_coaching_request(request_type, e.kind());
                self.metrics.record_error(e.kind(), operation);
            },
        }
        result
    }

    // ── Chapter metrics ────────────────────────────────────────────────────

    /// Coarse chapter aggregate over stored word counts
    #[instrument(skip(self))]
    pub async fn temperature_check(&self, user_id: &str, chapter_id: &str) -> Result<TemperatureCheckReport> {
        let overview = self
            .repository
            .find_chapter_overview(chapter_id)
            .await?
            .ok_or(CoachError::NotFound("Chapter"))?;
        ensure_owner("Chapter", &overview.project.user_id, user_id)?;

        let total_words = overview
            .scenes
            .iter()
            .filter_map(|entry| entry.document.as_ref())
            .map(|document| document.word_count)
            .sum();

        Ok(TemperatureCheckReport {
            chapter_id: overview.chapter.id,
            scene_count: overview.scenes.len(),
            total_words,
            sentence_count: 0,
            paragraph_count: 0,
            analysis: TEMPERATURE_CHECK_NOTE.to_string(),
        })
    }

    /// Full text metrics for each scene of a chapter, in scene order
    #[instrument(skip(self))]
    pub async fn scene_temperatures(&self, user_id: &str, chapter_id: &str) -> Result<Vec<SceneTemperature>> {
        let overview = self
            .repository
            .find_chapter_overview(chapter_id)
            .await?
            .ok_or(CoachError::NotFound("Chapter"))?;
        ensure_owner("Chapter", &overview.project.user_id, user_id)?;

        Ok(overview
            .scenes
            .into_iter()
            .map(|entry| {
                let metrics = entry
                    .document
                    .as_ref()
                    .map(|document| self.analyzer.analyze(&document.content))
                    .unwrap_or_default();
                SceneTemperature {
                    scene_id: entry.scene.id,
                    title: entry.scene.title,
                    metrics,
                }
            })
            .collect())
    }

    /// Metrics for arbitrary text; touches neither storage nor the model
    #[must_use]
    pub fn analyze_text(&self, text: &str) -> TemperatureMetrics {
        self.analyzer.analyze(text)
    }

    // ── Usage and history ──────────────────────────────────────────────────

    #[instrument(skip(self))]
    pub async fn usage_summary(&self, user_id: &str) -> Result<UsageSummary> {
        let tier = self.effective_tier(user_id).await?;
        let now = Local::now();
        let daily_requests = self
            .repository
            .count_interactions_since(user_id, start_of_day(now))
            .await?;
        let monthly_requests = self
            .repository
            .count_interactions_since(user_id, start_of_month(now))
            .await?;

        Ok(UsageSummary {
            tier,
            daily_requests,
            monthly_requests,
            daily_limit: daily_limit(tier),
        })
    }

    /// The user's interactions in a project, newest first
    #[instrument(skip(self))]
    pub async fn list_interactions(&self, user_id: &str, project_id: &str) -> Result<Vec<Interaction>> {
        self.owned_project(user_id, project_id).await?;
        self.repository
            .list_project_interactions(project_id, user_id, INTERACTION_HISTORY_LIMIT)
            .await
    }

    async fn effective_tier(&self, user_id: &str) -> Result<SubscriptionTier> {
        Ok(self
            .repository
            .subscription_tier(user_id)
            .await?
            .unwrap_or_default())
    }

    // ── Interaction lifecycle ──────────────────────────────────────────────

    pub async fn acknowledge(&self, user_id: &str, interaction_id: &str) -> Result<Interaction> {
        self.set_flag(user_id, interaction_id, InteractionFlag::Acknowledged)
            .await
    }

    pub async fn dismiss(&self, user_id: &str, interaction_id: &str) -> Result<Interaction> {
        self.set_flag(user_id, interaction_id, InteractionFlag::Dismissed)
            .await
    }

    pub async fn flag(&self, user_id: &str, interaction_id: &str) -> Result<Interaction> {
        self.set_flag(user_id, interaction_id, InteractionFlag::Flagged)
            .await
    }

    /// Set one flag. Flags are independent and never cleared here.
    #[instrument(skip(self))]
    async fn set_flag(&self, user_id: &str, interaction_id: &str, flag: InteractionFlag) -> Result<Interaction> {
        let existing = self
            .repository
            .find_interaction(interaction_id)
            .await?
            .ok_or(CoachError::NotFound("Interaction"))?;
        // foreign interactions are indistinguishable from missing ones here
        if existing.user_id != user_id {
            debug!(interaction_id, "Interaction owned by another user");
            return Err(CoachError::NotFound("Interaction"));
        }

        let updated = self
            .repository
            .set_interaction_flag(interaction_id, flag)
            .await?
            .ok_or(CoachError::NotFound("Interaction"))?;

        self.metrics.record_flag_update(flag);
        debug!(flag = flag.as_str(), "Interaction flag set");
        Ok(updated)
    }

    // ── Style profile ──────────────────────────────────────────────────────

    /// Project style profile, created with defaults on first access
    #[instrument(skip(self))]
    pub async fn style_profile(&self, user_id: &str, project_id: &str) -> Result<StyleProfile> {
        self.owned_project(user_id, project_id).await?;
        self.repository
            .get_or_create_style_profile(project_id)
            .await
    }

    #[instrument(skip(self, context))]
    pub async fn update_style_profile(
        &self,
        user_id: &str,
        project_id: &str,
        context: StyleContext,
    ) -> Result<StyleProfile> {
        self.owned_project(user_id, project_id).await?;
        self.repository
            .upsert_style_profile(project_id, context)
            .await
    }

    async fn owned_project(&self, user_id: &str, project_id: &str) -> Result<()> {
        let project = self
            .repository
            .find_project(project_id)
            .await?
            .ok_or(CoachError::NotFound("Project"))?;
        ensure_owner("Project", &project.user_id, user_id)
    }
}

fn ensure_owner(resource: &'static str, owner_id: &str, user_id: &str) -> Result<()> {
    if owner_id == user_id {
        Ok(())
    } else {
        debug!(resource, "Ownership check failed");
        Err(CoachError::Unauthorized(resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCompletionClient;
    use crate::models::{
        Chapter, ChapterOverview, Document, DocumentContext, InteractionFlags, Project, Scene, SceneDocument,
    };
    use crate::repository::MockCoachingRepository;
    use chrono::Utc;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn project(owner: &str) -> Project {
        Project {
            id: "p1".to_string(),
            user_id: owner.to_string(),
            title: "The Long Night".to_string(),
            genre: Some("Literary Fiction".to_string()),
            created_at: Utc::now(),
        }
    }

    fn chapter() -> Chapter {
        Chapter {
            id: "c1".to_string(),
            project_id: "p1".to_string(),
            title: "One".to_string(),
            order_index: 0,
        }
    }

    fn scene(id: &str) -> Scene {
        Scene {
            id: id.to_string(),
            chapter_id: "c1".to_string(),
            title: format!("Scene {id}"),
            order_index: 0,
        }
    }

    fn document(scene_id: &str, content: &str, word_count: i64) -> Document {
        Document {
            id: format!("d-{scene_id}"),
            scene_id: scene_id.to_string(),
            content: content.to_string(),
            word_count,
            updated_at: Utc::now(),
        }
    }

    fn document_context(owner: &str) -> DocumentContext {
        DocumentContext {
            document: document("s1", "", 0),
            scene: scene("s1"),
            chapter: chapter(),
            project: project(owner),
            style_profile: None,
        }
    }

    fn recorded(new: NewInteraction) -> Interaction {
        Interaction {
            id: "i1".to_string(),
            user_id: new.user_id,
            project_id: new.project_id,
            document_id: new.document_id,
            request_type: new.request_type,
            request_text: new.request_text,
            response_text: new.response_text,
            intensity: new.intensity,
            created_at: Utc::now(),
            flags: InteractionFlags::default(),
        }
    }

    fn service(repository: MockCoachingRepository, client: MockCompletionClient) -> CoachingService {
        CoachingService::new(Box::new(repository), Box::new(client)).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_passage_records_interaction() {
        let mut repository = MockCoachingRepository::new();
        repository
            .expect_find_document_context()
            .returning(|_| Ok(Some(document_context("alice"))));
        repository.expect_subscription_tier().returning(|_| Ok(None));
        repository
            .expect_count_interactions_since()
            .returning(|_, _| Ok(0));
        repository
            .expect_create_interaction()
            .times(1)
            .returning(|new| Ok(recorded(new)));

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(|prompt| prompt.contains("never rewrite") && prompt.contains("Literary Fiction"))
            .returning(|_| Ok("You lean on rhythm.".to_string()));

        let interaction = service(repository, client)
            .analyze_passage("alice", "d-s1", &words(60), Intensity::DeepDive, &[FocusArea::Pacing])
            .await
            .unwrap();

        assert_eq!(interaction.request_type, RequestType::PassageAnalysis);
        assert_eq!(interaction.response_text, "You lean on rhythm.");
        assert_eq!(interaction.intensity, Intensity::DeepDive);
        assert_eq!(interaction.document_id.as_deref(), Some("d-s1"));
        assert_eq!(interaction.flags, InteractionFlags::default());
    }

    #[tokio::test]
    async fn test_model_failure_creates_nothing() {
        let mut repository = MockCoachingRepository::new();
        repository
            .expect_find_document_context()
            .returning(|_| Ok(Some(document_context("alice"))));
        repository
            .expect_subscription_tier()
            .returning(|_| Ok(Some(SubscriptionTier::Pro)));
        repository
            .expect_count_interactions_since()
            .returning(|_, _| Ok(3));
        repository.expect_create_interaction().never();

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(|_| Err(anyhow::anyhow!("HTTP 529: overloaded")));

        let err = service(repository, client)
            .analyze_passage("alice", "d-s1", &words(60), Intensity::Standard, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CoachError::ServiceUnavailable));
        assert!(!err.to_string().contains("overloaded"));
    }

    #[tokio::test]
    async fn test_quota_checked_before_length() {
        let mut repository = MockCoachingRepository::new();
        repository
            .expect_find_document_context()
            .returning(|_| Ok(Some(document_context("alice"))));
        repository.expect_subscription_tier().returning(|_| Ok(None));
        repository
            .expect_count_interactions_since()
            .returning(|_, _| Ok(50));
        repository.expect_create_interaction().never();

        let mut client = MockCompletionClient::new();
        client.expect_complete().never();

        // too short, but the quota denial wins
        let err = service(repository, client)
            .analyze_passage("alice", "d-s1", "too short", Intensity::Standard, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CoachError::QuotaExceeded(_)));
    }

    #[tokio::test]
    async fn test_foreign_document_rejected_before_quota() {
        let mut repository = MockCoachingRepository::new();
        repository
            .expect_find_document_context()
            .returning(|_| Ok(Some(document_context("bob"))));
        repository.expect_count_interactions_since().never();

        let mut client = MockCompletionClient::new();
        client.expect_complete().never();

        let err = service(repository, client)
            .analyze_passage("alice", "d-s1", &words(60), Intensity::Standard, &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CoachError::Unauthorized("Document")));
        assert_eq!(err.to_string(), CoachError::NotFound("Document").to_string());
    }

    #[tokio::test]
    async fn test_craft_qa_skips_quota_and_uses_standard() {
        let mut repository = MockCoachingRepository::new();
        repository
            .expect_find_project()
            .returning(|_| Ok(Some(project("alice"))));
        repository.expect_count_interactions_since().never();
        repository
            .expect_create_interaction()
            .withf(|new| new.document_id.is_none() && new.intensity == Intensity::Standard)
            .returning(|new| Ok(recorded(new)));

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(|prompt| prompt.contains("The Long Night"))
            .returning(|_| Ok("Consider what the silence withholds.".to_string()));

        let interaction = service(repository, client)
            .craft_qa("alice", "p1", "How do I pace a quiet chapter?", None)
            .await
            .unwrap();

        assert_eq!(interaction.request_type, RequestType::CraftQa);
    }

    #[tokio::test]
    async fn test_craft_qa_rejects_short_question() {
        let mut repository = MockCoachingRepository::new();
        repository
            .expect_find_project()
            .returning(|_| Ok(Some(project("alice"))));

        let mut client = MockCompletionClient::new();
        client.expect_complete().never();

        let err = service(repository, client)
            .craft_qa("alice", "p1", "  why?   ", None)
            .await
            .unwrap_err();

        assert!(matches!(err, CoachError::Validation(_)));
    }

    #[tokio::test]
    async fn test_temperature_check_sums_stored_counts() {
        let mut repository = MockCoachingRepository::new();
        repository.expect_find_chapter_overview().returning(|_| {
            Ok(Some(ChapterOverview {
                chapter: chapter(),
                project: project("alice"),
                scenes: vec![
                    SceneDocument {
                        scene: scene("s1"),
                        document: Some(document("s1", "ignored text", 120)),
                    },
                    SceneDocument {
                        scene: scene("s2"),
                        document: None,
                    },
                    SceneDocument {
                        scene: scene("s3"),
                        document: Some(document("s3", "", 80)),
                    },
                ],
            }))
        });

        let mut client = MockCompletionClient::new();
        client.expect_complete().never();

        let report = service(repository, client)
            .temperature_check("alice", "c1")
            .await
            .unwrap();

        assert_eq!(report.scene_count, 3);
        assert_eq!(report.total_words, 200);
        assert_eq!(report.sentence_count, 0);
        assert_eq!(report.paragraph_count, 0);
        assert_eq!(report.analysis, TEMPERATURE_CHECK_NOTE);
    }

    #[test]
    fn test_analyze_text_needs_no_collaborators() {
        let svc = service(MockCoachingRepository::new(), MockCompletionClient::new());
        assert_eq!(svc.analyze_text(""), TemperatureMetrics::default());
        assert_eq!(svc.analyze_text("One two. Three.").sentence_count, 2);
    }

    #[tokio::test]
    async fn test_flag_on_foreign_interaction_is_not_found() {
        let mut repository = MockCoachingRepository::new();
        repository.expect_find_interaction().returning(|_| {
            Ok(Some(recorded(NewInteraction {
                user_id: "bob".to_string(),
                project_id: None,
                document_id: None,
                request_type: RequestType::CraftQa,
                request_text: "q".to_string(),
                response_text: "r".to_string(),
                intensity: Intensity::Standard,
            })))
        });
        repository.expect_set_interaction_flag().never();

        let svc = service(repository, MockCompletionClient::new());
        let err = svc.dismiss("alice", "i1").await.unwrap_err();

        assert!(matches!(err, CoachError::NotFound("Interaction")));
    }
}
