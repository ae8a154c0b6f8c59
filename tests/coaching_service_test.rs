use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use forge_coach::client::CompletionClient;
use forge_coach::db::Database;
use forge_coach::error::CoachError;
use forge_coach::models::{
    Chapter, CustomRule, Document, FocusArea, Intensity, Interaction, NewInteraction, NewProject, PointOfView, Project,
    RequestType, StyleContext, SubscriptionTier,
};
use forge_coach::repository::SqliteRepository;
use forge_coach::service::CoachingService;

/// Model stand-in that records prompts and can be told to fail
#[derive(Clone, Default)]
struct StubClient {
    fail: bool,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            anyhow::bail!("HTTP 503: upstream overloaded");
        }
        Ok("Your sentences lengthen as tension rises. What happens if the last one stays short?".to_string())
    }
}

struct Fixture {
    _dir: TempDir,
    db: Database,
    service: CoachingService,
    client: StubClient,
    user: String,
    other_user: String,
    project: Project,
    chapter: Chapter,
    document: Document,
}

impl Fixture {
    fn new(fail: bool) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db = Database::new(&format!("sqlite:{}", dir.path().join("forge.db").display()))
            .expect("Failed to create database");

        let user = db.create_user("author@example.com", Some("Author")).unwrap();
        let other_user = db.create_user("stranger@example.com", None).unwrap();
        let project = db
            .create_project(NewProject {
                user_id: user.clone(),
                title: "Saltwater".to_string(),
                genre: Some("Literary Fiction".to_string()),
            })
            .unwrap();
        let chapter = db.create_chapter(&project.id, "Low Tide", 0).unwrap();
        let scene = db.create_scene(&chapter.id, "The Pier", 0).unwrap();
        let document = db.save_document(&scene.id, &words(120)).unwrap();

        let client = StubClient {
            fail,
            ..StubClient::default()
        };
        let service = CoachingService::new(
            Box::new(SqliteRepository::new(db.clone())),
            Box::new(client.clone()),
        )
        .unwrap();

        Self {
            _dir: dir,
            db,
            service,
            client,
            user,
            other_user,
            project,
            chapter,
            document,
        }
    }

    fn interaction_count(&self) -> u32 {
        self.db
            .count_interactions_since(&self.user, Utc::now() - Duration::days(1))
            .unwrap()
    }

    fn seed_interactions(&self, n: usize) {
        for _ in 0..n {
            self.db
                .add_interaction(NewInteraction {
                    user_id: self.user.clone(),
                    project_id: Some(self.project.id.clone()),
                    document_id: None,
                    request_type: RequestType::PassageAnalysis,
                    request_text: "seed".to_string(),
                    response_text: "seed".to_string(),
                    intensity: Intensity::Standard,
                })
                .unwrap();
        }
    }

    fn calls(&self) -> usize {
        self.client.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.client.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

fn words(n: usize) -> String {
    vec!["tide"; n].join(" ")
}

async fn analyze_words(f: &Fixture, n: usize) -> Result<Interaction, CoachError> {
    f.service
        .analyze_passage(&f.user, &f.document.id, &words(n), Intensity::Standard, &[])
        .await
}

#[tokio::test]
async fn test_passage_length_boundaries() {
    let f = Fixture::new(false);

    assert!(matches!(analyze_words(&f, 49).await, Err(CoachError::Validation(_))));
    assert!(analyze_words(&f, 50).await.is_ok());
    assert!(analyze_words(&f, 2000).await.is_ok());
    assert!(matches!(analyze_words(&f, 2001).await, Err(CoachError::Validation(_))));

    // rejected passages never reach the model
    assert_eq!(f.calls(), 2);
    assert_eq!(f.interaction_count(), 2);
}

#[tokio::test]
async fn test_analysis_persists_interaction() {
    let f = Fixture::new(false);

    let interaction = f
        .service
        .analyze_passage(
            &f.user,
            &f.document.id,
            &words(80),
            Intensity::DeepDive,
            &[FocusArea::SentenceRhythm, FocusArea::Pacing, FocusArea::SentenceRhythm],
        )
        .await
        .unwrap();

    assert_eq!(interaction.user_id, f.user);
    assert_eq!(interaction.project_id.as_deref(), Some(f.project.id.as_str()));
    assert_eq!(interaction.document_id.as_deref(), Some(f.document.id.as_str()));
    assert_eq!(interaction.request_type, RequestType::PassageAnalysis);
    assert_eq!(interaction.request_text, words(80));
    assert_eq!(interaction.intensity, Intensity::DeepDive);
    assert!(!interaction.flags.acknowledged && !interaction.flags.dismissed && !interaction.flags.flagged);

    let stored = f.db.get_interaction(&interaction.id).unwrap().expect("stored");
    assert_eq!(stored.response_text, interaction.response_text);

    let prompt = f.last_prompt();
    assert!(prompt.contains("FOCUS AREAS: Sentence rhythm, Pacing"));
    assert!(prompt.contains("- Genre: Literary Fiction"));
    assert!(prompt.contains("never rewrite"));
}

#[tokio::test]
async fn test_model_failure_leaves_no_record() {
    let f = Fixture::new(true);
    let before = f.interaction_count();

    let err = f
        .service
        .analyze_passage(&f.user, &f.document.id, &words(60), Intensity::Standard, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, CoachError::ServiceUnavailable));
    assert_eq!(f.calls(), 1);
    assert_eq!(f.interaction_count(), before);

    let err = f
        .service
        .craft_qa(&f.user, &f.project.id, "How do I end a chapter quietly?", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoachError::ServiceUnavailable));
    assert_eq!(f.interaction_count(), before);
}

#[tokio::test]
async fn test_free_tier_daily_ceiling() {
    let f = Fixture::new(false);
    f.seed_interactions(49);

    // the 50th request of the day is still allowed
    assert!(f
        .service
        .analyze_passage(&f.user, &f.document.id, &words(60), Intensity::LightTouch, &[])
        .await
        .is_ok());

    let err = f
        .service
        .analyze_passage(&f.user, &f.document.id, &words(60), Intensity::LightTouch, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CoachError::QuotaExceeded(_)));
    assert_eq!(f.calls(), 1);

    // craft questions are not gated
    let answer = f
        .service
        .craft_qa(&f.user, &f.project.id, "Is my narrator too reliable?", None)
        .await
        .unwrap();
    assert_eq!(answer.request_type, RequestType::CraftQa);
    assert_eq!(answer.intensity, Intensity::Standard);
    assert!(answer.document_id.is_none());
}

#[tokio::test]
async fn test_paid_tier_has_no_ceiling() {
    let f = Fixture::new(false);
    f.db.set_subscription_tier(&f.user, SubscriptionTier::Pro).unwrap();
    f.seed_interactions(60);

    assert!(f
        .service
        .analyze_passage(&f.user, &f.document.id, &words(60), Intensity::Standard, &[])
        .await
        .is_ok());

    let usage = f.service.usage_summary(&f.user).await.unwrap();
    assert_eq!(usage.tier, SubscriptionTier::Pro);
    assert_eq!(usage.daily_requests, 61);
    assert!(usage.monthly_requests >= usage.daily_requests);
    assert_eq!(usage.daily_limit, None);
}

#[tokio::test]
async fn test_usage_summary_defaults_to_free() {
    let f = Fixture::new(false);
    f.seed_interactions(3);

    let usage = f.service.usage_summary(&f.user).await.unwrap();
    assert_eq!(usage.tier, SubscriptionTier::Free);
    assert_eq!(usage.daily_requests, 3);
    assert_eq!(usage.monthly_requests, 3);
    assert_eq!(usage.daily_limit, Some(50));
}

#[tokio::test]
async fn test_cross_tenant_requests_look_missing() {
    let f = Fixture::new(false);

    let foreign = f
        .service
        .analyze_passage(&f.other_user, &f.document.id, &words(60), Intensity::Standard, &[])
        .await
        .unwrap_err();
    let missing = f
        .service
        .analyze_passage(&f.other_user, "no-such-document", &words(60), Intensity::Standard, &[])
        .await
        .unwrap_err();
    assert_eq!(foreign.to_string(), missing.to_string());
    assert!(foreign.is_not_found() && missing.is_not_found());

    let foreign = f
        .service
        .craft_qa(&f.other_user, &f.project.id, "What is this book about?", None)
        .await
        .unwrap_err();
    assert_eq!(foreign.to_string(), "Project not found");

    let foreign = f
        .service
        .temperature_check(&f.other_user, &f.chapter.id)
        .await
        .unwrap_err();
    assert!(foreign.is_not_found());

    assert!(f
        .service
        .style_profile(&f.other_user, &f.project.id)
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(f.calls(), 0);
}

#[tokio::test]
async fn test_interaction_flags_are_independent() {
    let f = Fixture::new(false);
    let interaction = f
        .service
        .craft_qa(&f.user, &f.project.id, "Should the prologue go?", Some("It was raining."))
        .await
        .unwrap();

    let flagged = f.service.flag(&f.user, &interaction.id).await.unwrap();
    assert!(flagged.flags.flagged);
    assert!(!flagged.flags.acknowledged && !flagged.flags.dismissed);

    let dismissed = f.service.dismiss(&f.user, &interaction.id).await.unwrap();
    assert!(dismissed.flags.dismissed && dismissed.flags.flagged);
    assert!(!dismissed.flags.acknowledged);

    let acknowledged = f.service.acknowledge(&f.user, &interaction.id).await.unwrap();
    assert!(acknowledged.flags.acknowledged && acknowledged.flags.dismissed && acknowledged.flags.flagged);

    // repeating a flag is harmless and never clears another
    let again = f.service.acknowledge(&f.user, &interaction.id).await.unwrap();
    assert_eq!(again.flags, acknowledged.flags);
    assert_eq!(again.response_text, interaction.response_text);
}

#[tokio::test]
async fn test_flagging_foreign_or_missing_interaction() {
    let f = Fixture::new(false);
    let interaction = f
        .service
        .craft_qa(&f.user, &f.project.id, "Should the prologue go?", None)
        .await
        .unwrap();

    let foreign = f.service.dismiss(&f.other_user, &interaction.id).await.unwrap_err();
    let missing = f.service.dismiss(&f.user, "no-such-interaction").await.unwrap_err();
    assert_eq!(foreign.to_string(), missing.to_string());
    assert!(matches!(foreign, CoachError::NotFound("Interaction")));

    let stored = f.db.get_interaction(&interaction.id).unwrap().expect("stored");
    assert!(!stored.flags.dismissed);
}

#[tokio::test]
async fn test_temperature_check_and_scene_metrics() {
    let f = Fixture::new(false);
    let second = f.db.create_scene(&f.chapter.id, "The Boat", 1).unwrap();
    f.db.save_document(&second.id, "Short one. Then a much longer sentence follows here.")
        .unwrap();
    f.db.create_scene(&f.chapter.id, "Empty", 2).unwrap();

    let report = f.service.temperature_check(&f.user, &f.chapter.id).await.unwrap();
    assert_eq!(report.chapter_id, f.chapter.id);
    assert_eq!(report.scene_count, 3);
    assert_eq!(report.total_words, 129);
    assert_eq!(report.sentence_count, 0);
    assert_eq!(report.paragraph_count, 0);
    assert!(!report.analysis.is_empty());

    let scenes = f.service.scene_temperatures(&f.user, &f.chapter.id).await.unwrap();
    assert_eq!(scenes.len(), 3);
    assert_eq!(scenes[1].title, "The Boat");
    assert_eq!(scenes[1].metrics.sentence_count, 2);
    assert_eq!(scenes[2].metrics.word_count, 0);

    assert_eq!(f.calls(), 0);
    assert!(f
        .service
        .temperature_check(&f.user, "no-such-chapter")
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_style_profile_grounds_prompts() {
    let f = Fixture::new(false);

    let profile = f.service.style_profile(&f.user, &f.project.id).await.unwrap();
    assert_eq!(profile.context, StyleContext::default());

    let updated = f
        .service
        .update_style_profile(
            &f.user,
            &f.project.id,
            StyleContext {
                pov: PointOfView::First,
                custom_rules: vec![CustomRule {
                    rule: "Keep dialogue tags to said".to_string(),
                    example: "\"Go,\" she said.".to_string(),
                }],
                ..StyleContext::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.id, profile.id);

    f.service
        .analyze_passage(&f.user, &f.document.id, &words(60), Intensity::Standard, &[FocusArea::Dialogue])
        .await
        .unwrap();

    let prompt = f.last_prompt();
    assert!(prompt.contains("- POV: First Person"));
    assert!(prompt.contains("- House rule: Keep dialogue tags to said"));
    assert!(prompt.ends_with("Remember: observe only, never rewrite."));
}

#[tokio::test]
async fn test_interaction_history_newest_first() {
    let f = Fixture::new(false);
    for question in ["First question here?", "Second question here?", "Third question here?"] {
        f.service.craft_qa(&f.user, &f.project.id, question, None).await.unwrap();
    }

    let history = f.service.list_interactions(&f.user, &f.project.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at));

    assert!(f
        .service
        .list_interactions(&f.other_user, &f.project.id)
        .await
        .unwrap_err()
        .is_not_found());
}
