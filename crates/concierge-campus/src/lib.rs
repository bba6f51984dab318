//! concierge-campus - Domain assistants for the campus concierge
//!
//! Each module holds an in-memory catalog plus an `AgentHandler` that
//! answers free-text queries for that domain:
//! - Course advisor (search, prerequisites, personalized recommendations)
//! - Library assistant (catalog search, availability, holds, renewals)
//! - Events assistant (upcoming events, keyword search, registration)
//! - Document analyzer (syllabus and assignment analysis)
//! - Profile manager (privacy-filtered profile and recommendations)
//! - General assistant (capability overview)

pub mod courses;
pub mod documents;
pub mod events;
pub mod general;
pub mod library;
pub mod profile;

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use concierge_core::{AgentRegistry, Domain, GENERAL_HANDLER};

pub use courses::{CourseAdvisor, CourseCatalog};
pub use documents::DocumentAnalyzer;
pub use events::{EventCalendar, EventsAgent};
pub use general::GeneralAssistant;
pub use library::{LibraryAgent, LibraryCatalog};
pub use profile::{ProfileAgent, ProfileStore};

/// Settings shared by the campus handlers
#[derive(Debug, Clone)]
pub struct CampusOptions {
    /// Student the handlers act on behalf of
    pub student_id: String,
    /// Let the course advisor use the student's profile
    pub personalize_courses: bool,
    /// Reference date for event windows and due dates
    pub today: NaiveDate,
}

impl Default for CampusOptions {
    fn default() -> Self {
        Self {
            student_id: "student123".to_string(),
            personalize_courses: true,
            today: chrono::Local::now().date_naive(),
        }
    }
}

/// Build a registry holding every campus handler under its routing name
pub fn default_registry(profiles: Arc<ProfileStore>, options: &CampusOptions) -> AgentRegistry {
    let calendar = Arc::new(EventCalendar::new(options.today));
    let library = Arc::new(LibraryCatalog::new(options.today));

    let course_advisor = if options.personalize_courses {
        CourseAdvisor::new().with_profiles(profiles.clone(), &options.student_id)
    } else {
        CourseAdvisor::new()
    };

    let mut registry = AgentRegistry::new();
    registry.register(
        Domain::Document.handler_name(),
        Arc::new(DocumentAnalyzer::new()),
    );
    registry.register(Domain::Course.handler_name(), Arc::new(course_advisor));
    registry.register(
        Domain::Library.handler_name(),
        Arc::new(LibraryAgent::new(library, &options.student_id)),
    );
    registry.register(
        Domain::Event.handler_name(),
        Arc::new(EventsAgent::new(calendar.clone(), &options.student_id)),
    );
    registry.register(
        Domain::Profile.handler_name(),
        Arc::new(ProfileAgent::new(profiles, calendar, &options.student_id)),
    );
    registry.register(GENERAL_HANDLER, Arc::new(GeneralAssistant::new()));

    info!(
        "Registered {} campus handlers for {}",
        registry.len(),
        options.student_id
    );
    registry
}

/// Whole-word, case-insensitive containment
pub(crate) fn mentions(text: &str, term: &str) -> bool {
    let term = term.to_lowercase();
    if term.is_empty() {
        return false;
    }
    let text = text.to_lowercase();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    text.match_indices(&term).any(|(start, _)| {
        let end = start + term.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Whether `text` mentions any of `terms` as whole words
pub(crate) fn mentions_any(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| mentions(text, term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::{Intent, Orchestrator, OrchestratorConfig};

    #[test]
    fn test_mentions_word_bounded() {
        assert!(mentions("Any AI courses?", "ai"));
        assert!(!mentions("Is it available?", "ai"));
        assert!(mentions("next week please", "next week"));
        assert!(mentions_any("no mornings", &["not", "no"]));
        assert!(!mentions_any("knowledge", &["no", "now"]));
    }

    #[test]
    fn test_mentions_boundaries() {
        assert!(mentions("ai", "ai"));
        assert!(mentions("(AI), please", "ai"));
        assert!(mentions("fall-semester", "fall"));
        assert!(!mentions("fall_semester", "fall"));
        assert!(!mentions("rainfall", "fall"));
        // a later whole-word hit counts even after an embedded one
        assert!(mentions("available ai", "ai"));
        assert!(mentions("Study Groups next WEEK", "next week"));
        assert!(!mentions("anything", ""));
    }

    #[test]
    fn test_default_registry_names() {
        let registry = default_registry(
            Arc::new(ProfileStore::with_sample_students()),
            &CampusOptions::default(),
        );
        assert_eq!(
            registry.names(),
            vec![
                "course_advisor",
                "document_analyzer",
                "events_agent",
                "general_assistant",
                "library_agent",
                "profile_agent",
            ]
        );
    }

    fn orchestrator() -> Orchestrator {
        let registry = default_registry(
            Arc::new(ProfileStore::with_sample_students()),
            &CampusOptions::default(),
        );
        Orchestrator::new(Arc::new(registry), OrchestratorConfig::default())
    }

    #[tokio::test]
    async fn test_pipeline_single_domain() {
        let turn = orchestrator().handle("Is Clean Code available?").await.unwrap();
        assert_eq!(turn.classification.intent, Intent::SearchLibrary);
        assert_eq!(turn.bundle.handler_names(), vec!["library_agent"]);
        assert!(turn.response.starts_with("**Clean Code: A Handbook of Agile Software Craftsmanship**"));
    }

    #[tokio::test]
    async fn test_pipeline_multi_intent() {
        let turn = orchestrator()
            .handle("Find AI courses and a library book about machine learning")
            .await
            .unwrap();
        assert_eq!(turn.classification.intent, Intent::MultiIntent);
        assert_eq!(
            turn.bundle.handler_names(),
            vec!["course_advisor", "library_agent"]
        );
        let course = turn.response.find("**Course Information:**").unwrap();
        let library = turn.response.find("**Library Resources:**").unwrap();
        assert!(course < library);
    }

    #[tokio::test]
    async fn test_pipeline_profile_and_general() {
        let orchestrator = orchestrator();
        let profile = orchestrator.process("show my interests").await.unwrap();
        assert!(profile.starts_with("**Profile for Alex Johnson**"));

        let general = orchestrator.process("what's the weather like").await.unwrap();
        assert!(general.contains("**Course Planning**"));
    }

    #[tokio::test]
    async fn test_pipeline_document() {
        let turn = orchestrator()
            .handle("Can you analyze a photo of my syllabus?")
            .await
            .unwrap();
        assert_eq!(turn.bundle.handler_names(), vec!["document_analyzer"]);
        assert!(turn.response.contains("- Instructor: Dr. Sarah Williams"));
    }

    #[test]
    fn test_campus_options_default() {
        let options = CampusOptions::default();
        assert_eq!(options.student_id, "student123");
        assert!(options.personalize_courses);
    }
}
