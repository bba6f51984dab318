//! Keyword Intent Classification
//!
//! Scores a query against a closed keyword vocabulary per domain and picks
//! the winning domain, flags the query as multi-intent when more than one
//! fan-out domain matches, or falls back to the general assistant.
//!
//! A domain's score is the number of *distinct* vocabulary terms that occur
//! as substrings of the lower-cased query; repeating a term does not raise
//! the score. Classification is a pure function of the query text.

use tracing::debug;

use crate::entities::extract;
use crate::types::{
    ClassificationResult, Domain, DomainScores, GENERAL_HANDLER, Intent, RoutingTarget,
};

/// Confidence reported for multi-intent queries
pub const MULTI_INTENT_CONFIDENCE: f64 = 0.8;
/// Confidence reported when nothing matched
pub const GENERAL_CONFIDENCE: f64 = 0.5;
/// Upper bound on single-domain confidence
pub const MAX_CONFIDENCE: f64 = 0.9;

const DOCUMENT_NORMALIZER: f64 = 3.0;
const PROFILE_NORMALIZER: f64 = 3.0;
const DOMAIN_NORMALIZER: f64 = 5.0;

pub const COURSE_KEYWORDS: &[&str] = &[
    "course",
    "class",
    "subject",
    "elective",
    "major",
    "minor",
    "prerequisite",
    "credit",
    "semester",
    "schedule",
    "professor",
    "grade",
    "gpa",
    "requirement",
    "curriculum",
    "degree",
];

pub const LIBRARY_KEYWORDS: &[&str] = &[
    "book",
    "library",
    "borrow",
    "checkout",
    "reserve",
    "catalog",
    "author",
    "isbn",
    "journal",
    "article",
    "research",
    "publication",
    "available",
    "hold",
    "renew",
    "due date",
];

pub const EVENT_KEYWORDS: &[&str] = &[
    "event",
    "meeting",
    "club",
    "activity",
    "workshop",
    "seminar",
    "conference",
    "sports",
    "game",
    "concert",
    "fair",
    "career",
    "networking",
    "social",
    "cultural",
    "academic",
];

// "schedule" lives in the course vocabulary only so the sets stay disjoint.
pub const DOCUMENT_KEYWORDS: &[&str] = &[
    "syllabus",
    "pdf",
    "document",
    "image",
    "analyze",
    "upload",
    "assignment",
    "homework",
    "transcript",
    "scan",
    "picture",
    "photo",
    "file",
    "attachment",
];

/// Only consulted when every fan-out domain scores zero. "profile" itself is
/// absent: it contains the document term "file".
pub const PROFILE_KEYWORDS: &[&str] = &[
    "preference",
    "my interests",
    "my goals",
    "privacy",
    "personalized",
    "about me",
    "who am i",
];

/// Closed vocabulary for a domain
pub fn keywords(domain: Domain) -> &'static [&'static str] {
    match domain {
        Domain::Document => DOCUMENT_KEYWORDS,
        Domain::Course => COURSE_KEYWORDS,
        Domain::Library => LIBRARY_KEYWORDS,
        Domain::Event => EVENT_KEYWORDS,
        Domain::Profile => PROFILE_KEYWORDS,
    }
}

/// Count distinct vocabulary terms of `domain` present in an already
/// lower-cased query
pub fn domain_score(domain: Domain, lower_query: &str) -> usize {
    keywords(domain)
        .iter()
        .filter(|k| lower_query.contains(*k))
        .count()
}

/// Score every domain against a query
pub fn score_query(query: &str) -> DomainScores {
    let lower = query.to_lowercase();
    DomainScores {
        document: domain_score(Domain::Document, &lower),
        course: domain_score(Domain::Course, &lower),
        library: domain_score(Domain::Library, &lower),
        event: domain_score(Domain::Event, &lower),
        profile: domain_score(Domain::Profile, &lower),
    }
}

/// Classify a query into an intent with a routing target.
pub fn classify(query: &str) -> ClassificationResult {
    let entities = extract(query);
    let scores = score_query(query);

    let (intent, confidence, routing_target) = decide(&scores);

    debug!(
        "Classified query as {} (confidence {:.2}, scores {:?})",
        intent, confidence, scores
    );

    ClassificationResult {
        query: query.to_string(),
        intent,
        entities,
        confidence,
        routing_target,
        scores,
    }
}

fn decide(scores: &DomainScores) -> (Intent, f64, RoutingTarget) {
    if scores.active_fan_out().len() > 1 {
        return (
            Intent::MultiIntent,
            MULTI_INTENT_CONFIDENCE,
            RoutingTarget::Deferred,
        );
    }

    let DomainScores {
        document,
        course,
        library,
        event,
        profile,
    } = *scores;

    // Document is checked first and wins ties; then course > library > event.
    let winner = if document > 0 && document >= course.max(library).max(event) {
        Some((Domain::Document, document, DOCUMENT_NORMALIZER))
    } else if course > library && course > event {
        Some((Domain::Course, course, DOMAIN_NORMALIZER))
    } else if library > event {
        Some((Domain::Library, library, DOMAIN_NORMALIZER))
    } else if event > 0 {
        Some((Domain::Event, event, DOMAIN_NORMALIZER))
    } else if profile > 0 {
        Some((Domain::Profile, profile, PROFILE_NORMALIZER))
    } else {
        None
    };

    match winner {
        Some((domain, score, normalizer)) => (
            domain.intent(),
            MAX_CONFIDENCE.min(score as f64 / normalizer),
            RoutingTarget::Handler(domain.handler_name().to_string()),
        ),
        None => (
            Intent::GeneralQuery,
            GENERAL_CONFIDENCE,
            RoutingTarget::Handler(GENERAL_HANDLER.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const ALL_DOMAINS: [Domain; 5] = [
        Domain::Document,
        Domain::Course,
        Domain::Library,
        Domain::Event,
        Domain::Profile,
    ];

    #[test]
    fn test_vocabularies_disjoint() {
        let mut seen = HashSet::new();
        for domain in ALL_DOMAINS {
            for keyword in keywords(domain) {
                assert!(seen.insert(*keyword), "'{}' appears in two vocabularies", keyword);
            }
        }
    }

    #[test]
    fn test_general_query() {
        let result = classify("hello, how are you doing?");
        assert_eq!(result.intent, Intent::GeneralQuery);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(
            result.routing_target,
            RoutingTarget::Handler("general_assistant".to_string())
        );
        assert!(result.entities.is_empty());
    }

    #[test]
    fn test_empty_query_is_general() {
        let result = classify("");
        assert_eq!(result.intent, Intent::GeneralQuery);
        assert_eq!(result.confidence, GENERAL_CONFIDENCE);
        assert!(result.entities.is_empty());
        assert_eq!(result.scores, DomainScores::default());
    }

    #[test]
    fn test_three_course_keywords() {
        let result = classify("Which course has a prerequisite and what gpa do I need?");
        assert_eq!(result.scores.course, 3);
        assert_eq!(result.intent, Intent::FindCourse);
        assert_eq!(result.confidence, 0.6);
        assert_eq!(
            result.routing_target,
            RoutingTarget::Handler("course_advisor".to_string())
        );
    }

    #[test]
    fn test_confidence_capped() {
        let result = classify(
            "course class subject elective semester professor curriculum degree",
        );
        assert_eq!(result.intent, Intent::FindCourse);
        assert_eq!(result.confidence, MAX_CONFIDENCE);
    }

    #[test]
    fn test_two_domains_is_multi_intent() {
        let result = classify("I need a book for my course");
        assert_eq!(result.intent, Intent::MultiIntent);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.routing_target, RoutingTarget::Deferred);
    }

    #[test]
    fn test_repeated_term_counts_once() {
        let once = classify("book");
        let twice = classify("book book book");
        assert_eq!(once.scores.library, 1);
        assert_eq!(twice.scores.library, 1);
        assert_eq!(once.confidence, twice.confidence);
        assert_eq!(twice.intent, Intent::SearchLibrary);
        assert_eq!(twice.confidence, 0.2);
    }

    #[test]
    fn test_document_uses_smaller_normalizer() {
        let result = classify("please scan this pdf");
        assert_eq!(result.intent, Intent::AnalyzeDocument);
        assert_eq!(result.scores.document, 2);
        assert_eq!(result.confidence, 2.0 / 3.0);
        assert_eq!(
            result.routing_target,
            RoutingTarget::Handler("document_analyzer".to_string())
        );
    }

    #[test]
    fn test_event_only() {
        let result = classify("any concerts tonight?");
        assert_eq!(result.intent, Intent::FindEvents);
        assert_eq!(result.confidence, 0.2);
    }

    #[test]
    fn test_find_courses_about_data_science() {
        let result = classify("Find courses about data science");
        assert_eq!(result.intent, Intent::FindCourse);
        assert_eq!(result.scores.active_fan_out(), vec![Domain::Course]);
    }

    #[test]
    fn test_schedule_is_course_only() {
        let result = classify("what's my schedule");
        assert_eq!(result.scores.document, 0);
        assert_eq!(result.intent, Intent::FindCourse);
    }

    #[test]
    fn test_profile_only_when_fan_out_empty() {
        let result = classify("show me my preferences");
        assert_eq!(result.intent, Intent::StudentProfile);
        assert_eq!(result.confidence, 1.0 / 3.0);
        assert_eq!(
            result.routing_target,
            RoutingTarget::Handler("profile_agent".to_string())
        );

        // A fan-out hit takes precedence over profile vocabulary
        let result = classify("what are my preferences for the chess club");
        assert_eq!(result.intent, Intent::FindEvents);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("LIBRARY").intent, Intent::SearchLibrary);
    }

    #[test]
    fn test_entities_attached() {
        let result = classify("AI electives on Friday");
        assert_eq!(result.intent, Intent::FindCourse);
        assert!(!result.entities.is_empty());
        assert_eq!(result.query, "AI electives on Friday");
    }

    #[test]
    fn test_deterministic_output() {
        let query = "Analyze my syllabus PDF and find the textbook in the library on Monday";
        let first = serde_json::to_string(&classify(query)).unwrap();
        let second = serde_json::to_string(&classify(query)).unwrap();
        assert_eq!(first, second);
    }
}
