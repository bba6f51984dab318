//! Shared types for concierge-core

use serde::{Deserialize, Serialize};

/// Handler name used when no domain matched the query
pub const GENERAL_HANDLER: &str = "general_assistant";

/// A service domain the classifier can recognize
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Document,
    Course,
    Library,
    Event,
    Profile,
}

impl Domain {
    /// Domains that take part in multi-intent fan-out, in dispatch order.
    /// Document is checked first and wins ties.
    pub const FAN_OUT: [Domain; 4] = [
        Domain::Document,
        Domain::Course,
        Domain::Library,
        Domain::Event,
    ];

    /// Registry name of the handler serving this domain
    pub fn handler_name(&self) -> &'static str {
        match self {
            Self::Document => "document_analyzer",
            Self::Course => "course_advisor",
            Self::Library => "library_agent",
            Self::Event => "events_agent",
            Self::Profile => "profile_agent",
        }
    }

    /// Intent produced when this domain wins single-domain classification
    pub fn intent(&self) -> Intent {
        match self {
            Self::Document => Intent::AnalyzeDocument,
            Self::Course => Intent::FindCourse,
            Self::Library => Intent::SearchLibrary,
            Self::Event => Intent::FindEvents,
            Self::Profile => Intent::StudentProfile,
        }
    }

    /// Look up the domain served by a registry name
    pub fn from_handler_name(name: &str) -> Option<Self> {
        match name {
            "document_analyzer" => Some(Self::Document),
            "course_advisor" => Some(Self::Course),
            "library_agent" => Some(Self::Library),
            "events_agent" => Some(Self::Event),
            "profile_agent" => Some(Self::Profile),
            _ => None,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Course => write!(f, "course"),
            Self::Library => write!(f, "library"),
            Self::Event => write!(f, "event"),
            Self::Profile => write!(f, "profile"),
        }
    }
}

/// The inferred purpose of a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FindCourse,
    SearchLibrary,
    FindEvents,
    AnalyzeDocument,
    StudentProfile,
    MultiIntent,
    GeneralQuery,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FindCourse => write!(f, "find_course"),
            Self::SearchLibrary => write!(f, "search_library"),
            Self::FindEvents => write!(f, "find_events"),
            Self::AnalyzeDocument => write!(f, "analyze_document"),
            Self::StudentProfile => write!(f, "student_profile"),
            Self::MultiIntent => write!(f, "multi_intent"),
            Self::GeneralQuery => write!(f, "general_query"),
        }
    }
}

/// Where the router should send a classified query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "handler", rename_all = "snake_case")]
pub enum RoutingTarget {
    /// A single registry name
    Handler(String),
    /// Multi-intent: the router re-scans the query per domain
    Deferred,
}

impl RoutingTarget {
    pub fn handler(&self) -> Option<&str> {
        match self {
            Self::Handler(name) => Some(name.as_str()),
            Self::Deferred => None,
        }
    }
}

/// Category of an extracted entity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Time,
    Constraint,
    Subject,
    CourseType,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::Constraint => write!(f, "constraint"),
            Self::Subject => write!(f, "subject"),
            Self::CourseType => write!(f, "course_type"),
        }
    }
}

/// A typed fragment pulled out of query text. Advisory only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    /// Lower-cased matched text
    pub value: String,
    /// Fixed per-category confidence in [0, 1]
    pub confidence: f64,
}

/// Distinct-keyword hit counts per domain
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainScores {
    pub document: usize,
    pub course: usize,
    pub library: usize,
    pub event: usize,
    pub profile: usize,
}

impl DomainScores {
    pub fn get(&self, domain: Domain) -> usize {
        match domain {
            Domain::Document => self.document,
            Domain::Course => self.course,
            Domain::Library => self.library,
            Domain::Event => self.event,
            Domain::Profile => self.profile,
        }
    }

    /// Fan-out domains with a nonzero score, in dispatch order
    pub fn active_fan_out(&self) -> Vec<Domain> {
        Domain::FAN_OUT
            .into_iter()
            .filter(|d| self.get(*d) > 0)
            .collect()
    }
}

/// Output of intent classification for one query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    /// The query exactly as the user typed it
    pub query: String,
    pub intent: Intent,
    pub entities: Vec<Entity>,
    pub confidence: f64,
    pub routing_target: RoutingTarget,
    pub scores: DomainScores,
}
