//! Entity extraction
//!
//! Pulls typed fragments out of free text with a fixed, ordered set of
//! pattern categories: time expressions, explicit constraints, subject
//! areas and course types. Output order follows category order, then match
//! position inside the category. Extraction is total: any input, including
//! the empty string, yields a (possibly empty) list.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{Entity, EntityKind};

/// Confidence for explicit time matches
pub const TIME_CONFIDENCE: f64 = 0.9;
/// Confidence for explicit constraint matches
pub const CONSTRAINT_CONFIDENCE: f64 = 0.9;
/// Confidence for closed-vocabulary subject hits
pub const SUBJECT_CONFIDENCE: f64 = 0.7;
/// Confidence for closed-vocabulary course-type hits
pub const COURSE_TYPE_CONFIDENCE: f64 = 0.7;

/// Subject areas recognized in queries
pub const SUBJECTS: &[&str] = &[
    "ai",
    "computer science",
    "mathematics",
    "physics",
    "chemistry",
    "biology",
    "history",
    "english",
    "psychology",
    "economics",
];

/// Course types recognized in queries
pub const COURSE_TYPES: &[&str] = &["elective", "required", "prerequisite", "major", "minor"];

// Day-parts, weekdays, relative dates, months, then clock times.
static RE_TIME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:morning|afternoon|evening|night|monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tomorrow|yesterday|next week|this week|january|february|march|april|may|june|july|august|september|october|november|december)\b|\b\d{1,2}:\d{2}(?:\s*(?:am|pm))?\b",
    )
    .ok()
});

// Negated day-parts, before/after/until bounds, credit or hour limits.
static RE_CONSTRAINT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:not|no|avoid|exclude|except|without)\s+(?:morning|afternoon|evening)s?\b|\b(?:before|after|until|by)\s+\d{1,2}:\d{2}\b|\b(?:minimum|maximum|at least|no more than)\s+\d+\s+(?:credits?|hours?)\b",
    )
    .ok()
});

static RE_SUBJECT: LazyLock<Option<Regex>> = LazyLock::new(|| vocabulary_regex(SUBJECTS, false));

static RE_COURSE_TYPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| vocabulary_regex(COURSE_TYPES, true));

/// Word-bounded alternation over a closed vocabulary
fn vocabulary_regex(terms: &[&str], allow_plural: bool) -> Option<Regex> {
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    let suffix = if allow_plural { "s?" } else { "" };
    Regex::new(&format!(r"\b(?:{}){}\b", alternation, suffix)).ok()
}

/// Extract entities from a query. Matching is case-insensitive.
pub fn extract(query: &str) -> Vec<Entity> {
    let lower = query.to_lowercase();
    let mut entities = Vec::new();

    let categories: [(&LazyLock<Option<Regex>>, EntityKind, f64); 4] = [
        (&RE_TIME, EntityKind::Time, TIME_CONFIDENCE),
        (&RE_CONSTRAINT, EntityKind::Constraint, CONSTRAINT_CONFIDENCE),
        (&RE_SUBJECT, EntityKind::Subject, SUBJECT_CONFIDENCE),
        (&RE_COURSE_TYPE, EntityKind::CourseType, COURSE_TYPE_CONFIDENCE),
    ];

    for (regex, kind, confidence) in categories {
        collect_matches(&lower, regex, kind, confidence, &mut entities);
    }

    entities
}

fn collect_matches(
    text: &str,
    regex: &LazyLock<Option<Regex>>,
    kind: EntityKind,
    confidence: f64,
    out: &mut Vec<Entity>,
) {
    let Some(re) = regex.as_ref() else { return };
    for m in re.find_iter(text) {
        out.push(Entity {
            kind,
            value: m.as_str().to_string(),
            confidence,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entities: &[Entity], kind: EntityKind) -> Vec<&str> {
        entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.value.as_str())
            .collect()
    }

    #[test]
    fn test_patterns_compile() {
        assert!(RE_TIME.is_some());
        assert!(RE_CONSTRAINT.is_some());
        assert!(RE_SUBJECT.is_some());
        assert!(RE_COURSE_TYPE.is_some());
    }

    #[test]
    fn test_empty_query() {
        assert!(extract("").is_empty());
        assert!(extract("hello there").is_empty());
    }

    #[test]
    fn test_time_and_constraints() {
        let entities = extract("No morning classes on Monday, before 10:30, at least 3 credits");
        assert_eq!(
            values(&entities, EntityKind::Time),
            vec!["morning", "monday", "10:30"]
        );
        assert_eq!(
            values(&entities, EntityKind::Constraint),
            vec!["no morning", "before 10:30", "at least 3 credits"]
        );
    }

    #[test]
    fn test_category_order_then_position() {
        let entities = extract("elective in physics next week");
        let kinds: Vec<EntityKind> = entities.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EntityKind::Time, EntityKind::Subject, EntityKind::CourseType]
        );
        assert_eq!(entities[0].value, "next week");
        assert_eq!(entities[1].value, "physics");
        assert_eq!(entities[2].value, "elective");
    }

    #[test]
    fn test_clock_with_meridiem() {
        let entities = extract("Meet at 2:30 PM tomorrow");
        assert_eq!(
            values(&entities, EntityKind::Time),
            vec!["2:30 pm", "tomorrow"]
        );
    }

    #[test]
    fn test_subjects_are_word_bounded() {
        let entities = extract("Is the AI book available? I study Computer Science");
        assert_eq!(
            values(&entities, EntityKind::Subject),
            vec!["ai", "computer science"]
        );

        // "available" and "said" must not produce an "ai" hit
        assert!(values(&extract("Is it available, she said"), EntityKind::Subject).is_empty());
    }

    #[test]
    fn test_course_types_accept_plural() {
        let entities = extract("Which prerequisites does my major require?");
        assert_eq!(
            values(&entities, EntityKind::CourseType),
            vec!["prerequisites", "major"]
        );
    }

    #[test]
    fn test_repeated_matches_each_count() {
        let entities = extract("monday or monday");
        assert_eq!(values(&entities, EntityKind::Time), vec!["monday", "monday"]);
    }

    #[test]
    fn test_confidence_monotonic() {
        assert!(TIME_CONFIDENCE >= SUBJECT_CONFIDENCE);
        assert!(TIME_CONFIDENCE >= COURSE_TYPE_CONFIDENCE);
        assert!(CONSTRAINT_CONFIDENCE >= SUBJECT_CONFIDENCE);
        assert!(CONSTRAINT_CONFIDENCE >= COURSE_TYPE_CONFIDENCE);

        for entity in extract("avoid evenings, history elective, friday") {
            assert!((0.0..=1.0).contains(&entity.confidence));
        }
    }

    #[test]
    fn test_deterministic() {
        let query = "AI electives on Tuesday after 14:00, no more than 4 credits";
        assert_eq!(extract(query), extract(query));
    }
}
