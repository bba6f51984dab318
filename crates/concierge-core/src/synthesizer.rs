//! Response synthesis
//!
//! Merges a [`ResponseBundle`] into the text shown to the student. Sections
//! appear in bundle insertion order, which the router keeps equal to
//! dispatch order.

use crate::bundle::{BundleEntry, ResponseBundle};

/// Shown when no handler produced anything
pub const DEFAULT_FALLBACK_MESSAGE: &str = "I couldn't find a service able to answer that yet. \
Try asking about courses, the library, campus events, documents, or your profile.";

const CLOSING_LINE: &str = "Is there anything specific you'd like me to elaborate on?";

/// Human-readable section title for a handler name
pub fn section_title(handler: &str) -> String {
    match handler {
        "document_analyzer" => "Document Analysis".to_string(),
        "course_advisor" => "Course Information".to_string(),
        "library_agent" => "Library Resources".to_string(),
        "events_agent" => "Campus Events".to_string(),
        "profile_agent" => "Student Profile".to_string(),
        "general_assistant" => "General Help".to_string(),
        other => title_case(other),
    }
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct ResponseSynthesizer {
    fallback_message: String,
}

impl ResponseSynthesizer {
    pub fn new(fallback_message: impl Into<String>) -> Self {
        Self {
            fallback_message: fallback_message.into(),
        }
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback_message
    }

    /// Combine handler outputs into one reply.
    ///
    /// One entry is returned as-is, several are framed with a preamble
    /// quoting the query and a titled section each.
    pub fn synthesize(&self, bundle: &ResponseBundle, query: &str) -> String {
        let mut entries = bundle.iter();
        match (entries.next(), entries.next()) {
            (None, _) => self.fallback_message.clone(),
            (Some((name, entry)), None) => render_entry(name, entry),
            _ => {
                let mut out = format!("Here's what I found for your query: '{}'\n\n", query);
                for (name, entry) in bundle.iter() {
                    out.push_str(&format!(
                        "**{}:**\n{}\n\n",
                        section_title(name),
                        render_entry(name, entry)
                    ));
                }
                out.push_str(CLOSING_LINE);
                out
            }
        }
    }
}

impl Default for ResponseSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_MESSAGE)
    }
}

fn render_entry(name: &str, entry: &BundleEntry) -> String {
    match entry {
        BundleEntry::Completed(text) => text.clone(),
        BundleEntry::TimedOut => format!("_{} did not respond in time._", section_title(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(text: &str) -> BundleEntry {
        BundleEntry::Completed(text.to_string())
    }

    #[test]
    fn test_single_entry_is_identity() {
        let mut bundle = ResponseBundle::new();
        bundle.insert("course_advisor", completed("Here are 3 courses\n- CS101"));
        let out = ResponseSynthesizer::default().synthesize(&bundle, "courses?");
        assert_eq!(out, "Here are 3 courses\n- CS101");
    }

    #[test]
    fn test_sections_follow_insertion_order() {
        let mut bundle = ResponseBundle::new();
        bundle.insert("document_analyzer", completed("A"));
        bundle.insert("course_advisor", completed("B"));

        let out = ResponseSynthesizer::default().synthesize(&bundle, "syllabus for my course");
        assert_eq!(
            out,
            "Here's what I found for your query: 'syllabus for my course'\n\n\
             **Document Analysis:**\nA\n\n\
             **Course Information:**\nB\n\n\
             Is there anything specific you'd like me to elaborate on?"
        );
    }

    #[test]
    fn test_order_is_not_alphabetical() {
        let mut bundle = ResponseBundle::new();
        bundle.insert("library_agent", completed("L"));
        bundle.insert("course_advisor", completed("C"));

        let out = ResponseSynthesizer::default().synthesize(&bundle, "q");
        let library = out.find("**Library Resources:**").unwrap();
        let course = out.find("**Course Information:**").unwrap();
        assert!(library < course);
    }

    #[test]
    fn test_empty_bundle_uses_fallback() {
        let bundle = ResponseBundle::new();
        assert_eq!(
            ResponseSynthesizer::default().synthesize(&bundle, "anything"),
            DEFAULT_FALLBACK_MESSAGE
        );

        let custom = ResponseSynthesizer::new("Nobody home.");
        assert_eq!(custom.synthesize(&bundle, "anything"), "Nobody home.");
    }

    #[test]
    fn test_timed_out_rendering() {
        let mut bundle = ResponseBundle::new();
        bundle.insert("events_agent", BundleEntry::TimedOut);
        let synth = ResponseSynthesizer::default();
        assert_eq!(
            synth.synthesize(&bundle, "q"),
            "_Campus Events did not respond in time._"
        );

        bundle.insert("library_agent", completed("L"));
        let out = synth.synthesize(&bundle, "q");
        assert!(out.contains("**Campus Events:**\n_Campus Events did not respond in time._"));
        assert!(out.contains("**Library Resources:**\nL"));
    }

    #[test]
    fn test_section_titles() {
        assert_eq!(section_title("profile_agent"), "Student Profile");
        assert_eq!(section_title("general_assistant"), "General Help");
        assert_eq!(section_title("dining_hall_menu"), "Dining Hall Menu");
        assert_eq!(section_title("weather"), "Weather");
    }
}
