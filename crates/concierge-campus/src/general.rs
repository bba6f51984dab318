//! Fallback assistant for queries no domain claims

use anyhow::Result;
use async_trait::async_trait;

use concierge_core::AgentHandler;

use crate::mentions_any;

const CAPABILITIES: &[(&str, &str)] = &[
    (
        "Course Planning",
        "find courses, check prerequisites, plan your academic path",
    ),
    (
        "Library Services",
        "search the catalog, check availability, locate and reserve books",
    ),
    (
        "Campus Events",
        "discover upcoming events, register, set reminders",
    ),
    (
        "Document Analysis",
        "read syllabi and assignments from photos or PDFs",
    ),
    (
        "Your Profile",
        "review your preferences and get personalized recommendations",
    ),
];

const GREETINGS: &[&str] = &["hi", "hello", "hey", "good morning", "good afternoon"];
const THANKS: &[&str] = &["thanks", "thank you", "thx"];

/// Explains what the concierge can do
#[derive(Debug, Default)]
pub struct GeneralAssistant;

impl GeneralAssistant {
    pub fn new() -> Self {
        Self
    }

    fn opening(lower: &str) -> &'static str {
        if mentions_any(lower, THANKS) {
            "You're welcome! Anything else I can help with?"
        } else if mentions_any(lower, GREETINGS) {
            "Hi there! I'm your campus assistant."
        } else {
            "I'm not sure which service fits that question, but here's what I can help with."
        }
    }
}

#[async_trait]
impl AgentHandler for GeneralAssistant {
    fn description(&self) -> &str {
        "Explains the available campus services"
    }

    async fn handle(&self, query: &str) -> Result<String> {
        let lower = query.to_lowercase();
        let mut out = format!("{}\n\n", Self::opening(&lower));
        for (service, detail) in CAPABILITIES {
            out.push_str(&format!("- **{}**: {}\n", service, detail));
        }
        out.push_str("\nTry something like \"Find AI courses for next semester\" or \"Is Clean Code available?\"");
        Ok(out)
    }
}
