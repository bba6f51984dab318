//! Library catalog and assistant
//!
//! Catalog search by field, availability, shelf locations with building
//! hours, holds and renewals. The [`LibraryAgent`] pulls a title out of the
//! query and picks a flow from the wording.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};

use concierge_core::AgentHandler;

use crate::mentions_any;

/// Results listed for a general search
const MAX_LISTED: usize = 3;
/// Loan period granted by a renewal
const RENEWAL_DAYS: u64 = 21;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Available,
    CheckedOut,
    OnHold,
    InRepair,
    Missing,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::CheckedOut => write!(f, "Checked Out"),
            Self::OnHold => write!(f, "On Hold"),
            Self::InRepair => write!(f, "In Repair"),
            Self::Missing => write!(f, "Missing"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    /// book, journal, article, ...
    pub kind: String,
    pub location: String,
    pub call_number: String,
    pub status: ItemStatus,
    pub due_date: Option<NaiveDate>,
    pub hold_count: u32,
    pub keywords: Vec<String>,
}

impl LibraryItem {
    /// First component of the location, e.g. "Main Library"
    pub fn building(&self) -> &str {
        self.location.split(", ").next().unwrap_or(&self.location)
    }
}

/// Which fields [`LibraryCatalog::search`] compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Author,
    Isbn,
    Keyword,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub status: ItemStatus,
    pub message: String,
    pub due_date: Option<NaiveDate>,
    pub hold_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfLocation {
    pub building: String,
    pub full_location: String,
    pub call_number: String,
    pub directions: String,
    pub hours: Option<&'static str>,
    pub entrance: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldOutcome {
    Placed { position: u32 },
    /// The item can be checked out right away
    NotNeeded,
}

pub struct LibraryCatalog {
    today: NaiveDate,
    items: Vec<LibraryItem>,
}

impl LibraryCatalog {
    /// Catalog seeded with the demo items, due dates relative to `today`
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            items: sample_items(today),
        }
    }

    pub fn get(&self, item_id: &str) -> Option<&LibraryItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    fn require(&self, item_id: &str) -> Result<&LibraryItem> {
        self.get(item_id)
            .ok_or_else(|| anyhow!("Item '{}' not found", item_id))
    }

    /// Case-insensitive substring search over the chosen field
    pub fn search(&self, term: &str, field: SearchField) -> Vec<&LibraryItem> {
        let term = term.to_lowercase();
        let term = term.as_str();
        self.items
            .iter()
            .filter(|item| {
                let title = || item.title.to_lowercase().contains(term);
                let author = || item.author.to_lowercase().contains(term);
                let isbn = || item.isbn.as_ref().is_some_and(|i| i.contains(term));
                let keyword = || item.keywords.iter().any(|k| k.to_lowercase().contains(term));
                match field {
                    SearchField::Title => title(),
                    SearchField::Author => author(),
                    SearchField::Isbn => isbn(),
                    SearchField::Keyword => keyword(),
                    SearchField::All => title() || author() || isbn() || keyword(),
                }
            })
            .collect()
    }

    /// Items with a keyword that appears in free text
    pub fn search_by_topic(&self, text: &str) -> Vec<&LibraryItem> {
        let lower = text.to_lowercase();
        self.items
            .iter()
            .filter(|item| {
                item.keywords
                    .iter()
                    .any(|k| crate::mentions(&lower, &k.to_lowercase()))
            })
            .collect()
    }

    /// Item whose short title (before any subtitle) appears in the text
    pub fn find_title_in(&self, lower: &str) -> Option<&LibraryItem> {
        self.items.iter().find(|item| {
            let short = item.title.split(':').next().unwrap_or(&item.title);
            crate::mentions(lower, &short.trim().to_lowercase())
        })
    }

    pub fn availability(&self, item_id: &str) -> Result<Availability> {
        let item = self.require(item_id)?;
        let message = match item.status {
            ItemStatus::Available => "Available for checkout".to_string(),
            ItemStatus::CheckedOut => match item.due_date {
                Some(due) => format!("Currently checked out, due back on {}", due),
                None => "Currently checked out".to_string(),
            },
            ItemStatus::OnHold => format!(
                "On hold for another patron. {} people in queue.",
                item.hold_count
            ),
            ItemStatus::InRepair => "Being repaired, not available right now".to_string(),
            ItemStatus::Missing => "Reported missing".to_string(),
        };
        Ok(Availability {
            status: item.status,
            message,
            due_date: item.due_date,
            hold_count: item.hold_count,
        })
    }

    pub fn location(&self, item_id: &str) -> Result<ShelfLocation> {
        let item = self.require(item_id)?;
        let building = item.building();
        let (hours, entrance) = match building {
            "Main Library" => (
                Some("Mon-Thu: 8am-11pm, Fri: 8am-6pm, Sat: 10am-6pm, Sun: 12pm-11pm"),
                Some("Main entrance on University Avenue"),
            ),
            "Science Library" => (
                Some("Mon-Fri: 8am-10pm, Sat: 10am-8pm, Sun: 12pm-10pm"),
                Some("Enter through Science Building, 2nd floor"),
            ),
            _ => (None, None),
        };
        Ok(ShelfLocation {
            building: building.to_string(),
            full_location: item.location.clone(),
            call_number: item.call_number.clone(),
            directions: format!(
                "Go to {}. Look for call number {}",
                item.location, item.call_number
            ),
            hours,
            entrance,
        })
    }

    pub fn place_hold(&self, item_id: &str, student_id: &str) -> Result<HoldOutcome> {
        let item = self.require(item_id)?;
        if item.status == ItemStatus::Available {
            return Ok(HoldOutcome::NotNeeded);
        }
        tracing::debug!("Hold on {} requested by {}", item.id, student_id);
        Ok(HoldOutcome::Placed {
            position: item.hold_count + 1,
        })
    }

    /// Extend a checked-out loan. Returns the new due date.
    pub fn renew(&self, item_id: &str, student_id: &str) -> Result<NaiveDate> {
        let item = self.require(item_id)?;
        if item.status != ItemStatus::CheckedOut {
            bail!("'{}' is not checked out and cannot be renewed", item.title);
        }
        if item.hold_count > 0 {
            bail!("'{}' has holds waiting and cannot be renewed", item.title);
        }
        tracing::debug!("Renewing {} for {}", item.id, student_id);
        self.today
            .checked_add_days(Days::new(RENEWAL_DAYS))
            .ok_or_else(|| anyhow!("Renewal date out of range"))
    }
}

static TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Quoted title
        r#"["']([^"']+)["']"#,
        r"(?:find|search for|look for|do you have)\s+(?:the\s+|a\s+|an\s+)?(.+?)(?:\s+by\s+.*|\s+books?\b.*|\?|$)",
        r"^(?:is\s+|where\s+is\s+)?(?:the\s+)?(.+?)\s+by\s+",
        r"^(.+?)\s+books?\s*\??$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Pull a probable title out of a library query
pub fn extract_title(lower: &str) -> Option<String> {
    TITLE_PATTERNS.iter().find_map(|re| {
        re.captures(lower)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Answers catalog questions for one student
pub struct LibraryAgent {
    catalog: Arc<LibraryCatalog>,
    student_id: String,
}

impl LibraryAgent {
    pub fn new(catalog: Arc<LibraryCatalog>, student_id: &str) -> Self {
        Self {
            catalog,
            student_id: student_id.to_string(),
        }
    }

    fn respond(&self, query: &str) -> Result<String> {
        let lower = query.to_lowercase();
        let title = extract_title(&lower);
        let found = title
            .as_deref()
            .and_then(|t| self.catalog.search(t, SearchField::Title).into_iter().next())
            .or_else(|| self.catalog.find_title_in(&lower));

        if let Some(item) = found {
            if mentions_any(&lower, &["available", "availability", "check"]) {
                let availability = self.catalog.availability(&item.id)?;
                return Ok(format!(
                    "**{}** by {}\nStatus: {}\nLocation: {}\nCall Number: {}",
                    item.title, item.author, availability.message, item.location, item.call_number
                ));
            }
            if mentions_any(&lower, &["where", "location", "find it"]) {
                let shelf = self.catalog.location(&item.id)?;
                let mut out = format!(
                    "**{}**\nLocation: {}\nCall Number: {}\nDirections: {}",
                    item.title, shelf.full_location, shelf.call_number, shelf.directions
                );
                if let Some(hours) = shelf.hours {
                    out.push_str(&format!("\nHours: {}", hours));
                }
                return Ok(out);
            }
            if mentions_any(&lower, &["hold", "reserve"]) {
                let message = match self.catalog.place_hold(&item.id, &self.student_id)? {
                    HoldOutcome::Placed { position } => format!(
                        "Hold placed successfully. You are number {} in the queue; expect it within 2-3 weeks.",
                        position
                    ),
                    HoldOutcome::NotNeeded => {
                        "Item is currently available for immediate checkout".to_string()
                    }
                };
                return Ok(format!("Hold request for **{}**\n{}", item.title, message));
            }
            if mentions_any(&lower, &["renew", "extend"]) {
                return Ok(match self.catalog.renew(&item.id, &self.student_id) {
                    Ok(due) => format!("Renewed **{}**. New due date: {}", item.title, due),
                    Err(e) => format!("Could not renew: {}", e),
                });
            }
        }

        self.general_search(&lower, title.as_deref())
    }

    fn general_search(&self, lower: &str, title: Option<&str>) -> Result<String> {
        let (label, results) = match title {
            Some(t) => {
                let hits = self.catalog.search(t, SearchField::All);
                if hits.is_empty() {
                    (t.to_string(), self.catalog.search_by_topic(lower))
                } else {
                    (t.to_string(), hits)
                }
            }
            None => (lower.to_string(), self.catalog.search_by_topic(lower)),
        };

        if results.is_empty() {
            return Ok(format!(
                "No items found matching '{}'. Try different keywords or check spelling.",
                label
            ));
        }

        let mut out = format!("Found {} item(s) matching '{}':\n\n", results.len(), label);
        for (i, item) in results.iter().take(MAX_LISTED).enumerate() {
            out.push_str(&format!("**{}. {}**\n", i + 1, item.title));
            out.push_str(&format!("   Author: {}\n", item.author));
            out.push_str(&format!("   Status: {}\n", item.status));
            out.push_str(&format!("   Location: {}\n", item.location));
            match (item.status, item.due_date) {
                (ItemStatus::CheckedOut, Some(due)) => {
                    out.push_str(&format!("   Due back: {}\n", due));
                }
                (ItemStatus::OnHold, _) if item.hold_count > 0 => {
                    out.push_str(&format!("   Hold queue: {} people waiting\n", item.hold_count));
                }
                _ => {}
            }
            out.push('\n');
        }
        if results.len() > MAX_LISTED {
            out.push_str(&format!("... and {} more results.", results.len() - MAX_LISTED));
        }
        Ok(out.trim_end().to_string())
    }
}

#[async_trait]
impl AgentHandler for LibraryAgent {
    fn description(&self) -> &str {
        "Searches the library catalog, checks availability and places holds"
    }

    async fn handle(&self, query: &str) -> Result<String> {
        self.respond(query)
    }
}

#[allow(clippy::too_many_arguments)]
fn item(
    id: &str,
    title: &str,
    author: &str,
    isbn: &str,
    location: &str,
    call_number: &str,
    status: ItemStatus,
    due_date: Option<NaiveDate>,
    hold_count: u32,
    keywords: &[&str],
) -> LibraryItem {
    LibraryItem {
        id: id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
        isbn: Some(isbn.to_string()),
        kind: "book".to_string(),
        location: location.to_string(),
        call_number: call_number.to_string(),
        status,
        due_date,
        hold_count,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn sample_items(today: NaiveDate) -> Vec<LibraryItem> {
    vec![
        item(
            "CC001",
            "Clean Code: A Handbook of Agile Software Craftsmanship",
            "Robert C. Martin",
            "9780132350884",
            "Main Library, Floor 3, Aisle 7, Shelf 4",
            "QA76.76.D47 M37 2008",
            ItemStatus::Available,
            None,
            0,
            &["programming", "software engineering", "agile", "clean code"],
        ),
        item(
            "DP001",
            "Design Patterns: Elements of Reusable Object-Oriented Software",
            "Gang of Four",
            "9780201633612",
            "Main Library, Floor 3, Aisle 8, Shelf 2",
            "QA76.64 G35 1995",
            ItemStatus::CheckedOut,
            today.checked_add_days(Days::new(7)),
            0,
            &["design patterns", "object-oriented", "programming", "software engineering"],
        ),
        item(
            "ALG001",
            "Introduction to Algorithms",
            "Thomas H. Cormen",
            "9780262033848",
            "Science Library, Floor 2, Section 3A",
            "QA76.6 C662 2009",
            ItemStatus::Available,
            None,
            0,
            &["algorithms", "computer science", "data structures"],
        ),
        item(
            "DIA001",
            "Designing Data-Intensive Applications",
            "Martin Kleppmann",
            "9781449373320",
            "Main Library, Floor 2, Aisle 12, Shelf 3",
            "QA76.9.D3 K54 2017",
            ItemStatus::OnHold,
            today.checked_add_days(Days::new(3)),
            3,
            &["databases", "distributed systems", "big data", "scalability"],
        ),
        item(
            "PCC001",
            "Python Crash Course",
            "Eric Matthes",
            "9781593279288",
            "Main Library, Floor 1, Programming Section",
            "QA76.73.P98 M38 2019",
            ItemStatus::Available,
            None,
            0,
            &["python", "programming", "beginner", "tutorial"],
        ),
        item(
            "AI001",
            "Artificial Intelligence: A Modern Approach",
            "Stuart Russell and Peter Norvig",
            "9780134610993",
            "Science Library, Floor 3, AI Section",
            "Q335 R87 2020",
            ItemStatus::Available,
            None,
            0,
            &["artificial intelligence", "machine learning", "ai", "computer science"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
    }

    fn catalog() -> LibraryCatalog {
        LibraryCatalog::new(today())
    }

    fn agent() -> LibraryAgent {
        LibraryAgent::new(Arc::new(catalog()), "student123")
    }

    fn ids(items: &[&LibraryItem]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_search_fields() {
        let cat = catalog();
        assert_eq!(ids(&cat.search("clean code", SearchField::Title)), vec!["CC001"]);
        assert_eq!(ids(&cat.search("martin", SearchField::Author)), vec!["CC001", "DIA001"]);
        assert_eq!(ids(&cat.search("9781593", SearchField::Isbn)), vec!["PCC001"]);
        assert_eq!(
            ids(&cat.search("software engineering", SearchField::Keyword)),
            vec!["CC001", "DP001"]
        );
        assert!(cat.search("martin", SearchField::Title).is_empty());
        assert_eq!(cat.search("python", SearchField::All).len(), 1);
    }

    #[test]
    fn test_search_by_topic_word_bounded() {
        let cat = catalog();
        assert_eq!(
            ids(&cat.search_by_topic("I need something on machine learning")),
            vec!["AI001"]
        );
        assert!(cat.search_by_topic("is it available").is_empty());
    }

    #[test]
    fn test_availability_messages() {
        let cat = catalog();
        assert_eq!(cat.availability("CC001").unwrap().message, "Available for checkout");
        assert_eq!(
            cat.availability("DP001").unwrap().message,
            "Currently checked out, due back on 2025-10-08"
        );
        assert_eq!(
            cat.availability("DIA001").unwrap().message,
            "On hold for another patron. 3 people in queue."
        );
        assert!(cat.availability("NOPE").is_err());
    }

    #[test]
    fn test_location_hours() {
        let cat = catalog();
        let main = cat.location("CC001").unwrap();
        assert_eq!(main.building, "Main Library");
        assert_eq!(main.entrance, Some("Main entrance on University Avenue"));
        let science = cat.location("AI001").unwrap();
        assert_eq!(science.building, "Science Library");
        assert!(science.hours.unwrap().starts_with("Mon-Fri"));
        assert!(
            science
                .directions
                .ends_with("Look for call number Q335 R87 2020")
        );
    }

    #[test]
    fn test_holds() {
        let cat = catalog();
        assert_eq!(
            cat.place_hold("CC001", "student123").unwrap(),
            HoldOutcome::NotNeeded
        );
        assert_eq!(
            cat.place_hold("DIA001", "student123").unwrap(),
            HoldOutcome::Placed { position: 4 }
        );
        assert!(cat.place_hold("NOPE", "student123").is_err());
    }

    #[test]
    fn test_renew() {
        let cat = catalog();
        assert_eq!(
            cat.renew("DP001", "student123").unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 22).unwrap()
        );
        assert!(cat.renew("CC001", "student123").is_err());
        assert!(cat.renew("DIA001", "student123").is_err());
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("do you have \"clean code\" in stock?").as_deref(),
            Some("clean code")
        );
        assert_eq!(
            extract_title("find introduction to algorithms").as_deref(),
            Some("introduction to algorithms")
        );
        assert_eq!(
            extract_title("find the python crash course book").as_deref(),
            Some("python crash course")
        );
        assert_eq!(
            extract_title("design patterns by gang of four").as_deref(),
            Some("design patterns")
        );
        assert_eq!(extract_title("python book").as_deref(), Some("python"));
        assert_eq!(extract_title("hello"), None);
    }

    #[tokio::test]
    async fn test_handler_availability() {
        let reply = agent()
            .handle("Is \"Design Patterns\" available?")
            .await
            .unwrap();
        assert!(reply.starts_with("**Design Patterns: Elements of Reusable Object-Oriented Software** by Gang of Four"));
        assert!(reply.contains("Status: Currently checked out, due back on 2025-10-08"));
    }

    #[test]
    fn test_find_title_in() {
        let cat = catalog();
        assert_eq!(cat.find_title_in("is clean code available?").unwrap().id, "CC001");
        assert!(cat.find_title_in("any code books?").is_none());
    }

    #[tokio::test]
    async fn test_handler_title_without_quotes() {
        let reply = agent().handle("Is Clean Code available?").await.unwrap();
        assert!(reply.contains("Status: Available for checkout"));
        assert!(reply.contains("Call Number: QA76.76.D47 M37 2008"));
    }

    #[tokio::test]
    async fn test_handler_location() {
        let reply = agent()
            .handle("Where is 'Introduction to Algorithms'?")
            .await
            .unwrap();
        assert!(reply.contains("Location: Science Library, Floor 2, Section 3A"));
        assert!(reply.contains("Hours: Mon-Fri"));
    }

    #[tokio::test]
    async fn test_handler_hold() {
        let reply = agent()
            .handle("Please put a hold on 'designing data-intensive applications'")
            .await
            .unwrap();
        assert!(reply.starts_with("Hold request for **Designing Data-Intensive Applications**"));
        assert!(reply.contains("number 4 in the queue"));
    }

    #[tokio::test]
    async fn test_handler_general_search_by_topic() {
        let reply = agent()
            .handle("I need a book for my machine learning course")
            .await
            .unwrap();
        assert!(reply.contains("**1. Artificial Intelligence: A Modern Approach**"));
        assert!(reply.contains("Status: Available"));
    }

    #[tokio::test]
    async fn test_handler_general_search_lists_top_three() {
        let reply = agent().handle("find programming books").await.unwrap();
        assert!(reply.starts_with("Found 3 item(s) matching 'programming':"));
        assert!(reply.contains("Due back: 2025-10-08"));
    }

    #[tokio::test]
    async fn test_handler_nothing_found() {
        let reply = agent().handle("find \"quantum basket weaving\"").await.unwrap();
        assert_eq!(
            reply,
            "No items found matching 'quantum basket weaving'. Try different keywords or check spelling."
        );
    }
}
