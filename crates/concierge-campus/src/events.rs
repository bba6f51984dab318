//! Campus events calendar and assistant

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use concierge_core::AgentHandler;

use crate::mentions;

/// Events listed in a handler reply
const MAX_LISTED: usize = 5;
/// Description preview length in listings
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Academic,
    Sports,
    Cultural,
    Workshops,
    Career,
    Social,
    Club,
    Conference,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Academic => write!(f, "academic"),
            Self::Sports => write!(f, "sports"),
            Self::Cultural => write!(f, "cultural"),
            Self::Workshops => write!(f, "workshops"),
            Self::Career => write!(f, "career"),
            Self::Social => write!(f, "social"),
            Self::Club => write!(f, "club"),
            Self::Conference => write!(f, "conference"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub required: bool,
    pub link: Option<String>,
    pub capacity: Option<u32>,
    pub registered: u32,
}

impl RegistrationInfo {
    pub fn spots_remaining(&self) -> Option<u32> {
        self.capacity.map(|c| c.saturating_sub(self.registered))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub date: NaiveDate,
    /// HH:MM
    pub start: String,
    pub end: String,
    pub location: String,
    pub department: String,
    pub organizer: String,
    pub registration: RegistrationInfo,
    pub tags: Vec<String>,
    pub cost: String,
}

impl Event {
    fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title.to_lowercase(),
            self.description.to_lowercase(),
            self.tags.join(" ").to_lowercase()
        )
    }
}

/// Filters for [`EventCalendar::upcoming`]
#[derive(Debug, Clone)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
    pub days_ahead: u64,
    pub department: Option<String>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            category: None,
            days_ahead: 30,
            department: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered { confirmation: String },
    NotRequired,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: String,
    pub event_title: String,
    pub when: String,
}

pub struct EventCalendar {
    today: NaiveDate,
    events: Vec<Event>,
}

impl EventCalendar {
    /// Calendar seeded with the demo events, dated relative to `today`
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            events: sample_events(today),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Events from today through `days_ahead`, earliest first
    pub fn upcoming(&self, filter: &EventFilter) -> Vec<&Event> {
        let cutoff = self
            .today
            .checked_add_days(Days::new(filter.days_ahead))
            .unwrap_or(NaiveDate::MAX);
        let mut events: Vec<&Event> = self
            .events
            .iter()
            .filter(|e| e.date >= self.today && e.date <= cutoff)
            .filter(|e| filter.category.is_none_or(|c| e.category == c))
            .filter(|e| {
                filter
                    .department
                    .as_ref()
                    .is_none_or(|d| e.department.eq_ignore_ascii_case(d))
            })
            .collect();
        events.sort_by_key(|e| e.date);
        events
    }

    /// Future events whose title, description or tags contain any keyword
    pub fn search(&self, keywords: &[&str], category: Option<EventCategory>) -> Vec<&Event> {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
        self.events
            .iter()
            .filter(|e| e.date >= self.today)
            .filter(|e| category.is_none_or(|c| e.category == c))
            .filter(|e| {
                let text = e.searchable_text();
                keywords.iter().any(|k| text.contains(k.as_str()))
            })
            .collect()
    }

    pub fn register(&self, event_id: &str, student_id: &str) -> Result<RegistrationOutcome> {
        let event = self
            .get(event_id)
            .ok_or_else(|| anyhow!("Event '{}' not found", event_id))?;
        if !event.registration.required {
            return Ok(RegistrationOutcome::NotRequired);
        }
        if event.registration.spots_remaining() == Some(0) {
            return Ok(RegistrationOutcome::Full);
        }
        Ok(RegistrationOutcome::Registered {
            confirmation: format!("REG-{}-{}", event.id, short_id(student_id)),
        })
    }

    pub fn set_reminder(&self, event_id: &str, student_id: &str, when: &str) -> Result<Reminder> {
        let event = self
            .get(event_id)
            .ok_or_else(|| anyhow!("Event '{}' not found", event_id))?;
        Ok(Reminder {
            id: format!("REM-{}-{}", event.id, short_id(student_id)),
            event_title: event.title.clone(),
            when: when.to_string(),
        })
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

const CATEGORY_HINTS: &[(EventCategory, &[&str])] = &[
    (EventCategory::Academic, &["academic", "lecture", "seminar", "research"]),
    (EventCategory::Sports, &["sports", "game", "match", "athletics"]),
    (EventCategory::Cultural, &["cultural", "festival", "art", "music"]),
    (EventCategory::Workshops, &["workshop", "training", "tutorial", "class"]),
    (EventCategory::Career, &["career", "job", "internship", "networking"]),
    (EventCategory::Social, &["social", "party", "gathering", "mixer"]),
    (EventCategory::Club, &["club", "meeting", "organization"]),
    (EventCategory::Conference, &["conference", "symposium", "summit"]),
];

const INTEREST_TERMS: &[&str] = &[
    "ai",
    "python",
    "chess",
    "soccer",
    "food",
    "music",
    "art",
    "programming",
    "machine learning",
];

/// First category whose hint words appear in the query
pub fn detect_category(lower: &str) -> Option<EventCategory> {
    CATEGORY_HINTS
        .iter()
        .find(|(_, hints)| {
            hints
                .iter()
                .any(|hint| mentions(lower, hint) || mentions(lower, &format!("{}s", hint)))
        })
        .map(|(category, _)| *category)
}

/// Look-ahead window implied by the query
pub fn detect_window(lower: &str) -> u64 {
    if lower.contains("today") {
        1
    } else if lower.contains("this week") {
        7
    } else if lower.contains("next week") {
        14
    } else if lower.contains("this month") {
        30
    } else {
        60
    }
}

/// Answers questions about campus events
pub struct EventsAgent {
    calendar: Arc<EventCalendar>,
    student_id: String,
}

impl EventsAgent {
    pub fn new(calendar: Arc<EventCalendar>, student_id: &str) -> Self {
        Self {
            calendar,
            student_id: student_id.to_string(),
        }
    }

    /// Event explicitly named by id in the query, e.g. "EVT004"
    fn named_event(&self, lower: &str) -> Option<&Event> {
        self.calendar
            .events
            .iter()
            .find(|e| lower.contains(&e.id.to_lowercase()))
    }

    fn respond(&self, query: &str) -> Result<String> {
        let lower = query.to_lowercase();

        if lower.contains("remind") {
            return Ok(match self.named_event(&lower) {
                Some(event) => {
                    let reminder =
                        self.calendar
                            .set_reminder(&event.id, &self.student_id, "1 day before")?;
                    format!(
                        "Reminder set for '{}' ({}). Reference: {}",
                        reminder.event_title, reminder.when, reminder.id
                    )
                }
                None => "To set up reminders, please specify which event you're interested in. \
                         I can help you find events first, then set reminders."
                    .to_string(),
            });
        }

        if lower.contains("register") || lower.contains("sign up") {
            return Ok(match self.named_event(&lower) {
                Some(event) => match self.calendar.register(&event.id, &self.student_id)? {
                    RegistrationOutcome::Registered { confirmation } => format!(
                        "Successfully registered for '{}'. Confirmation: {}",
                        event.title, confirmation
                    ),
                    RegistrationOutcome::NotRequired => {
                        format!("'{}' doesn't require registration. Just show up!", event.title)
                    }
                    RegistrationOutcome::Full => format!("'{}' is at full capacity.", event.title),
                },
                None => "To register for events, please specify which event you're interested in. \
                         I can help you find events that require registration."
                    .to_string(),
            });
        }

        let category = detect_category(&lower);
        let interests: Vec<&str> = INTEREST_TERMS
            .iter()
            .copied()
            .filter(|term| mentions(&lower, term))
            .collect();

        let events = if interests.is_empty() {
            self.calendar.upcoming(&EventFilter {
                category,
                days_ahead: detect_window(&lower),
                department: None,
            })
        } else {
            self.calendar.search(&interests, category)
        };

        let category_text = category
            .map(|c| format!(" in the {} category", c))
            .unwrap_or_default();
        if events.is_empty() {
            return Ok(format!(
                "No upcoming events found{} matching your criteria.",
                category_text
            ));
        }

        let mut out = format!("Found {} upcoming event(s){}:\n\n", events.len(), category_text);
        for event in events.iter().take(MAX_LISTED) {
            out.push_str(&render_event(event));
        }
        if events.len() > MAX_LISTED {
            out.push_str(&format!(
                "... and {} more events. Use more specific keywords to narrow results.",
                events.len() - MAX_LISTED
            ));
        }
        Ok(out.trim_end().to_string())
    }
}

fn render_event(event: &Event) -> String {
    let mut out = format!("**{}**\n", event.title);
    out.push_str(&format!("Date: {} at {}\n", event.date, event.start));
    out.push_str(&format!("Location: {}\n", event.location));
    out.push_str(&format!("Cost: {}\n", event.cost));
    if event.registration.required {
        let spots = event
            .registration
            .spots_remaining()
            .map(|n| format!(" ({} spots remaining)", n))
            .unwrap_or_default();
        out.push_str(&format!("Registration required{}\n", spots));
        if let Some(link) = &event.registration.link {
            out.push_str(&format!("Register: {}\n", link));
        }
    }
    let preview: String = event.description.chars().take(PREVIEW_CHARS).collect();
    let ellipsis = if event.description.chars().count() > PREVIEW_CHARS {
        "..."
    } else {
        ""
    };
    out.push_str(&format!("{}{}\n\n", preview, ellipsis));
    out
}

#[async_trait]
impl AgentHandler for EventsAgent {
    fn description(&self) -> &str {
        "Finds campus events, registrations and reminders"
    }

    async fn handle(&self, query: &str) -> Result<String> {
        self.respond(query)
    }
}

#[allow(clippy::too_many_arguments)]
fn event(
    today: NaiveDate,
    offset_days: i64,
    id: &str,
    title: &str,
    description: &str,
    category: EventCategory,
    hours: (&str, &str),
    location: &str,
    department: &str,
    organizer: &str,
    registration: RegistrationInfo,
    tags: &[&str],
    cost: &str,
) -> Event {
    let date = if offset_days >= 0 {
        today.checked_add_days(Days::new(offset_days.unsigned_abs()))
    } else {
        today.checked_sub_days(Days::new(offset_days.unsigned_abs()))
    }
    .unwrap_or(today);
    Event {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category,
        date,
        start: hours.0.to_string(),
        end: hours.1.to_string(),
        location: location.to_string(),
        department: department.to_string(),
        organizer: organizer.to_string(),
        registration,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        cost: cost.to_string(),
    }
}

fn open_registration(link: &str, capacity: u32, registered: u32) -> RegistrationInfo {
    RegistrationInfo {
        required: true,
        link: Some(link.to_string()),
        capacity: Some(capacity),
        registered,
    }
}

fn sample_events(today: NaiveDate) -> Vec<Event> {
    vec![
        event(
            today,
            20,
            "EVT001",
            "Fall Semester Career Fair",
            "Meet with top employers and explore internship and job opportunities across all majors.",
            EventCategory::Career,
            ("10:00", "16:00"),
            "Student Union Ballroom",
            "Career Services",
            "career@university.edu",
            open_registration("https://university.edu/careerfair-registration", 500, 234),
            &["career", "networking", "jobs", "internships"],
            "Free",
        ),
        event(
            today,
            4,
            "EVT002",
            "Guest Lecture: AI in Healthcare",
            "A visiting researcher presents the latest developments in medical AI applications.",
            EventCategory::Academic,
            ("14:00", "15:30"),
            "Engineering Auditorium, Room 101",
            "Computer Science",
            "Dr. Johnson",
            RegistrationInfo::default(),
            &["ai", "healthcare", "machine learning", "research"],
            "Free",
        ),
        event(
            today,
            -1,
            "EVT003",
            "Varsity Soccer Match vs. State University",
            "Support our Wildcats in this crucial conference match!",
            EventCategory::Sports,
            ("19:00", "21:00"),
            "University Stadium",
            "Athletics",
            "athletics@university.edu",
            RegistrationInfo::default(),
            &["soccer", "sports", "wildcats", "conference"],
            "$5 students, $10 general",
        ),
        event(
            today,
            2,
            "EVT004",
            "Programming Workshop: Introduction to Python",
            "Learn Python basics in this hands-on workshop. Perfect for beginners!",
            EventCategory::Workshops,
            ("18:00", "20:00"),
            "Computer Lab, Science Building Room 204",
            "Computer Science",
            "Python Club",
            open_registration("https://university.edu/python-workshop", 25, 18),
            &["programming", "python", "coding", "workshop", "beginners"],
            "Free",
        ),
        event(
            today,
            9,
            "EVT005",
            "International Food Festival",
            "Taste cuisines from around the world prepared by international student organizations.",
            EventCategory::Cultural,
            ("17:00", "21:00"),
            "University Plaza",
            "International Student Services",
            "International Club",
            RegistrationInfo::default(),
            &["food", "cultural", "international", "festival"],
            "$3-8 per dish",
        ),
        event(
            today,
            0,
            "EVT006",
            "Chess Club Weekly Meeting",
            "All skill levels welcome! Learn strategies, play friendly matches, and prepare for tournaments.",
            EventCategory::Club,
            ("19:00", "21:00"),
            "Student Center Room 305",
            "Student Activities",
            "Chess Club President",
            RegistrationInfo::default(),
            &["chess", "games", "strategy", "weekly", "club"],
            "Free",
        ),
        event(
            today,
            40,
            "EVT007",
            "Machine Learning Research Symposium",
            "Graduate students and faculty present cutting-edge ML research.",
            EventCategory::Conference,
            ("09:00", "17:00"),
            "Conference Center",
            "Computer Science",
            "Dr. Williams",
            open_registration("https://university.edu/ml-symposium", 200, 145),
            &["machine learning", "research", "symposium", "graduate", "ai"],
            "Free for students, $50 professionals",
        ),
    ]
}
