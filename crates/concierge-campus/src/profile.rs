//! Student profiles, privacy filtering and personalization
//!
//! Profiles live in an in-memory store guarded by a tokio `RwLock`. Reads
//! for personalization always go through [`ProfileStore::personalized_context`],
//! which honours data consent and the student's privacy level.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use concierge_core::AgentHandler;

use crate::events::EventCalendar;

/// Number of recent interactions exposed in a profile context
const RECENT_INTERACTIONS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    #[default]
    UniversityOnly,
    Private,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    InApp,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AcademicStanding {
    #[default]
    Good,
    Probation,
    Honors,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    #[default]
    Visual,
    Auditory,
    Kinesthetic,
    Reading,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcademicRecord {
    pub major: String,
    pub minor: Option<String>,
    /// 1-4 for undergraduates, 5+ for graduate students
    pub year: u8,
    pub gpa: Option<f32>,
    pub completed_courses: Vec<String>,
    pub current_courses: Vec<String>,
    pub standing: AcademicStanding,
    pub expected_graduation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimePreferences {
    pub avoid_mornings: bool,
    pub preferred_study_time: Option<String>,
}

impl std::fmt::Display for TimePreferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.avoid_mornings {
            parts.push("no morning classes".to_string());
        }
        if let Some(time) = &self.preferred_study_time {
            parts.push(format!("studies in the {}", time));
        }
        if parts.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationSettings {
    pub course_reminders: NotificationChannel,
    pub event_updates: NotificationChannel,
    pub library_notifications: NotificationChannel,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            course_reminders: NotificationChannel::InApp,
            event_updates: NotificationChannel::Email,
            library_notifications: NotificationChannel::Email,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    pub interests: Vec<String>,
    pub career_goals: Vec<String>,
    pub hobbies: Vec<String>,
    pub learning_style: LearningStyle,
    pub time: TimePreferences,
    pub notifications: NotificationSettings,
}

/// One logged exchange between the student and the concierge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub intent: String,
    /// 1-5 when the student rated the answer
    pub satisfaction: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub academic: Option<AcademicRecord>,
    pub preferences: Preferences,
    pub history: Vec<Interaction>,
    pub privacy: PrivacyLevel,
    pub data_consent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn new(id: &str, name: &str, email: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            academic: None,
            preferences: Preferences::default(),
            history: Vec::new(),
            privacy: PrivacyLevel::default(),
            data_consent: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentInteraction {
    pub query: String,
    pub intent: String,
    pub timestamp: DateTime<Utc>,
}

/// The slice of a profile handlers may use for personalization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileContext {
    pub student_id: String,
    pub name: Option<String>,
    pub academic: Option<AcademicRecord>,
    pub interests: Vec<String>,
    pub career_goals: Vec<String>,
    pub hobbies: Vec<String>,
    pub time: Option<TimePreferences>,
    pub recent: Vec<RecentInteraction>,
}

impl ProfileContext {
    fn from_profile(profile: &StudentProfile) -> Self {
        let mut history: Vec<&Interaction> = profile.history.iter().collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            student_id: profile.id.clone(),
            name: Some(profile.name.clone()),
            academic: profile.academic.clone(),
            interests: profile.preferences.interests.clone(),
            career_goals: profile.preferences.career_goals.clone(),
            hobbies: profile.preferences.hobbies.clone(),
            time: Some(profile.preferences.time.clone()),
            recent: history
                .into_iter()
                .take(RECENT_INTERACTIONS)
                .map(|i| RecentInteraction {
                    query: i.query.clone(),
                    intent: i.intent.clone(),
                    timestamp: i.timestamp,
                })
                .collect(),
        }
    }

    /// Drop whatever the privacy level does not allow to be shared.
    ///
    /// Private keeps only the id and interests, university-only hides
    /// conversation history, public keeps everything.
    pub fn filtered(self, level: PrivacyLevel) -> Self {
        match level {
            PrivacyLevel::Public => self,
            PrivacyLevel::UniversityOnly => Self {
                recent: Vec::new(),
                ..self
            },
            PrivacyLevel::Private => Self {
                student_id: self.student_id,
                name: None,
                academic: None,
                interests: self.interests,
                career_goals: Vec::new(),
                hobbies: Vec::new(),
                time: None,
                recent: Vec::new(),
            },
        }
    }
}

/// In-memory profile store shared between handlers
pub struct ProfileStore {
    profiles: Arc<RwLock<HashMap<String, StudentProfile>>>,
}

impl ProfileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a store holding the two demo students
    pub fn with_sample_students() -> Self {
        let profiles = sample_students()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self {
            profiles: Arc::new(RwLock::new(profiles)),
        }
    }

    pub async fn get(&self, student_id: &str) -> Option<StudentProfile> {
        self.profiles.read().await.get(student_id).cloned()
    }

    /// Add a new profile. Returns false if the id is taken.
    pub async fn create(&self, mut profile: StudentProfile) -> bool {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return false;
        }
        let now = Utc::now();
        profile.created_at = now;
        profile.updated_at = now;
        info!("Created profile for {}", profile.id);
        profiles.insert(profile.id.clone(), profile);
        true
    }

    pub async fn set_privacy(&self, student_id: &str, level: PrivacyLevel, consent: bool) -> bool {
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(student_id) else {
            return false;
        };
        profile.privacy = level;
        profile.data_consent = consent;
        profile.updated_at = Utc::now();
        true
    }

    pub async fn has_consent(&self, student_id: &str) -> bool {
        self.profiles
            .read()
            .await
            .get(student_id)
            .is_some_and(|p| p.data_consent)
    }

    /// Append interests and career goals. Returns whether anything changed.
    pub async fn update_preferences(
        &self,
        student_id: &str,
        new_interests: &[String],
        new_career_goals: &[String],
    ) -> Result<bool> {
        let mut profiles = self.profiles.write().await;
        let Some(profile) = profiles.get_mut(student_id) else {
            bail!("No profile found for '{}'", student_id);
        };
        if new_interests.is_empty() && new_career_goals.is_empty() {
            return Ok(false);
        }
        profile.preferences.interests.extend_from_slice(new_interests);
        profile.preferences.career_goals.extend_from_slice(new_career_goals);
        profile.updated_at = Utc::now();
        debug!(
            "Updated preferences for {} (+{} interests, +{} goals)",
            student_id,
            new_interests.len(),
            new_career_goals.len()
        );
        Ok(true)
    }

    /// Record an exchange in the student's history. Skipped without consent.
    pub async fn log_interaction(
        &self,
        student_id: &str,
        query: &str,
        response: &str,
        intent: &str,
    ) -> Option<String> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(student_id)?;
        if !profile.data_consent {
            debug!("No data consent for {}, interaction not logged", student_id);
            return None;
        }
        let id = format!("conv-{}", Uuid::new_v4());
        let now = Utc::now();
        profile.history.push(Interaction {
            id: id.clone(),
            timestamp: now,
            query: query.to_string(),
            response: response.to_string(),
            intent: intent.to_string(),
            satisfaction: None,
        });
        profile.updated_at = now;
        Some(id)
    }

    /// Full context, ignoring consent and privacy
    pub async fn context(&self, student_id: &str) -> Option<ProfileContext> {
        self.profiles
            .read()
            .await
            .get(student_id)
            .map(ProfileContext::from_profile)
    }

    /// Context for personalization: requires consent, filtered by privacy level
    pub async fn personalized_context(&self, student_id: &str) -> Option<ProfileContext> {
        let profiles = self.profiles.read().await;
        let profile = profiles.get(student_id)?;
        if !profile.data_consent {
            return None;
        }
        Some(ProfileContext::from_profile(profile).filtered(profile.privacy))
    }

    /// Course ids suggested from interests and major, sorted
    pub async fn recommend_courses(&self, student_id: &str) -> Vec<String> {
        let Some(context) = self.personalized_context(student_id).await else {
            return Vec::new();
        };
        let has = |interest: &str| context.interests.iter().any(|i| i == interest);

        let mut ids = BTreeSet::new();
        if has("artificial intelligence") || has("machine learning") {
            ids.extend(["CS301", "CS401"]);
        }
        if has("data science") {
            ids.extend(["STAT301", "CS350"]);
        }
        if context
            .academic
            .as_ref()
            .is_some_and(|a| a.major == "Computer Science")
        {
            ids.extend(["CS201", "CS301", "CS350"]);
        }
        ids.into_iter().map(String::from).collect()
    }

    /// Event ids suggested from interests and hobbies
    pub async fn recommend_events(&self, student_id: &str) -> Vec<String> {
        let Some(context) = self.personalized_context(student_id).await else {
            return Vec::new();
        };
        let any_interest = |options: &[&str]| {
            context
                .interests
                .iter()
                .any(|i| options.contains(&i.as_str()))
        };

        let mut ids = Vec::new();
        if any_interest(&["ai", "artificial intelligence", "machine learning"]) {
            ids.extend(["EVT002", "EVT007"]);
        }
        if context.hobbies.iter().any(|h| h == "chess") {
            ids.push("EVT006");
        }
        if any_interest(&["programming", "coding"]) {
            ids.push("EVT004");
        }
        ids.into_iter().map(String::from).collect()
    }

    pub async fn count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_students() -> Vec<StudentProfile> {
    let mut alex = StudentProfile::new("student123", "Alex Johnson", "alex.johnson@university.edu");
    alex.phone = Some("+1-555-0123".to_string());
    alex.academic = Some(AcademicRecord {
        major: "Computer Science".to_string(),
        minor: Some("Mathematics".to_string()),
        year: 3,
        gpa: Some(3.7),
        completed_courses: strings(&["CS101", "CS201", "MATH201", "ENG101"]),
        current_courses: strings(&["CS301", "CS350", "MATH301"]),
        standing: AcademicStanding::Honors,
        expected_graduation: None,
    });
    alex.preferences = Preferences {
        interests: strings(&["artificial intelligence", "machine learning", "data science"]),
        career_goals: strings(&["software engineer", "research scientist"]),
        hobbies: strings(&["chess", "programming", "reading"]),
        learning_style: LearningStyle::Visual,
        time: TimePreferences {
            avoid_mornings: true,
            preferred_study_time: Some("evening".to_string()),
        },
        notifications: NotificationSettings {
            course_reminders: NotificationChannel::Email,
            event_updates: NotificationChannel::InApp,
            library_notifications: NotificationChannel::Email,
        },
    };
    alex.data_consent = true;

    let mut sarah = StudentProfile::new("student456", "Sarah Chen", "sarah.chen@university.edu");
    sarah.academic = Some(AcademicRecord {
        major: "Biology".to_string(),
        minor: Some("Chemistry".to_string()),
        year: 2,
        gpa: Some(3.9),
        completed_courses: strings(&["BIO101", "CHEM101", "MATH101"]),
        current_courses: strings(&["BIO201", "CHEM201", "STAT101"]),
        standing: AcademicStanding::Good,
        expected_graduation: None,
    });
    sarah.preferences.interests = strings(&["medicine", "research", "biotechnology"]);
    sarah.preferences.career_goals = strings(&["physician", "medical researcher"]);
    sarah.preferences.hobbies = strings(&["volleyball", "cooking", "volunteering"]);
    sarah.data_consent = true;

    vec![alex, sarah]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Shows the active student's profile along with recommendations
pub struct ProfileAgent {
    store: Arc<ProfileStore>,
    calendar: Arc<EventCalendar>,
    student_id: String,
}

impl ProfileAgent {
    pub fn new(store: Arc<ProfileStore>, calendar: Arc<EventCalendar>, student_id: &str) -> Self {
        Self {
            store,
            calendar,
            student_id: student_id.to_string(),
        }
    }

    async fn render(&self) -> String {
        let Some(context) = self.store.personalized_context(&self.student_id).await else {
            return "No user profile information available. Please ensure privacy consent is given."
                .to_string();
        };

        let mut out = format!(
            "**Profile for {}**\n\n",
            context.name.as_deref().unwrap_or("User")
        );

        if let Some(academic) = &context.academic {
            out.push_str("**Academic Information:**\n");
            out.push_str(&format!("- Major: {}\n", academic.major));
            if let Some(minor) = &academic.minor {
                out.push_str(&format!("- Minor: {}\n", minor));
            }
            out.push_str(&format!("- Year: {}\n", academic.year));
            if let Some(gpa) = academic.gpa {
                out.push_str(&format!("- GPA: {:.1}\n", gpa));
            }
            out.push_str(&format!(
                "- Completed Courses: {}\n",
                academic.completed_courses.join(", ")
            ));
            out.push_str(&format!(
                "- Current Courses: {}\n\n",
                academic.current_courses.join(", ")
            ));
        }

        if !context.interests.is_empty() || !context.career_goals.is_empty() {
            out.push_str("**Interests & Goals:**\n");
            if !context.interests.is_empty() {
                out.push_str(&format!("- Interests: {}\n", context.interests.join(", ")));
            }
            if !context.career_goals.is_empty() {
                out.push_str(&format!("- Career Goals: {}\n", context.career_goals.join(", ")));
            }
            if let Some(time) = &context.time {
                out.push_str(&format!("- Time Preferences: {}\n", time));
            }
            out.push('\n');
        }

        let courses = self.store.recommend_courses(&self.student_id).await;
        if !courses.is_empty() {
            out.push_str("**Recommended Courses:**\n");
            for id in courses.iter().take(3) {
                out.push_str(&format!("- {}\n", id));
            }
            out.push('\n');
        }

        let events = self.store.recommend_events(&self.student_id).await;
        let event_lines: Vec<String> = events
            .iter()
            .filter_map(|id| self.calendar.get(id))
            .take(3)
            .map(|e| format!("- {} ({})\n", e.title, e.date))
            .collect();
        if !event_lines.is_empty() {
            out.push_str("**Recommended Events:**\n");
            out.extend(event_lines);
            out.push('\n');
        }

        if !context.interests.is_empty() {
            out.push_str(&format!(
                "**Based on your interests in {}:**\n",
                context.interests.join(", ")
            ));
            out.push_str("- Check out the latest research seminars in your field\n");
            out.push_str("- Consider joining relevant student organizations\n");
            out.push_str("- Look for internship opportunities aligned with your goals\n");
        }

        out.trim_end().to_string()
    }
}

#[async_trait]
impl AgentHandler for ProfileAgent {
    fn description(&self) -> &str {
        "Shows the student's profile, preferences and personalized recommendations"
    }

    async fn handle(&self, _query: &str) -> Result<String> {
        Ok(self.render().await)
    }
}
