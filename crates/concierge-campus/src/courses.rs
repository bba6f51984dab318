//! Course catalog and advisor
//!
//! Search with explicit [`CourseQuery`] filters, prerequisite checks,
//! scheduling constraints, interest scoring and career-path suggestions.
//! The [`CourseAdvisor`] handler turns a free-text query into one of these
//! and, when a consenting student profile is attached, personalizes the
//! result.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use concierge_core::AgentHandler;

use crate::profile::{ProfileContext, ProfileStore};
use crate::{mentions, mentions_any};

/// Recommendations returned by [`CourseCatalog::recommend`]
const MAX_RECOMMENDATIONS: usize = 10;
/// Courses listed in a handler reply
const MAX_LISTED: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    Fall,
    Spring,
    Summer,
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fall => write!(f, "fall"),
            Self::Spring => write!(f, "spring"),
            Self::Summer => write!(f, "summer"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Undergraduate,
    Graduate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub credits: u8,
    pub prerequisites: Vec<String>,
    pub department: String,
    pub level: Level,
    pub semesters: Vec<Semester>,
    /// e.g. "MWF 9:00-9:50"
    pub time_slots: Vec<String>,
    pub professor: String,
    pub capacity: u32,
    pub enrolled: u32,
    pub keywords: Vec<String>,
}

impl Course {
    pub fn open_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled)
    }

    pub fn has_morning_slot(&self) -> bool {
        self.time_slots.iter().any(|slot| starts_in_morning(slot))
    }
}

/// A slot like "TTH 9:30-10:45" is a morning slot when it starts at 8, 9 or 10
fn starts_in_morning(slot: &str) -> bool {
    slot.split_whitespace()
        .nth(1)
        .and_then(|range| range.split(':').next())
        .and_then(|hour| hour.parse::<u8>().ok())
        .is_some_and(|hour| (8..=10).contains(&hour))
}

/// Filters for [`CourseCatalog::search`]; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct CourseQuery {
    pub department: Option<String>,
    pub level: Option<Level>,
    pub semester: Option<Semester>,
    /// Matches when any keyword occurs inside any course keyword
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CourseConstraints {
    pub avoid_mornings: bool,
    /// Substrings one of the course's time slots must contain
    pub required_times: Vec<String>,
    pub min_credits: u8,
    pub max_credits: u8,
    pub require_open_seats: bool,
}

impl Default for CourseConstraints {
    fn default() -> Self {
        Self {
            avoid_mornings: false,
            required_times: Vec::new(),
            min_credits: 0,
            max_credits: 6,
            require_open_seats: true,
        }
    }
}

impl CourseConstraints {
    pub fn permits(&self, course: &Course) -> bool {
        if self.avoid_mornings && course.has_morning_slot() {
            return false;
        }
        if !self.required_times.is_empty()
            && !course
                .time_slots
                .iter()
                .any(|slot| self.required_times.iter().any(|t| slot.contains(t.as_str())))
        {
            return false;
        }
        if course.credits < self.min_credits || course.credits > self.max_credits {
            return false;
        }
        !self.require_open_seats || course.open_seats() > 0
    }
}

const INTEREST_KEYWORDS: &[(&str, &[&str])] = &[
    ("data science", &["data", "statistics", "machine learning", "analytics"]),
    ("cybersecurity", &["security", "cryptography", "network", "privacy"]),
    ("robotics", &["robotics", "automation", "control systems", "sensors"]),
    ("web development", &["web", "frontend", "backend", "javascript", "html"]),
    ("artificial intelligence", &["ai", "machine learning", "neural networks", "nlp"]),
    ("software engineering", &["software", "engineering", "design patterns", "testing"]),
];

/// How well a course matches a list of interests, in [0, 1].
///
/// 0.5 when there are no interests to match against.
pub fn interest_score(course: &Course, interests: &[String]) -> f64 {
    if interests.is_empty() {
        return 0.5;
    }

    let course_keywords: Vec<String> = course.keywords.iter().map(|k| k.to_lowercase()).collect();
    let total: f64 = interests
        .iter()
        .map(|interest| {
            let interest = interest.to_lowercase();
            if course_keywords.contains(&interest) {
                return 1.0;
            }
            let related: Vec<&str> = INTEREST_KEYWORDS
                .iter()
                .find(|(name, _)| *name == interest)
                .map(|(_, keywords)| keywords.to_vec())
                .unwrap_or_else(|| vec![interest.as_str()]);
            let hits = related
                .iter()
                .filter(|kw| course_keywords.iter().any(|ck| ck.contains(*kw)))
                .count();
            (hits as f64 / related.len() as f64).min(1.0)
        })
        .sum();

    (total / interests.len() as f64).min(1.0)
}

const CAREER_PATHS: &[(&str, &[&str])] = &[
    ("software engineer", &["CS201", "CS301", "CS350"]),
    ("data scientist", &["CS301", "MATH201", "STAT301"]),
    ("cybersecurity analyst", &["CS201", "CS400", "CS450"]),
    ("research scientist", &["CS301", "CS401", "MATH301"]),
];

/// Courses on the path to a career goal that are not yet completed.
///
/// A path whose name contains the goal wins; otherwise the first path
/// sharing a word with it.
pub fn career_path_courses(goal: &str, completed: &[String]) -> Vec<String> {
    let goal = goal.to_lowercase();
    let path = CAREER_PATHS
        .iter()
        .find(|(name, _)| name.contains(goal.as_str()))
        .or_else(|| {
            CAREER_PATHS.iter().find(|(name, _)| {
                goal.split_whitespace()
                    .any(|word| name.split_whitespace().any(|w| w == word))
            })
        });

    match path {
        Some((_, courses)) => courses
            .iter()
            .filter(|id| !completed.iter().any(|c| c == *id))
            .map(|id| id.to_string())
            .collect(),
        None => Vec::new(),
    }
}

/// A scored, explained course suggestion
#[derive(Debug, Clone)]
pub struct Recommendation<'a> {
    pub course: &'a Course,
    pub interest_score: f64,
    pub reason: String,
}

pub struct CourseCatalog {
    courses: Vec<Course>,
}

impl CourseCatalog {
    pub fn new(courses: Vec<Course>) -> Self {
        Self { courses }
    }

    /// Catalog seeded with the demo course list
    pub fn sample() -> Self {
        Self::new(sample_courses())
    }

    pub fn get(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn search(&self, query: &CourseQuery) -> Vec<&Course> {
        let keywords: Vec<String> = query.keywords.iter().map(|k| k.to_lowercase()).collect();
        self.courses
            .iter()
            .filter(|c| {
                query
                    .department
                    .as_ref()
                    .is_none_or(|d| c.department.eq_ignore_ascii_case(d))
            })
            .filter(|c| query.level.is_none_or(|l| c.level == l))
            .filter(|c| query.semester.is_none_or(|s| c.semesters.contains(&s)))
            .filter(|c| {
                keywords.is_empty()
                    || keywords.iter().any(|k| {
                        c.keywords
                            .iter()
                            .any(|ck| ck.to_lowercase().contains(k.as_str()))
                    })
            })
            .collect()
    }

    /// Whether every prerequisite is completed. Unknown courses never qualify.
    pub fn has_prerequisites(&self, course_id: &str, completed: &[String]) -> bool {
        self.get(course_id).is_some_and(|course| {
            course
                .prerequisites
                .iter()
                .all(|p| completed.iter().any(|c| c == p))
        })
    }

    pub fn missing_prerequisites(&self, course_id: &str, completed: &[String]) -> Vec<String> {
        self.get(course_id)
            .map(|course| {
                course
                    .prerequisites
                    .iter()
                    .filter(|p| !completed.iter().any(|c| c == *p))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Personalized suggestions for a semester.
    ///
    /// Offered courses the student has not completed, whose prerequisites
    /// are met and which pass `constraints`, ranked by interest score. A
    /// context without an academic record counts nothing as completed.
    pub fn recommend(
        &self,
        student: &ProfileContext,
        semester: Semester,
        constraints: &CourseConstraints,
    ) -> Vec<Recommendation<'_>> {
        let completed: &[String] = student
            .academic
            .as_ref()
            .map(|a| a.completed_courses.as_slice())
            .unwrap_or_default();

        let mut recommendations: Vec<Recommendation<'_>> = self
            .search(&CourseQuery {
                semester: Some(semester),
                ..Default::default()
            })
            .into_iter()
            .filter(|c| !completed.contains(&c.id))
            .filter(|c| self.has_prerequisites(&c.id, completed))
            .filter(|c| constraints.permits(c))
            .map(|course| {
                let score = interest_score(course, &student.interests);
                Recommendation {
                    course,
                    interest_score: score,
                    reason: recommendation_reason(course, student, score),
                }
            })
            .collect();

        recommendations.sort_by(|a, b| b.interest_score.total_cmp(&a.interest_score));
        recommendations.truncate(MAX_RECOMMENDATIONS);
        recommendations
    }
}

impl Default for CourseCatalog {
    fn default() -> Self {
        Self::sample()
    }
}

fn recommendation_reason(course: &Course, student: &ProfileContext, score: f64) -> String {
    let mut reasons = Vec::new();
    let interests = &student.interests;

    if !interests.is_empty() {
        if score > 0.7 {
            reasons.push(format!(
                "Strongly matches your interests in {}",
                interests.join(", ")
            ));
        } else if score > 0.4 {
            reasons.push(format!("Aligns with your interests in {}", interests.join(", ")));
        }
    }

    if let Some(academic) = &student.academic {
        if course.department == academic.major {
            reasons.push("Counts toward your major".to_string());
        }
        if course.level == Level::Undergraduate && academic.year >= 3 {
            reasons.push("Advanced course suitable for your academic level".to_string());
        }
    }

    let seats = course.open_seats();
    if seats <= 5 {
        reasons.push(format!("Limited availability ({} spots remaining)", seats));
    }

    if reasons.is_empty() {
        "General elective option".to_string()
    } else {
        reasons.join("; ")
    }
}

/// What the advisor understood from a free-text query
#[derive(Debug, Clone)]
pub struct ParsedCourseRequest {
    pub semester: Semester,
    pub constraints: CourseConstraints,
    pub query: CourseQuery,
}

pub fn parse_request(text: &str) -> ParsedCourseRequest {
    let lower = text.to_lowercase();

    let semester = if mentions(&lower, "fall") {
        Semester::Fall
    } else if mentions(&lower, "summer") {
        Semester::Summer
    } else {
        Semester::Spring
    };

    let constraints = CourseConstraints {
        avoid_mornings: lower.contains("morning") && mentions_any(&lower, &["no", "not", "avoid"]),
        ..Default::default()
    };

    let mut query = CourseQuery {
        semester: Some(semester),
        ..Default::default()
    };
    if mentions(&lower, "ai") || lower.contains("artificial intelligence") {
        query.keywords = vec!["ai".to_string(), "machine learning".to_string()];
    } else if lower.contains("computer science") || mentions(&lower, "cs") {
        query.department = Some("Computer Science".to_string());
    } else if lower.contains("programming") {
        query.keywords = vec!["programming".to_string()];
    }

    ParsedCourseRequest {
        semester,
        constraints,
        query,
    }
}

/// Answers course questions, personalized when a profile store is attached
pub struct CourseAdvisor {
    catalog: CourseCatalog,
    profiles: Option<(Arc<ProfileStore>, String)>,
}

impl CourseAdvisor {
    pub fn new() -> Self {
        Self {
            catalog: CourseCatalog::sample(),
            profiles: None,
        }
    }

    pub fn with_catalog(mut self, catalog: CourseCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Personalize answers for `student_id`, if they consented to data use
    pub fn with_profiles(mut self, store: Arc<ProfileStore>, student_id: &str) -> Self {
        self.profiles = Some((store, student_id.to_string()));
        self
    }

    pub fn catalog(&self) -> &CourseCatalog {
        &self.catalog
    }

    /// Consented, privacy-filtered view of the attached student
    async fn active_student(&self) -> Option<ProfileContext> {
        let (store, id) = self.profiles.as_ref()?;
        store.personalized_context(id).await
    }

    fn render_personalized(
        &self,
        student: &ProfileContext,
        request: &ParsedCourseRequest,
    ) -> String {
        let recommendations =
            self.catalog
                .recommend(student, request.semester, &request.constraints);
        if recommendations.is_empty() {
            return "No courses found matching your criteria and prerequisites.".to_string();
        }

        let mut out = format!(
            "Here are personalized course recommendations for {} semester:\n\n",
            request.semester
        );
        for rec in recommendations.iter().take(MAX_LISTED) {
            let course = rec.course;
            out.push_str(&format!("**{}** ({})\n", course.title, course.id));
            out.push_str(&format!("- Credits: {}\n", course.credits));
            out.push_str(&format!("- Time: {}\n", course.time_slots.join(", ")));
            out.push_str(&format!("- Professor: {}\n", course.professor));
            out.push_str(&format!("- Available: {} spots\n", course.open_seats()));
            out.push_str(&format!("- Why recommended: {}\n\n", rec.reason));
        }
        out.trim_end().to_string()
    }

    fn render_search(&self, request: &ParsedCourseRequest) -> String {
        let courses: Vec<&Course> = self
            .catalog
            .search(&request.query)
            .into_iter()
            .filter(|c| !request.constraints.avoid_mornings || !c.has_morning_slot())
            .collect();
        if courses.is_empty() {
            return "No courses found matching your search criteria.".to_string();
        }

        let mut out = format!(
            "Found {} course(s) for {} semester:\n\n",
            courses.len(),
            request.semester
        );
        for course in courses.iter().take(MAX_LISTED) {
            out.push_str(&format!("**{}** ({})\n", course.title, course.id));
            out.push_str(&format!("- Credits: {}\n", course.credits));
            out.push_str(&format!("- Time: {}\n", course.time_slots.join(", ")));
            out.push_str(&format!("- Professor: {}\n", course.professor));
            out.push_str(&format!("- Description: {}\n\n", course.description));
        }
        out.trim_end().to_string()
    }
}

impl Default for CourseAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for CourseAdvisor {
    fn description(&self) -> &str {
        "Finds courses, checks prerequisites and recommends a schedule"
    }

    async fn handle(&self, query: &str) -> Result<String> {
        let request = parse_request(query);
        match self.active_student().await {
            Some(student) => {
                debug!("Personalizing course answer for {}", student.student_id);
                Ok(self.render_personalized(&student, &request))
            }
            None => Ok(self.render_search(&request)),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn course(
    id: &str,
    title: &str,
    description: &str,
    credits: u8,
    prerequisites: &[&str],
    department: &str,
    semesters: &[Semester],
    time_slots: &[&str],
    professor: &str,
    capacity: u32,
    enrolled: u32,
    keywords: &[&str],
) -> Course {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    Course {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        credits,
        prerequisites: owned(prerequisites),
        department: department.to_string(),
        level: Level::Undergraduate,
        semesters: semesters.to_vec(),
        time_slots: owned(time_slots),
        professor: professor.to_string(),
        capacity,
        enrolled,
        keywords: owned(keywords),
    }
}

fn sample_courses() -> Vec<Course> {
    use Semester::{Fall, Spring};
    vec![
        course(
            "CS101",
            "Introduction to Computer Science",
            "Fundamentals of programming and computer science",
            3,
            &[],
            "Computer Science",
            &[Fall, Spring],
            &["MWF 9:00-9:50", "TTH 14:00-15:15"],
            "Dr. Smith",
            50,
            45,
            &["programming", "fundamentals", "python"],
        ),
        course(
            "CS201",
            "Data Structures and Algorithms",
            "Study of fundamental data structures and algorithms",
            4,
            &["CS101"],
            "Computer Science",
            &[Fall, Spring],
            &["MWF 11:00-11:50", "TTH 9:30-10:45"],
            "Dr. Johnson",
            40,
            38,
            &["algorithms", "data structures", "programming"],
        ),
        course(
            "CS301",
            "Artificial Intelligence",
            "Introduction to AI concepts and techniques",
            3,
            &["CS201"],
            "Computer Science",
            &[Spring],
            &["TTH 15:30-16:45"],
            "Dr. Williams",
            30,
            25,
            &["ai", "machine learning", "neural networks"],
        ),
        course(
            "CS401",
            "Advanced Machine Learning",
            "Advanced topics in machine learning and deep learning",
            3,
            &["CS301"],
            "Computer Science",
            &[Fall],
            &["MW 16:00-17:15"],
            "Dr. Chen",
            25,
            20,
            &["machine learning", "deep learning", "ai", "neural networks"],
        ),
        course(
            "MATH201",
            "Calculus II",
            "Integral calculus and series",
            4,
            &["MATH101"],
            "Mathematics",
            &[Fall, Spring],
            &["MWF 8:00-8:50", "TTH 13:00-14:15"],
            "Dr. Davis",
            60,
            55,
            &["calculus", "mathematics", "integration"],
        ),
    ]
}
