//! Document analysis for syllabi, assignments and other course material
//!
//! Text extraction is mocked: a query that mentions an image or scan is
//! analysed against a sample syllabus, one that mentions a PDF or an
//! assignment against a sample assignment. Anything else is treated as the
//! document text itself.

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use concierge_core::AgentHandler;

use crate::{mentions, mentions_any};

const DETECTED_CONFIDENCE: f32 = 0.8;
const UNKNOWN_CONFIDENCE: f32 = 0.2;

const IMAGE_TERMS: &[&str] = &[
    "image", "photo", "picture", "scan", "scanned", "screenshot", "jpg", "png",
];
const PDF_TERMS: &[&str] = &["pdf", "assignment", "homework"];

const SAMPLE_SYLLABUS: &str = r#"CS301 - Artificial Intelligence
Fall 2025 Syllabus

Instructor: Dr. Sarah Williams
Email: swilliams@university.edu
Office Hours: MW 2-4 PM

Course Description:
Introduction to artificial intelligence concepts including search algorithms,
knowledge representation, machine learning, and neural networks.

Prerequisites: CS201 Data Structures and Algorithms, MATH201 Calculus II

Textbook: "Artificial Intelligence: A Modern Approach" by Russell & Norvig

Grading Policy:
Assignments: 40%
Midterm Exam: 25%
Final Exam: 25%
Participation: 10%

Important Dates:
- Midterm: October 15, 2025
- Final Project Due: November 20, 2025
- Final Exam: December 10, 2025
"#;

const SAMPLE_ASSIGNMENT: &str = r#"CS301 Assignment 2: Machine Learning Implementation
Due: October 1, 2025

Task: Implement a neural network from scratch using Python
Requirements:
- Use only NumPy (no ML libraries)
- Train on provided dataset
- Achieve 85%+ accuracy
- Submit code + report

Grading Criteria:
- Implementation: 60%
- Performance: 25%
- Report: 15%

Resources:
- Chapter 4 of Russell & Norvig textbook
- Lecture slides on neural networks
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Syllabus,
    Assignment,
    Schedule,
    LectureNotes,
    Transcript,
    Unknown,
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syllabus => write!(f, "Syllabus"),
            Self::Assignment => write!(f, "Assignment"),
            Self::Schedule => write!(f, "Schedule"),
            Self::LectureNotes => write!(f, "Lecture Notes"),
            Self::Transcript => write!(f, "Transcript"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Checked in order; the first type with a hit wins
const TYPE_HINTS: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::Syllabus,
        &["syllabus", "course outline", "grading policy"],
    ),
    (
        DocumentType::Assignment,
        &["assignment", "homework", "due date", "submit"],
    ),
    (
        DocumentType::Schedule,
        &["schedule", "calendar", "weekly", "dates"],
    ),
    (
        DocumentType::LectureNotes,
        &["lecture", "notes", "chapter", "topic"],
    ),
    (
        DocumentType::Transcript,
        &["transcript", "gpa", "credits earned", "degree"],
    ),
];

pub fn detect_type(text: &str) -> DocumentType {
    let lower = text.to_lowercase();
    TYPE_HINTS
        .iter()
        .find(|(_, hints)| hints.iter().any(|h| lower.contains(h)))
        .map(|(kind, _)| *kind)
        .unwrap_or(DocumentType::Unknown)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeComponent {
    pub label: String,
    pub weight: u32,
}

/// Structured fields pulled out of a syllabus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyllabusInfo {
    pub course_code: Option<String>,
    pub title: Option<String>,
    pub instructor: Option<String>,
    pub email: Option<String>,
    pub office_hours: Option<String>,
    pub prerequisites: Option<String>,
    pub textbooks: Option<String>,
    pub grading: Vec<GradeComponent>,
}

impl SyllabusInfo {
    /// Total weight of grade components whose label mentions any of `terms`
    pub fn weight_of(&self, terms: &[&str]) -> u32 {
        self.grading
            .iter()
            .filter(|c| {
                let label = c.label.to_lowercase();
                terms.iter().any(|t| label.contains(t))
            })
            .map(|c| c.weight)
            .sum()
    }

    fn exam_weight(&self) -> u32 {
        self.weight_of(&["exam"])
    }

    fn coursework_weight(&self) -> u32 {
        self.weight_of(&["assignment", "homework", "project"])
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern).ok()
}

static COURSE_CODE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\b([A-Z]{2,4}\s*\d{3}[A-Z]?)\b"));
static TITLE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?im)course title:?\s*(.+?)\s*$",
        r"(?im)^\s*title:?\s*(.+?)\s*$",
        // "CS301 - Artificial Intelligence"
        r"(?m)^\s*[A-Z]{2,4}\s*\d{3}[A-Z]?\s*[-:]\s*(.+?)\s*$",
    ]
    .iter()
    .filter_map(|p| compile(p))
    .collect()
});
static INSTRUCTOR: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?im)\b(?:instructor|professor|taught by):?\s*(.+?)\s*$"));
static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})"));
static OFFICE_HOURS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?im)office hours:?\s*(.+?)\s*$"));
static PREREQUISITES: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?im)\b(?:prerequisites?|prereqs?):?\s*(.+?)\s*$"));
static TEXTBOOKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?im)\b(?:textbooks?|required texts?):?\s*(.+?)\s*$"));
static GRADE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"(?m)^\s*-?\s*([A-Za-z][A-Za-z ]*?)\s*:\s*(\d{1,3})%"));

fn first_capture(re: &Option<Regex>, text: &str) -> Option<String> {
    let re = re.as_ref()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn analyze_syllabus(text: &str) -> SyllabusInfo {
    let grading = match GRADE_LINE.as_ref() {
        Some(re) => re
            .captures_iter(text)
            .filter_map(|c| {
                let label = c.get(1)?.as_str().trim().to_string();
                let weight = c.get(2)?.as_str().parse().ok()?;
                Some(GradeComponent { label, weight })
            })
            .collect(),
        None => Vec::new(),
    };

    SyllabusInfo {
        course_code: first_capture(&COURSE_CODE, text),
        title: TITLE.iter().find_map(|re| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        }),
        instructor: first_capture(&INSTRUCTOR, text),
        email: first_capture(&EMAIL, text),
        office_hours: first_capture(&OFFICE_HOURS, text),
        prerequisites: first_capture(&PREREQUISITES, text),
        textbooks: first_capture(&TEXTBOOKS, text),
        grading,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub document_type: DocumentType,
    pub confidence: f32,
    pub syllabus: Option<SyllabusInfo>,
    pub suggestions: Vec<String>,
    pub insights: Vec<String>,
    pub resources: Vec<String>,
}

fn syllabus_suggestions(info: &SyllabusInfo) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(code) = &info.course_code {
        out.push(format!(
            "I found this is for {}. I can help you find related textbooks in the library.",
            code
        ));
    }
    if info.prerequisites.is_some() {
        out.push("Check that you've completed all prerequisites before enrolling.".to_string());
        out.push("I can verify your completed courses against the requirements.".to_string());
    }
    if info.textbooks.is_some() {
        out.push(
            "I can help you find these required textbooks in the library or check their availability."
                .to_string(),
        );
    }
    if info.exam_weight() > 50 {
        out.push(
            "This course is exam-heavy. Consider forming study groups and scheduling regular review sessions."
                .to_string(),
        );
    } else if info.coursework_weight() > 50 {
        out.push(
            "This course emphasizes assignments and projects. Plan your time management carefully."
                .to_string(),
        );
    }
    out.push(
        "I can help you find study groups, tutoring services, and related campus events for this subject."
            .to_string(),
    );
    out.push(
        "Would you like me to help you create a study schedule based on the important dates?"
            .to_string(),
    );
    out
}

fn fixed_suggestions(kind: DocumentType) -> &'static [&'static str] {
    match kind {
        DocumentType::Assignment => &[
            "I can help you find relevant library resources for this assignment.",
            "Would you like me to set reminders for the due date?",
            "I can help you find study groups or tutoring for this subject.",
            "I can suggest related courses that might help with this topic.",
        ],
        DocumentType::Schedule => &[
            "I can help you check for time conflicts with other courses.",
            "I can find events and activities that align with your schedule.",
            "I can suggest optimal study times based on your class schedule.",
            "Would you like suggestions for activities during your free periods?",
        ],
        DocumentType::Transcript => &[
            "I can suggest courses to improve your GPA in specific areas.",
            "I can analyze your academic progress toward degree requirements.",
            "I can recommend courses based on your strongest subject areas.",
            "I can suggest career paths that align with your completed coursework.",
        ],
        _ => &[],
    }
}

fn syllabus_insights(info: &SyllabusInfo) -> Vec<String> {
    let mut out = Vec::new();
    if info.exam_weight() > 60 {
        out.push(
            "This appears to be a theory-heavy course with significant exam components.".to_string(),
        );
    }
    if info.weight_of(&["project", "assignment"]) > 50 {
        out.push("This is a hands-on course with substantial project work.".to_string());
    }
    if info.prerequisites.is_some() {
        out.push(
            "This course has prerequisites, so make sure you have the foundational knowledge."
                .to_string(),
        );
    }
    out
}

fn syllabus_resources(info: &SyllabusInfo) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(books) = &info.textbooks {
        out.push(format!("Library search for: {}", books));
    }
    if let Some(code) = &info.course_code {
        out.push(format!("Related study materials for {}", code));
        out.push(format!("Study groups for {}", code));
        out.push(format!("Tutoring services for {}", code));
    }
    out
}

/// Reads syllabi and assignments and suggests next steps
#[derive(Debug, Default)]
pub struct DocumentAnalyzer;

impl DocumentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Text the analysis runs on for this query
    pub fn extract_text<'a>(&self, query: &'a str) -> &'a str {
        let lower = query.to_lowercase();
        if mentions_any(&lower, IMAGE_TERMS) {
            SAMPLE_SYLLABUS
        } else if mentions_any(&lower, PDF_TERMS) {
            if mentions(&lower, "syllabus") {
                SAMPLE_SYLLABUS
            } else {
                SAMPLE_ASSIGNMENT
            }
        } else {
            query
        }
    }

    pub fn analyze(&self, text: &str) -> DocumentAnalysis {
        let document_type = detect_type(text);
        let syllabus = (document_type == DocumentType::Syllabus).then(|| analyze_syllabus(text));

        let (suggestions, insights, resources) = match &syllabus {
            Some(info) => (
                syllabus_suggestions(info),
                syllabus_insights(info),
                syllabus_resources(info),
            ),
            None => (
                fixed_suggestions(document_type)
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                Vec::new(),
                Vec::new(),
            ),
        };

        DocumentAnalysis {
            document_type,
            confidence: if document_type == DocumentType::Unknown {
                UNKNOWN_CONFIDENCE
            } else {
                DETECTED_CONFIDENCE
            },
            syllabus,
            suggestions,
            insights,
            resources,
        }
    }

    fn render(&self, analysis: &DocumentAnalysis) -> String {
        if analysis.document_type == DocumentType::Unknown {
            return "I couldn't tell what kind of document this is. Share a syllabus, assignment, \
                    schedule or transcript and I'll pull out the key details."
                .to_string();
        }

        let mut out = String::from("**Document Analysis Results**\n\n");
        out.push_str(&format!("**Document Type:** {}\n", analysis.document_type));
        out.push_str(&format!(
            "**Confidence:** {:.1}%\n\n",
            analysis.confidence * 100.0
        ));

        if let Some(info) = &analysis.syllabus {
            out.push_str("**Course Information:**\n");
            let fields = [
                ("Course", &info.course_code),
                ("Title", &info.title),
                ("Instructor", &info.instructor),
                ("Email", &info.email),
                ("Office Hours", &info.office_hours),
                ("Prerequisites", &info.prerequisites),
                ("Textbooks", &info.textbooks),
            ];
            for (label, value) in fields {
                if let Some(v) = value {
                    out.push_str(&format!("- {}: {}\n", label, v));
                }
            }
            if !info.grading.is_empty() {
                out.push_str("\n**Grading Breakdown:**\n");
                for c in &info.grading {
                    out.push_str(&format!("- {}: {}%\n", c.label, c.weight));
                }
            }
            out.push('\n');
        }

        for (heading, lines) in [
            ("Suggestions", &analysis.suggestions),
            ("Academic Insights", &analysis.insights),
            ("Related Resources", &analysis.resources),
        ] {
            if lines.is_empty() {
                continue;
            }
            out.push_str(&format!("**{}:**\n", heading));
            for line in lines {
                out.push_str(&format!("- {}\n", line));
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }
}

#[async_trait]
impl AgentHandler for DocumentAnalyzer {
    fn description(&self) -> &str {
        "Analyzes syllabi, assignments and other course documents"
    }

    async fn handle(&self, query: &str) -> Result<String> {
        let text = self.extract_text(query);
        let analysis = self.analyze(text);
        tracing::debug!(
            "Document analyzed as {} ({} suggestions)",
            analysis.document_type,
            analysis.suggestions.len()
        );
        Ok(self.render(&analysis))
    }
}
