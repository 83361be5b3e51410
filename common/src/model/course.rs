use crate::model::progress::ReviewStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Whether a course accepts applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CourseStatus {
    #[default]
    Open,
    Closed,
}

impl CourseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::Open => "Open",
            CourseStatus::Closed => "Closed",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            CourseStatus::Open => CourseStatus::Closed,
            CourseStatus::Closed => CourseStatus::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StudyMode {
    #[default]
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CourseLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// A row of the `courses` catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub duration: String,
    pub mode: StudyMode,
    pub level: CourseLevel,
    pub description: String,
    pub status: CourseStatus,
    pub opening_date: NaiveDate,
    pub closing_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    Reopened,
    Closed,
}

impl HistoryAction {
    /// The action recorded when a course moves to `status`.
    pub fn for_status(status: CourseStatus) -> Self {
        match status {
            CourseStatus::Open => HistoryAction::Reopened,
            CourseStatus::Closed => HistoryAction::Closed,
        }
    }

    pub fn note(self) -> &'static str {
        match self {
            HistoryAction::Reopened => "The application has been reopened",
            HistoryAction::Closed => "The application has been closed",
        }
    }
}

/// One entry of the `status_history` log of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistory {
    #[serde(default)]
    pub id: String,
    pub course_id: String,
    pub date: NaiveDate,
    pub action: HistoryAction,
    pub admin: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// What an applicant can do with a course on the intake page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeState {
    Apply,
    Closed,
    Enrolled,
    Rejected,
    InProgress,
}

impl IntakeState {
    /// A closed course is never open for action, whatever the application says.
    pub fn resolve(status: CourseStatus, review: Option<ReviewStatus>) -> Self {
        if status != CourseStatus::Open {
            return IntakeState::Closed;
        }
        match review {
            None => IntakeState::Apply,
            Some(ReviewStatus::Approved) => IntakeState::Enrolled,
            Some(ReviewStatus::Rejected) => IntakeState::Rejected,
            Some(_) => IntakeState::InProgress,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IntakeState::Apply => "Apply Now",
            IntakeState::Closed => "Applications Closed",
            IntakeState::Enrolled => "Enrolled",
            IntakeState::Rejected => "Application Rejected",
            IntakeState::InProgress => "Application in Progress",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseIntake {
    pub course: Course,
    pub state: IntakeState,
    pub label: String,
}
