use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest passing grade.
pub const PASS_MARK: u8 = 50;

/// A grade awarded to a student for a course, out of 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    #[serde(default)]
    pub id: String,
    pub course: String,
    pub student_number: String,
    pub name: String,
    pub grade: u8,
    pub comment: String,
    pub updated_at: DateTime<Utc>,
}

impl GradeEntry {
    pub fn passed(&self) -> bool {
        self.grade >= PASS_MARK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradeFilter {
    #[default]
    All,
    Pass,
    Fail,
}

impl GradeFilter {
    pub fn matches(self, entry: &GradeEntry) -> bool {
        match self {
            GradeFilter::All => true,
            GradeFilter::Pass => entry.passed(),
            GradeFilter::Fail => !entry.passed(),
        }
    }
}

/// Mean of `grades` rounded to two decimals, `None` when there are none.
pub fn average(grades: impl IntoIterator<Item = u8>) -> Option<f64> {
    let (sum, count) = grades
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), g| (sum + u64::from(g), count + 1));
    if count == 0 {
        return None;
    }
    let mean = sum as f64 / count as f64;
    Some((mean * 100.0).round() / 100.0)
}
