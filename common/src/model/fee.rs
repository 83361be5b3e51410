use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fee schedule installed into an empty `fee_items` table: key, label, cents.
pub const DEFAULT_FEE_SCHEDULE: [(&str, &str, i64); 8] = [
    ("registration", "Registration Fee", 279_984),
    ("skills", "Skills Program", 559_872),
    ("assessment", "PoEs Assessment", 30_000),
    ("internal", "Internal Moderation", 30_000),
    ("external", "External Moderation", 30_000),
    ("certification", "Certification", 12_480),
    ("results", "Statement of Results", 12_480),
    ("final", "Final Assessment", 93_600),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeItem {
    #[serde(default)]
    pub id: String,
    pub key: String,
    pub label: String,
    pub amount_cents: i64,
    pub position: i64,
}

/// Amount a student has paid so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccount {
    #[serde(default)]
    pub id: String,
    pub student_number: String,
    pub name: String,
    pub paid_cents: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStatement {
    pub student_number: String,
    pub name: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub owed_cents: i64,
}

impl FeeStatement {
    pub fn new(account: &FeeAccount, items: &[FeeItem]) -> Self {
        let total_cents: i64 = items.iter().map(|item| item.amount_cents).sum();
        Self {
            student_number: account.student_number.clone(),
            name: account.name.clone(),
            total_cents,
            paid_cents: account.paid_cents,
            owed_cents: total_cents - account.paid_cents,
        }
    }
}

/// Formats cents as rand, e.g. `R2799.84` or `-R12.50`.
pub fn format_rand(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}R{}.{:02}", abs / 100, abs % 100)
}
