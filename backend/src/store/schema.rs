//! Table catalog and migrations.
//!
//! Every table has an `id TEXT PRIMARY KEY`. The column lists below are the
//! only columns the query layer accepts; anything else is an
//! `UnknownColumn` error before SQL is built.

use rusqlite::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    /// Stored as `0`/`1`, read back as a JSON boolean.
    Bool,
}

impl ColumnKind {
    fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Integer | ColumnKind::Bool => "INTEGER",
            ColumnKind::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Register,
    ProgressManagement,
    Documents,
    Attachments,
    Courses,
    StatusHistory,
    Notifications,
    UserProfile,
    AuthUsers,
    Sessions,
    Attendance,
    Grades,
    FeeItems,
    FeeAccounts,
}

use ColumnKind::{Bool, Integer, Text};

const REGISTER: &[(&str, ColumnKind)] = &[
    ("user_id", Text),
    ("national_id", Text),
    ("student_number", Text),
    ("first_name", Text),
    ("surname", Text),
    ("email", Text),
    ("phone", Text),
    ("address", Text),
    ("course", Text),
    ("reg_date", Text),
];

const PROGRESS_MANAGEMENT: &[(&str, ColumnKind)] = &[
    ("student_number", Text),
    ("user_id", Text),
    ("application_submitted", Text),
    ("application_submitted_updated_at", Text),
    ("document_uploaded", Text),
    ("document_uploaded_updated_at", Text),
    ("payment_verified", Text),
    ("payment_verified_updated_at", Text),
    ("application_review", Text),
    ("application_review_updated_at", Text),
    ("review_note", Text),
    ("reviewed_by", Text),
];

const DOCUMENTS: &[(&str, ColumnKind)] = &[
    ("user_id", Text),
    ("id_uploaded", Bool),
    ("id_verified", Bool),
    ("certificate_uploaded", Bool),
    ("certificate_verified", Bool),
    ("residence_uploaded", Bool),
    ("residence_verified", Bool),
    ("payment_uploaded", Bool),
    ("payment_verified", Bool),
    ("status", Text),
    ("updated_at", Text),
];

const ATTACHMENTS: &[(&str, ColumnKind)] = &[
    ("document_id", Text),
    ("doc_type", Text),
    ("file_path", Text),
    ("file_type", Text),
    ("file_name", Text),
    ("size_bytes", Integer),
    ("md5", Text),
    ("uploaded_at", Text),
];

const COURSES: &[(&str, ColumnKind)] = &[
    ("name", Text),
    ("duration", Text),
    ("mode", Text),
    ("level", Text),
    ("description", Text),
    ("status", Text),
    ("opening_date", Text),
    ("closing_date", Text),
    ("created_at", Text),
];

const STATUS_HISTORY: &[(&str, ColumnKind)] = &[
    ("course_id", Text),
    ("date", Text),
    ("action", Text),
    ("admin", Text),
    ("note", Text),
    ("created_at", Text),
];

const NOTIFICATIONS: &[(&str, ColumnKind)] = &[
    ("recipient_id", Text),
    ("sender_id", Text),
    ("kind", Text),
    ("title", Text),
    ("message", Text),
    ("read", Bool),
    ("created_at", Text),
];

const USER_PROFILE: &[(&str, ColumnKind)] = &[
    ("first_name", Text),
    ("surname", Text),
    ("email", Text),
    ("role", Text),
    ("created_at", Text),
];

const AUTH_USERS: &[(&str, ColumnKind)] = &[
    ("email", Text),
    ("password_hash", Text),
    ("created_at", Text),
];

const SESSIONS: &[(&str, ColumnKind)] = &[
    ("user_id", Text),
    ("created_at", Text),
    ("expires_at", Text),
];

const ATTENDANCE: &[(&str, ColumnKind)] = &[
    ("student_number", Text),
    ("name", Text),
    ("course", Text),
    ("date", Text),
    ("status", Text),
    ("mode", Text),
    ("updated_at", Text),
];

const GRADES: &[(&str, ColumnKind)] = &[
    ("course", Text),
    ("student_number", Text),
    ("name", Text),
    ("grade", Integer),
    ("comment", Text),
    ("updated_at", Text),
];

const FEE_ITEMS: &[(&str, ColumnKind)] = &[
    ("key", Text),
    ("label", Text),
    ("amount_cents", Integer),
    ("position", Integer),
];

const FEE_ACCOUNTS: &[(&str, ColumnKind)] = &[
    ("student_number", Text),
    ("name", Text),
    ("paid_cents", Integer),
    ("updated_at", Text),
];

impl Table {
    pub const ALL: [Table; 14] = [
        Table::Register,
        Table::ProgressManagement,
        Table::Documents,
        Table::Attachments,
        Table::Courses,
        Table::StatusHistory,
        Table::Notifications,
        Table::UserProfile,
        Table::AuthUsers,
        Table::Sessions,
        Table::Attendance,
        Table::Grades,
        Table::FeeItems,
        Table::FeeAccounts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Register => "register",
            Table::ProgressManagement => "progress_management",
            Table::Documents => "documents",
            Table::Attachments => "attachments",
            Table::Courses => "courses",
            Table::StatusHistory => "status_history",
            Table::Notifications => "notifications",
            Table::UserProfile => "user_profile",
            Table::AuthUsers => "auth_users",
            Table::Sessions => "sessions",
            Table::Attendance => "attendance",
            Table::Grades => "grades",
            Table::FeeItems => "fee_items",
            Table::FeeAccounts => "fee_accounts",
        }
    }

    /// Data columns, excluding `id`.
    pub fn columns(self) -> &'static [(&'static str, ColumnKind)] {
        match self {
            Table::Register => REGISTER,
            Table::ProgressManagement => PROGRESS_MANAGEMENT,
            Table::Documents => DOCUMENTS,
            Table::Attachments => ATTACHMENTS,
            Table::Courses => COURSES,
            Table::StatusHistory => STATUS_HISTORY,
            Table::Notifications => NOTIFICATIONS,
            Table::UserProfile => USER_PROFILE,
            Table::AuthUsers => AUTH_USERS,
            Table::Sessions => SESSIONS,
            Table::Attendance => ATTENDANCE,
            Table::Grades => GRADES,
            Table::FeeItems => FEE_ITEMS,
            Table::FeeAccounts => FEE_ACCOUNTS,
        }
    }

    /// Column sets that must be unique across the table.
    pub fn unique_keys(self) -> &'static [&'static [&'static str]] {
        match self {
            Table::ProgressManagement | Table::FeeAccounts => &[&["student_number"]],
            Table::Register => &[&["student_number"]],
            Table::Documents => &[&["user_id"]],
            Table::AuthUsers => &[&["email"]],
            Table::FeeItems => &[&["key"]],
            Table::Courses => &[&["name"]],
            Table::Attendance => &[&["student_number", "course", "date"]],
            _ => &[],
        }
    }

    pub fn column_kind(self, column: &str) -> Option<ColumnKind> {
        if column == "id" {
            return Some(ColumnKind::Text);
        }
        self.columns()
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, kind)| *kind)
    }

    fn create_sql(self) -> String {
        let columns: Vec<String> = self
            .columns()
            .iter()
            .map(|(name, kind)| format!("{} {}", name, kind.sql_type()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, {})",
            self.name(),
            columns.join(", ")
        )
    }
}

/// Creates missing tables, columns and unique indexes.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    for table in Table::ALL {
        conn.execute(&table.create_sql(), [])?;
        ensure_columns(conn, table)?;
        for key in table.unique_keys() {
            conn.execute(
                &format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS ux_{}_{} ON {} ({})",
                    table.name(),
                    key.join("_"),
                    table.name(),
                    key.join(", ")
                ),
                [],
            )?;
        }
    }
    Ok(())
}

// Databases created by older builds may predate some columns.
fn ensure_columns(conn: &Connection, table: Table) -> rusqlite::Result<()> {
    for (name, kind) in table.columns() {
        if !table_has_column(conn, table.name(), name)? {
            log::info!("Adding column {}.{}", table.name(), name);
            conn.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    table.name(),
                    name,
                    kind.sql_type()
                ),
                [],
            )?;
        }
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
