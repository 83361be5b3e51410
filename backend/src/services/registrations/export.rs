use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::AdminUser;
use crate::state::AppState;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use common::model::registration::StudentOverview;
use serde_json::Value;

const HEADER: [&str; 13] = [
    "student_number",
    "national_id",
    "first_name",
    "surname",
    "email",
    "phone",
    "course",
    "reg_date",
    "application_submitted",
    "document_uploaded",
    "payment_verified",
    "application_review",
    "document_status",
];

pub async fn process(
    state: web::Data<AppState>,
    admin: AdminUser,
) -> Result<HttpResponse, ServiceError> {
    let rows = super::all_overviews(&state)?;
    let body = to_csv(&rows)?;
    log::info!("{} exported {} registrations", admin.full_name(), rows.len());
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename("registrations.csv".into())],
        })
        .body(body))
}

/// Serialized enum value without the JSON quotes.
fn label<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

fn csv_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Internal(format!("CSV export failed: {e}"))
}

pub(crate) fn to_csv(rows: &[StudentOverview]) -> ServiceResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER).map_err(csv_error)?;
    for row in rows {
        let r = &row.registration;
        let (submitted, uploaded, paid, review) = match &row.progress {
            Some(p) => (
                p.application_submitted.as_str(),
                p.document_uploaded.as_str(),
                p.payment_verified.as_str(),
                p.application_review.as_str(),
            ),
            None => ("", "", "", ""),
        };
        let reg_date = r.reg_date.to_rfc3339();
        let document_status = label(&row.document_status);
        writer
            .write_record([
                r.student_number.as_str(),
                r.national_id.as_str(),
                r.first_name.as_str(),
                r.surname.as_str(),
                r.email.as_str(),
                r.phone.as_str(),
                r.course.as_str(),
                reg_date.as_str(),
                submitted,
                uploaded,
                paid,
                review,
                document_status.as_str(),
            ])
            .map_err(csv_error)?;
    }
    writer.into_inner().map_err(csv_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::model::document::DocumentStatus;
    use common::model::progress::ProgressRecord;
    use common::model::registration::Registration;

    fn overview(student_number: &str, address: &str) -> StudentOverview {
        StudentOverview {
            registration: Registration {
                id: "r1".into(),
                user_id: "u1".into(),
                national_id: "900101".into(),
                student_number: student_number.into(),
                first_name: "Thandi".into(),
                surname: "Mokoena".into(),
                email: "thandi@example.com".into(),
                phone: "0821234567".into(),
                address: address.into(),
                course: "Welding".into(),
                reg_date: Utc::now(),
            },
            progress: Some(ProgressRecord::new(student_number, "u1")),
            document_status: DocumentStatus::Submitted,
        }
    }

    #[test]
    fn writes_header_and_one_line_per_registration() {
        let csv = to_csv(&[overview("900101", "1 Main Rd"), overview("900101-2", "2 Main Rd")])
            .unwrap();
        let text = String::from_utf8(csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("student_number,national_id"));
        assert!(lines[2].starts_with("900101-2,900101,Thandi"));
        assert!(lines[2].ends_with("pending,pending,pending,pending,submitted"));
    }
}
