use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::CurrentUser;
use crate::services::courses;
use crate::services::documents::record;
use crate::services::notifications::{notify_admins, Outgoing};
use crate::services::progress::workflow;
use crate::services::validation;
use crate::state::AppState;
use crate::store::Table;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::model::course::CourseStatus;
use common::model::notification::NotificationKind;
use common::model::registration::{Registration, StudentOverview};
use common::requests::NewRegistration;

/// Attempts at claiming a student number before giving up.
const MAX_ATTEMPTS: usize = 5;

pub async fn process(
    state: web::Data<AppState>,
    user: CurrentUser,
    payload: web::Json<NewRegistration>,
) -> Result<HttpResponse, ServiceError> {
    let overview = register(&state, user.id(), payload.into_inner())?;
    Ok(HttpResponse::Created().json(overview))
}

/// `national_id` when free, otherwise the first free `national_id-N` for
/// N = 2, 3, ...
fn next_student_number(app: &AppState, national_id: &str) -> ServiceResult<String> {
    let mut candidate = national_id.to_string();
    let mut suffix = 1;
    loop {
        let taken = app
            .store
            .from(Table::Register)
            .eq("student_number", candidate.as_str())
            .count()?;
        if taken == 0 {
            return Ok(candidate);
        }
        suffix += 1;
        candidate = format!("{national_id}-{suffix}");
    }
}

fn validate(req: NewRegistration) -> ServiceResult<NewRegistration> {
    Ok(NewRegistration {
        national_id: validation::national_id(&req.national_id)?,
        first_name: validation::required("First name", &req.first_name)?,
        surname: validation::required("Surname", &req.surname)?,
        email: validation::email(&req.email)?,
        phone: validation::phone(&req.phone)?,
        address: validation::required("Address", &req.address)?,
        course: validation::required("Course", &req.course)?,
    })
}

/// Stores a registration with its progress and document records, then tells
/// the admins about it.
pub(crate) fn register(
    app: &AppState,
    user_id: &str,
    req: NewRegistration,
) -> ServiceResult<StudentOverview> {
    let req = validate(req)?;

    let course = courses::find_by_name(app, &req.course)?
        .ok_or_else(|| ServiceError::not_found(format!("Course \"{}\" not found", req.course)))?;
    if course.status != CourseStatus::Open {
        return Err(ServiceError::validation(format!(
            "Applications for {} are closed",
            course.name
        )));
    }
    let existing = app
        .store
        .from(Table::Register)
        .eq("user_id", user_id)
        .eq("course", course.name.as_str())
        .count()?;
    if existing > 0 {
        return Err(ServiceError::conflict(format!(
            "You have already applied for {}",
            course.name
        )));
    }

    let mut registration = Registration {
        id: String::new(),
        user_id: user_id.to_string(),
        national_id: req.national_id,
        student_number: String::new(),
        first_name: req.first_name,
        surname: req.surname,
        email: req.email,
        phone: req.phone,
        address: req.address,
        course: course.name,
        reg_date: Utc::now(),
    };

    let mut stored = None;
    for _ in 0..MAX_ATTEMPTS {
        registration.student_number = next_student_number(app, &registration.national_id)?;
        match app.store.from(Table::Register).insert(&registration) {
            Ok(row) => {
                stored = Some(crate::store::decode::<Registration>(row)?);
                break;
            }
            // claimed by a concurrent registration
            Err(e) if e.is_constraint() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let registration = stored.ok_or_else(|| {
        ServiceError::conflict("Could not allocate a student number, please try again")
    })?;

    let progress = workflow::create(app, &registration.student_number, user_id)?;
    let documents = record::ensure(app, user_id)?;
    log::info!(
        "Registered {} for {}",
        registration.student_number,
        registration.course
    );

    let message = format!(
        "{} applied for {} (student number {}).",
        registration.full_name(),
        registration.course,
        registration.student_number
    );
    notify_admins(
        app,
        &Outgoing {
            sender_id: Some(user_id),
            kind: NotificationKind::Info,
            title: "New Application Received",
            message: &message,
        },
    );

    Ok(StudentOverview {
        registration,
        progress: Some(progress),
        document_status: documents.status,
    })
}
