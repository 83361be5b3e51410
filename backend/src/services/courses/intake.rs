use crate::error::{ServiceError, ServiceResult};
use crate::services::auth::CurrentUser;
use crate::services::progress::workflow;
use crate::state::AppState;
use crate::store::{Direction, Table};
use actix_web::{web, HttpResponse};
use common::model::course::{CourseIntake, IntakeState};
use common::model::progress::ReviewStatus;
use common::model::registration::Registration;

pub async fn process(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ServiceError> {
    Ok(HttpResponse::Ok().json(intake_for(&state, user.id())?))
}

/// Every course with what `user_id` can do about it.
pub(crate) fn intake_for(app: &AppState, user_id: &str) -> ServiceResult<Vec<CourseIntake>> {
    let registrations: Vec<Registration> = app
        .store
        .from(Table::Register)
        .eq("user_id", user_id)
        .order("reg_date", Direction::Desc)
        .select_as()?;

    let mut intake = Vec::new();
    for course in super::list_courses(app)? {
        // newest registration for the course wins
        let review = match registrations.iter().find(|r| r.course == course.name) {
            Some(registration) => Some(
                workflow::fetch_optional(app, &registration.student_number)?
                    .map_or(ReviewStatus::Pending, |p| p.application_review),
            ),
            None => None,
        };
        let state = IntakeState::resolve(course.status, review);
        intake.push(CourseIntake {
            course,
            state,
            label: state.label().to_string(),
        });
    }
    Ok(intake)
}
