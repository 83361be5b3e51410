pub mod attendance;
pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod documents;
pub mod fees;
pub mod grades;
pub mod jobs;
pub mod notifications;
pub mod progress;
pub mod registrations;
pub mod storage;
pub mod validation;
