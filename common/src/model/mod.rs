pub mod attendance;
pub mod course;
pub mod document;
pub mod fee;
pub mod grade;
pub mod notification;
pub mod progress;
pub mod registration;
pub mod user;
