//! Types shared between the admissions server and its clients.
//!
//! `model` holds the records stored by the server together with the closed
//! status vocabularies used across the application workflow, `requests` the
//! payloads accepted by the HTTP API and `jobs` the status reported for
//! background work.

pub mod jobs;
pub mod model;
pub mod requests;
