//! # Auth Service Module
//!
//! Email/password accounts, bearer-token sessions and the extractors that
//! expose the signed-in user to every other service.
//!
//! ## Sub-modules:
//! - `signup`: account creation; the role is derived from the email domain.
//! - `signin`: sign-in, sign-out and the current session state.
//! - `session`: `Session`, `CurrentUser` and `AdminUser` extractors.
//! - `password`: Argon2 hashing.

mod password;
mod session;
mod signin;
mod signup;

pub use session::{AdminUser, CurrentUser, Session};
pub use signin::SignInResponse;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/auth";

/// Routes under `/api/auth`:
///
/// *   **`POST /signup`** (`signup::process`): creates the auth user and its
///     `user_profile` row, returns the profile with `201 Created`.
/// *   **`POST /signin`** (`signin::process`): returns a bearer token, its
///     expiry and the `SessionState`.
/// *   **`POST /signout`** (`signin::sign_out`): deletes the session of the
///     presented token.
/// *   **`GET /session`** (`signin::current`): the `SessionState` of the
///     presented token.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/signup", post().to(signup::process))
        .route("/signin", post().to(signin::process))
        .route("/signout", post().to(signin::sign_out))
        .route("/session", get().to(signin::current))
}
