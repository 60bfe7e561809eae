//! # uCaptcha Server
//!
//! Process bootstrap and the axum HTTP surface for the uCaptcha time-lock
//! puzzle captcha server: wires the storage backends, key pool manager,
//! and challenge manager together, runs the periodic key rotation task,
//! and exposes `POST /challenge`, `POST /challenge/:id/validation`, and
//! `PUT /difficulty`.

#![warn(missing_docs)]

pub mod bootstrap;
pub mod handlers;
pub mod router;
pub mod state;

pub use bootstrap::{build_app_state, run_rotation_task};
pub use router::create as create_router;
pub use state::AppState;
