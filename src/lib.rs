//! classgate
//!
//! Client core for a school activity log: students record weekly study
//! activities and absence requests, teachers approve students and review
//! their work. Persistence and authentication live in a hosted backend
//! (auth under `/auth/v1`, tables under `/rest/v1`); this crate is the
//! client that decides what a signed-in user may see and keeps that
//! decision current.
//!
//! ## Features
//!
//! - **Access gate** mapping session, profile and a view's required role to
//!   render-or-redirect
//! - **Freshness protocol** keeping the cached session and profile current,
//!   single-flight, with per-call timeouts
//! - **Privileged writers** for approvals and role changes, authorized by the
//!   backend's table policies
//! - **Weekly reports** over logged activities
//!
//! ## Gate
//!
//! ```text
//! session? ─no─► login
//!    │
//! profile? ─no─► login
//!    │
//! approved? ─no─► pending
//!    │
//! role matches? ─no─► own role's home
//!    │
//! render
//! ```
//!
//! ## Example Configuration
//!
//! ```toml
//! [backend]
//! url = "https://project.supabase.co"
//! # anon key from SUPABASE_ANON_KEY env var
//!
//! [freshness]
//! fetch_timeout_secs = 10
//! on_fetch_failure = "fail_closed"   # or "keep_cached"
//!
//! [routes]
//! teacher_home = "/teacher/students"
//! ```

pub mod access;
pub mod auth;
pub mod baas;
pub mod config;
pub mod error;
pub mod freshness;
pub mod identity;
pub mod profile;
pub mod records;
pub mod report;
pub mod util;

// Re-export main types
pub use access::{Destination, GateDecision, Navigation, Router, resolve};
pub use config::{AppConfig, load_config};
pub use error::{AppError, Result};
pub use freshness::{AccessState, Freshness};
