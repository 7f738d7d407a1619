//! Operator dashboard for the IsoMind visual-automation orchestrator.
//!
//! Operators sign in, teach an agent visual actions on captured screenshots,
//! review the resulting blueprints and replay them while following the
//! agent's log and live screen.

pub mod config;
pub mod coords;
pub mod error;
pub mod execution;
pub mod orchestrator;
pub mod stream;
pub mod supabase;
pub mod types;
pub mod web;

pub use config::Config;
pub use error::ClientError;
pub use web::{AppState, router, serve};
