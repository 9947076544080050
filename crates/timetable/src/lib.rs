//! Weekly class schedule projection for student and department dashboards.
//!
//! The [`schedule`] module holds the pure projector: time-slot bands, today's
//! periods, the period in progress and the periods still ahead. The rest of the
//! crate fetches schedules from the academic backend and serves the projected
//! views over HTTP.

pub mod config;
pub mod schedule;
pub mod server;
pub mod session;
pub mod types;
