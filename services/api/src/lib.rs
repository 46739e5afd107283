//! Interview Screener API Library Crate
//!
//! This library contains the web service around the screener core: the
//! application state, session registry, API handlers, and routing. The
//! binaries in `bin/` are thin wrappers around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod router;
pub mod startup;
pub mod state;
