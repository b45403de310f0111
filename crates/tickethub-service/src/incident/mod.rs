//! Incident workflows.

pub mod service;
