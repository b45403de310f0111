//! Incident (trouble report) domain entities.

pub mod model;
pub mod status;

pub use model::{Incident, NewIncident};
pub use status::{IncidentPriority, IncidentStatus};
