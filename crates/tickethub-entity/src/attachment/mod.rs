//! Files attached to incidents.

pub mod model;

pub use model::{Attachment, NewAttachment};
