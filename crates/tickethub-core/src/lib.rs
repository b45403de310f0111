//! # tickethub-core
//!
//! Core crate for TicketHub. Contains the entity and repository traits,
//! configuration schemas, the predicate/sort/pagination query types,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other TicketHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
