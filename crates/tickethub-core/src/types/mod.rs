//! Core type definitions used across the TicketHub workspace.

pub mod filter;
pub mod pagination;
pub mod sorting;

pub use filter::{Filter, Predicate};
pub use pagination::{PageRequest, PagedResult};
pub use sorting::{Sort, SortDirection, SortKey, SortValue};
