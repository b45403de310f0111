//! # tickethub-database
//!
//! Persistence for TicketHub: the [`Store`] abstraction with in-memory and
//! PostgreSQL backends, the generic [`EntityRepository`], per-entity search
//! criteria and query extensions, and the [`UnitOfWork`] that owns the
//! commit boundary.

pub mod connection;
pub mod criteria;
pub mod include;
pub mod migration;
pub mod repositories;
pub mod repository;
pub mod session;
pub mod store;
pub mod unit_of_work;

pub use connection::DatabasePool;
pub use criteria::{Paging, SearchCriteria};
pub use repository::EntityRepository;
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use store::{Row, Store, StoreTransaction};
pub use unit_of_work::UnitOfWork;
