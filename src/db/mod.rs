pub mod connection;
pub mod filter;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod postgres;
pub mod repository;

pub use filter::{JobFilter, JobQuery};
pub use memory::MemoryJobRepository;
pub use postgres::PgJobRepository;
pub use repository::{JobRepository, RepositoryError};
