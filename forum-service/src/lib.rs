//! Forum Service
//!
//! Account registration, login and administration for the forum backend,
//! exposed over HTTP by [`http::router`].

pub mod config;
pub mod http;
pub mod models;
pub mod mysql;
pub mod repository;
pub mod service;

pub use config::{AdminBootstrap, ForumConfig};
pub use models::{Account, AccountStatus, AccountSummary, AuthSession, ProfileUpdate};
pub use mysql::MySqlAccountRepository;
pub use repository::{AccountRepository, InMemoryAccountRepository, RepositoryError};
pub use service::AccountService;
