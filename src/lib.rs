pub mod collaborators;
pub mod config;
pub mod db;
pub mod error;
pub mod membership;
pub mod models;
pub mod reference_graph;
pub mod selection;
pub mod service;
pub mod tree;

pub use config::Config;
pub use db::create_pool;
pub use error::{ErrorKind, PortfolioError};
pub use service::PortfolioService;
