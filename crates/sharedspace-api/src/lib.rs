pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod images;
pub mod locations;
pub mod middleware;
pub mod origin;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod storage;
pub mod tokens;

pub use config::Config;
pub use error::{AppError, Result};
pub use routes::router;
pub use state::{AppState, AppStateInner};
