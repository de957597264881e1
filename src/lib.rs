pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod records;
pub mod state;
pub mod store;

pub use app::build_app;
pub use state::AppState;
