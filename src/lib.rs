pub mod accounts;
pub mod app;
pub mod authz;
pub mod db;
pub mod docs;
pub mod errors;
pub mod extract;
pub mod gateway;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod token;
pub mod utils;

// Re-export commonly used items for tests
pub use app::{create_app, create_app_with_transport, AppState};
