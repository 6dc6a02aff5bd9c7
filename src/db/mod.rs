// Database module
// Local SQLite storage: cached affirmations and the listening log

pub mod connection;
pub mod migrations;
pub mod models;
pub mod operations;

pub use connection::DatabaseConnection;
