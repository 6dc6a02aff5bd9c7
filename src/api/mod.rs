// Backend API boundary
// The backend owns affirmation CRUD, auth, and voice synthesis; this side
// only fetches records and resolves audio URLs

pub mod client;

pub use client::ApiClient;
