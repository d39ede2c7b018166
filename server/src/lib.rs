pub mod errors;
pub mod oauth;
pub mod routes;
pub mod server;
pub mod setup;
pub mod state;
pub mod twitter;
