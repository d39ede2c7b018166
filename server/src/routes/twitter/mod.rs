//! Twitter OAuth and API passthrough routes

mod auth;
mod callback;
mod tokens;
mod tweets;

pub use auth::*;
pub use callback::*;
pub use tokens::*;
pub use tweets::*;
