pub mod handlers;
pub mod models;
pub mod registry;
pub mod router;
pub mod services;
