pub mod details;
pub mod handlers;
pub mod history;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod settings;

pub use routes::create_router;
