pub mod auth;
pub mod comments;
pub mod projects;
pub mod routes;
pub mod system;
pub mod tasks;

pub use routes::build_app;
