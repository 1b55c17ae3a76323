pub mod comments_handlers;
pub mod comments_models;
