pub mod auth_handlers;
pub mod auth_models;

#[cfg(test)]
mod auth_tests;
