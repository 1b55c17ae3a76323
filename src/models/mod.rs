// src/models/mod.rs

pub mod comment;
pub mod project;
pub mod session;
pub mod task;
pub mod user;
