pub mod system_handlers;

#[cfg(test)]
mod system_tests;
