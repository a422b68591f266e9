pub mod bootstrap;
pub mod config;
pub mod gameplay;
pub mod loop_runner;
