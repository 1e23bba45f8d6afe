//! Public library modules for the CLI crate
pub mod batch;
pub mod repl;
