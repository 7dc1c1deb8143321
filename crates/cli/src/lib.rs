//! Public library modules for the CLI crate
pub mod history;
pub mod organize;
pub mod session;
pub mod undo;
pub mod watch;
