//! User-facing output.

pub mod console;

pub use console::ConsoleView;
