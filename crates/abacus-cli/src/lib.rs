//! Interactive command shell for the Abacus calculator.
//!
//! The binary wires configuration, log file setup and the engine together;
//! this library holds the pieces so they can be exercised without a
//! terminal.

pub mod args;
pub mod logging;
pub mod shell;

pub use args::Args;
pub use shell::{Command, parse_command, run};
