//! Command handler modules
//!
//! One function per CLI command. Handlers print results for humans and
//! return errors to `main`, which decides how much of them to show.

pub mod config;
pub mod repository;
pub mod status;
pub mod sync;

pub use config::handle_config_interactive;
pub use repository::{handle_check, handle_edit, handle_register, handle_relocate};
pub use status::{handle_projects, handle_status};
pub use sync::{handle_extract, handle_push};
