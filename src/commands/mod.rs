//! Commands
//!
//! Entry points invoked by the CLI. Each command works against the shared
//! [`crate::state::AppState`].

pub mod analyze;
pub mod estimate;
pub mod health;
pub mod settings;

pub use analyze::*;
pub use estimate::*;
pub use health::*;
pub use settings::*;
