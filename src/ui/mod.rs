//! Line-oriented terminal consumer of the feed.
//!
//! - `loop_runner` - main event loop
//! - `input` - command parsing and dispatch to the feed handle
//! - `status` - snapshot rendering and incremental view tracking

mod input;
mod loop_runner;
mod status;

pub use input::{handle_input, parse_command, InputError, UserCommand, HELP};
pub use loop_runner::{run, Action};
pub use status::{error_message, status_line, ViewTracker};
