//! Command handlers for the CLI.

mod ask;
mod index;
mod status;

pub use ask::{AskArgs, ChatArgs, handle_ask, handle_chat};
pub use index::{IndexCommand, build_pipeline, handle_index};
pub use status::handle_status;
