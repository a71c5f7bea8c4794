//! Terminal output for the housekeeping commands
//!
//! Uses `cliclack` for prompts and styled steps when attached to a
//! terminal, and falls back to plain `[OK]`-style lines otherwise. Commands
//! whose stdout is machine-read (`url`, `compile`, `send`, ...) print
//! directly instead.

mod context;
mod output;
mod prompts;

pub use context::UiContext;
pub use output::{remark, section, step_info, step_ok, step_ok_detail, step_warn_hint};
pub use prompts::confirm;
