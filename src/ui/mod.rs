//! Terminal output for the masters CLI
//!
//! Uses `cliclack` for spinners and step logs in a terminal, and falls back
//! to plain tagged lines (`[OK]`, `[WARN]`, ...) when output is piped or a
//! CI environment is detected.
//!
//! ```rust,ignore
//! use masters::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Resolving master ubuntu-11.04...");
//! // ... cache.get(&key).await ...
//! spinner.stop("Master ready");
//! ```

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_error, outro_success, remark, section, step_error,
    step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
pub use theme::{init_theme, MastersTheme};
