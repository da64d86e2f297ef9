pub mod diagnostics_handler;

pub use diagnostics_handler::{__path_get_caller_info, get_caller_info};
