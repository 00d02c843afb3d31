//! Output parsers.
//!
//! The engine's text output is the only interface it offers and it is not a
//! documented format. Each submodule treats one command's output as a small
//! grammar: sentinel lines, section headers and whitespace-split fields.
//! Anything that does not fit surfaces as a [`ParseError`] instead of a
//! silent default.
//!
//! All parsers are pure functions over lines, so they are tested without
//! spawning anything.

mod branch;
mod error;
mod listing;
mod log;
mod result;
mod status;

pub use branch::{parse_branches, parse_credentials};
pub use error::ParseError;
pub use listing::{parse_config, parse_remotes, parse_tables, parse_version};
pub use log::{fold_log_rows, log_query, parse_timestamp};
pub use result::{parse_csv_result, parse_json_result, ResultSet};
pub use status::parse_status;
