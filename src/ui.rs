//! Terminal presentation for the command-line client

mod progress;

pub use progress::{format_pass_summary, format_recommendations, status_line, ProgressRenderer};
