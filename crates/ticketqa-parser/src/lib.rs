pub mod errors;
pub mod loader;
pub mod timestamps;

pub use errors::{format_counts, ParserError};
pub use loader::{load_raw, read_raw_table};
pub use timestamps::{parse_timestamp, parse_timestamps};

#[cfg(test)]
mod tests;
