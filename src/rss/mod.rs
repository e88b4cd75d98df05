//! RSS feed processing module.
//!
//! This module handles the fetching, decoding, and parsing of RSS, Atom and
//! JSON feeds into [`FeedEntry`] records.

mod client;
mod parser;
mod types;
mod util;

pub use self::types::*;

pub use self::client::*;
pub use self::parser::*;
pub use self::util::*;
