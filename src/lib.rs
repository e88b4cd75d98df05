pub mod artifact;
pub mod cleaner;
pub mod collector;
pub mod config;
pub mod environment;
pub mod logging;
pub mod rss;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_STORAGE: &str = "storage";
