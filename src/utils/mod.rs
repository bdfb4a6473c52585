pub mod cache;
pub mod dirs;
pub mod http;
pub mod rate_limit;
