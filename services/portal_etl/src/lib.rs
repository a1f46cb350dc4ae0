pub mod config;
pub mod disposition;
pub mod error;
pub mod extract;
pub mod merge;
pub mod period;
pub mod source;
pub mod storage;
pub mod table;
