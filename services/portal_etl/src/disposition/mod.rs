//! Memo disposition labels: canonicalization, filter helpers and KPIs

pub mod normalize;
pub mod analytics;

pub use normalize::*;
pub use analytics::*;
