//! Style-level enrichment: left join that only fills blanks

pub mod style_merge;
pub mod diagnostics;

pub use style_merge::*;
pub use diagnostics::*;
