//! Core math modules.

pub mod special;
pub mod stable;
