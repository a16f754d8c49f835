//! Shared console infrastructure.

pub mod output;
