//! Process entry points for the YZ runtime
//!
//! Shared CLI and startup helpers live in [`common`]; binaries are under
//! `src/bin/`.

pub mod common;
