//! Small formatting and parsing helpers shared by the library and the CLI

pub mod format;
