#![forbid(unsafe_code)]

pub mod assemble;
pub mod book;
pub mod cli;
pub mod convert;
pub mod error;
pub mod extract;
pub mod logging;
pub mod render;
pub mod style;
