//! Core functionality for reading records, merging templates and writing documents

pub mod assembler;
pub mod config;
pub mod document;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod records;
pub mod worker;
pub mod xml;
