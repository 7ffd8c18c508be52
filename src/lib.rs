//! funcsweep: drive a per-function C extractor over a source corpus and
//! persist every extracted function into SQLite.
//!
//! The corpus is enumerated by [`corpus::CorpusEnumerator`], each file is swept
//! by an [`extractor::Driver`], and rows land in a [`store::db::ResultStore`].

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod extractor;
pub mod store;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Result, SweepError};
