// Result store: relational schema and row types

pub mod db;
pub mod schema;

use serde::{Deserialize, Serialize};

/// Source line range of an extracted function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

impl LineSpan {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// One row of `fs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRow {
    pub project: String,
    pub path: String,
    pub file_id: u32,
}

/// One row of `code`
///
/// `span` is `None` when the extractor's offset line could not be parsed;
/// both `start` and `end` are then stored as NULL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRow {
    pub file_id: u32,
    pub func_id: u32,
    pub span: Option<LineSpan>,
    pub src: String,
}
