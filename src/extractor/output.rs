// Parsing of the extractor's stdout

use crate::error::SweepError;
use crate::store::LineSpan;

/// Split extractor output into its offset header and function source.
///
/// The first line must be two whitespace-separated line numbers. When it is
/// not, the span is an error and the whole output is kept as the source so
/// nothing the extractor printed is lost.
pub fn parse_output(stdout: &str) -> (Result<LineSpan, SweepError>, String) {
    let (header, body) = match stdout.split_once('\n') {
        Some((header, body)) => (header, body),
        None => (stdout, ""),
    };

    match parse_header(header) {
        Ok(span) => (Ok(span), body.to_string()),
        Err(e) => (Err(e), stdout.to_string()),
    }
}

/// Parse a `start end` header line
pub fn parse_header(line: &str) -> Result<LineSpan, SweepError> {
    let malformed = || SweepError::MalformedOffset {
        line: line.to_string(),
    };

    let mut tokens = line.split_whitespace();
    let start = tokens.next().ok_or_else(malformed)?;
    let end = tokens.next().ok_or_else(malformed)?;
    if tokens.next().is_some() {
        return Err(malformed());
    }

    let start = start.parse::<u32>().map_err(|_| malformed())?;
    let end = end.parse::<u32>().map_err(|_| malformed())?;

    Ok(LineSpan { start, end })
}
