//! Best-effort text decoding.
//!
//! Files are read as UTF-8 first and fall back to Latin-1. Content that `infer`
//! recognises as a non-text format, or that contains NUL bytes, is reported as
//! binary instead of being decoded.

use infer::MatcherType;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Bytes inspected for a format signature before streaming the rest.
const HEAD_LEN: u64 = 8192;

/// Outcome of trying to read a file as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextContent {
    Text(String),
    Binary,
}

impl TextContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TextContent::Text(text) => Some(text),
            TextContent::Binary => None,
        }
    }

    /// Number of lines, counting a trailing partial line. `None` for binary content.
    pub fn line_count(&self) -> Option<u64> {
        self.as_text().map(count_lines)
    }
}

/// Reads `path` and decodes it.
///
/// I/O failures are returned as errors; undecodable content is not an error.
///
/// The whole file is held in memory; use [`count_file_lines`] when only the
/// line count is needed.
pub fn read_text(path: &Path) -> io::Result<TextContent> {
    let bytes = fs::read(path)?;
    if is_binary(&bytes) {
        return Ok(TextContent::Binary);
    }
    Ok(match String::from_utf8(bytes) {
        Ok(text) => TextContent::Text(text),
        Err(e) => TextContent::Text(latin1(e.as_bytes())),
    })
}

/// Decodes raw bytes, classifying known binary formats as [`TextContent::Binary`].
pub fn decode_bytes(bytes: &[u8]) -> TextContent {
    if is_binary(bytes) {
        return TextContent::Binary;
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => TextContent::Text(text.to_string()),
        Err(_) => TextContent::Text(latin1(bytes)),
    }
}

fn is_binary(bytes: &[u8]) -> bool {
    if let Some(kind) = infer::get(bytes)
        && kind.matcher_type() != MatcherType::Text
    {
        return true;
    }
    bytes.contains(&0)
}

/// Latin-1 maps every byte to the code point of the same value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Counts the lines of `path` without holding the file in memory.
///
/// Agrees with [`TextContent::line_count`] on the decoded file: `None` when
/// the content is binary, otherwise the line count. Both UTF-8 and Latin-1
/// encode a newline as the single byte `0x0A`, so no decoding is needed.
pub fn count_file_lines(path: &Path) -> io::Result<Option<u64>> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut head = Vec::new();
    (&mut reader).take(HEAD_LEN).read_to_end(&mut head)?;
    if let Some(kind) = infer::get(&head)
        && kind.matcher_type() != MatcherType::Text
    {
        return Ok(None);
    }

    let mut counter = LineCounter::default();
    if !counter.feed(&head) {
        return Ok(None);
    }

    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        if !counter.feed(chunk) {
            return Ok(None);
        }
        let consumed = chunk.len();
        reader.consume(consumed);
    }

    Ok(Some(counter.finish()))
}

#[derive(Default)]
struct LineCounter {
    newlines: u64,
    last: Option<u8>,
}

impl LineCounter {
    /// Returns false once a NUL byte marks the content as binary.
    fn feed(&mut self, chunk: &[u8]) -> bool {
        if chunk.contains(&0) {
            return false;
        }
        self.newlines += chunk.iter().filter(|&&b| b == b'\n').count() as u64;
        if let Some(&byte) = chunk.last() {
            self.last = Some(byte);
        }
        true
    }

    fn finish(&self) -> u64 {
        match self.last {
            Some(b'\n') | None => self.newlines,
            Some(_) => self.newlines + 1,
        }
    }
}

/// Counts lines the way line-oriented readers do: `"a\nb"` and `"a\nb\n"` both have two.
pub fn count_lines(text: &str) -> u64 {
    text.lines().count() as u64
}
