pub const SEPARATOR: char = '/';

/// A request path split into names, plus whether it named a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub names: Vec<String>,
    pub is_container: bool,
}

impl ParsedPath {
    pub fn is_root(&self) -> bool {
        self.names.is_empty()
    }
}

/// Strips the leading separator, records a trailing one, and splits the rest
/// dropping empty names. Names are kept byte-for-byte; no decoding happens here.
pub fn tokenize(raw: &str) -> ParsedPath {
    let trimmed = raw.strip_prefix(SEPARATOR).unwrap_or(raw);
    let is_container = trimmed.ends_with(SEPARATOR);
    let trimmed = trimmed.strip_suffix(SEPARATOR).unwrap_or(trimmed);
    let names = trimmed
        .split(SEPARATOR)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    ParsedPath {
        names,
        is_container,
    }
}
