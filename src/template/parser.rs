//! ERB template scanner
//!
//! A single linear scan over the source collects literal markup tags and
//! embedded-code regions in document order. ERB regions are recognized
//! everywhere, including inside tag bodies and quoted attribute values,
//! which is why this is a hand-rolled scanner rather than an XML reader.

use thiserror::Error;

use super::node::{Attribute, ErbKind, ErbRegion, TagNode};

/// Errors from scanning a template
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unterminated ERB tag at line {line}, column {column}")]
    UnterminatedErb { line: usize, column: usize },

    #[error("Unterminated quoted value at line {line}, column {column}")]
    UnterminatedQuote { line: usize, column: usize },

    #[error("Unterminated tag at line {line}, column {column}")]
    UnterminatedTag { line: usize, column: usize },
}

impl ParseError {
    /// Line and column the error points at
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::UnterminatedErb { line, column }
            | ParseError::UnterminatedQuote { line, column }
            | ParseError::UnterminatedTag { line, column } => (*line, *column),
        }
    }
}

/// Everything one scan produces
#[derive(Debug)]
pub(crate) struct ScanOutput {
    pub tags: Vec<TagNode>,
    pub regions: Vec<ErbRegion>,
}

/// Scan template source into tags and ERB regions
pub(crate) fn scan(source: &str) -> Result<ScanOutput, ParseError> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    let scanner = Scanner {
        source,
        bytes: source.as_bytes(),
        line_starts,
        tags: Vec::new(),
        regions: Vec::new(),
    };
    scanner.run()
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_tag_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    line_starts: Vec<usize>,
    tags: Vec<TagNode>,
    regions: Vec<ErbRegion>,
}

impl Scanner<'_> {
    fn position(&self, pos: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= pos);
        let col = pos - self.line_starts.get(line.saturating_sub(1)).unwrap_or(&0) + 1;
        (line, col)
    }

    fn starts_erb(&self, i: usize) -> bool {
        self.bytes.get(i) == Some(&b'<') && self.bytes.get(i + 1) == Some(&b'%')
    }

    fn run(mut self) -> Result<ScanOutput, ParseError> {
        let len = self.bytes.len();
        let mut i = 0;
        while i < len {
            if self.bytes[i] == b'<' {
                if self.starts_erb(i) {
                    i = self.scan_erb(i)?;
                    continue;
                }
                match self.bytes.get(i + 1) {
                    Some(b'!') => {
                        i = self.skip_declaration(i);
                        continue;
                    }
                    Some(b'/') => {
                        i = self.scan_tag(i)?;
                        continue;
                    }
                    Some(c) if c.is_ascii_alphabetic() => {
                        i = self.scan_tag(i)?;
                        continue;
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        Ok(ScanOutput {
            tags: self.tags,
            regions: self.regions,
        })
    }

    /// Scan one ERB region, returning the index just past `%>`
    fn scan_erb(&mut self, start: usize) -> Result<usize, ParseError> {
        // `<%%` renders a literal `<%` and opens no region
        if self.bytes.get(start + 2) == Some(&b'%') {
            return Ok(start + 3);
        }

        let mut j = start + 2;
        let kind = match self.bytes.get(j) {
            Some(b'=') => {
                j += 1;
                if self.bytes.get(j) == Some(&b'=') {
                    j += 1;
                }
                ErbKind::Expression
            }
            Some(b'#') => {
                j += 1;
                ErbKind::Comment
            }
            _ => ErbKind::Statement,
        };
        if self.bytes.get(j) == Some(&b'-') {
            j += 1;
        }
        let code_start = j;

        let close = match self.source[j..].find("%>") {
            Some(offset) => j + offset,
            None => {
                let (line, column) = self.position(start);
                return Err(ParseError::UnterminatedErb { line, column });
            }
        };
        let mut code_end = close;
        if code_end > code_start && self.bytes[code_end - 1] == b'-' {
            code_end -= 1;
        }
        let end = close + 2;

        self.regions.push(ErbRegion {
            kind,
            code: self.source[code_start..code_end].to_string(),
            location: self.position(start),
            length: end - start,
            code_location: self.position(code_start),
        });
        Ok(end)
    }

    /// Skip `<!-- -->` comments and `<!...>` declarations
    fn skip_declaration(&self, i: usize) -> usize {
        if self.source[i..].starts_with("<!--") {
            match self.source[i + 4..].find("-->") {
                Some(offset) => i + 4 + offset + 3,
                None => self.bytes.len(),
            }
        } else {
            match self.source[i..].find('>') {
                Some(offset) => i + offset + 1,
                None => self.bytes.len(),
            }
        }
    }

    /// Scan one tag, returning the index just past its `>`
    fn scan_tag(&mut self, start: usize) -> Result<usize, ParseError> {
        let len = self.bytes.len();
        let mut j = start + 1;
        let closing = self.bytes.get(j) == Some(&b'/');
        if closing {
            j += 1;
        }

        let name_start = j;
        while j < len && is_tag_name_char(self.bytes[j]) {
            j += 1;
        }
        if j == name_start {
            return Ok(start + 1);
        }
        let name = self.source[name_start..j].to_string();

        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            if j >= len {
                let (line, column) = self.position(start);
                return Err(ParseError::UnterminatedTag { line, column });
            }
            if is_space(self.bytes[j]) {
                j += 1;
                continue;
            }
            if self.starts_erb(j) {
                j = self.scan_erb(j)?;
                continue;
            }
            match self.bytes[j] {
                b'>' => {
                    j += 1;
                    break;
                }
                b'/' => {
                    if self.bytes.get(j + 1) == Some(&b'>') {
                        self_closing = true;
                        j += 2;
                        break;
                    }
                    j += 1;
                }
                _ => {
                    let (attribute, next) = self.scan_attribute(j)?;
                    if let Some(attribute) = attribute {
                        attributes.push(attribute);
                    }
                    j = next;
                }
            }
        }

        self.tags.push(TagNode {
            name,
            closing,
            self_closing,
            location: self.position(start),
            name_location: self.position(name_start),
            attributes,
        });
        Ok(j)
    }

    /// Scan one attribute, returning it (if well-formed) and the next index
    fn scan_attribute(&mut self, start: usize) -> Result<(Option<Attribute>, usize), ParseError> {
        let len = self.bytes.len();
        let mut j = start;
        while j < len
            && !is_space(self.bytes[j])
            && !matches!(self.bytes[j], b'=' | b'>' | b'/' | b'<')
        {
            j += 1;
        }
        if j == start {
            // Unexpected byte; step over it instead of looping
            return Ok((None, start + 1));
        }
        let name = self.source[start..j].to_string();
        let location = self.position(start);

        let mut k = j;
        while k < len && is_space(self.bytes[k]) {
            k += 1;
        }
        if self.bytes.get(k) != Some(&b'=') {
            return Ok((
                Some(Attribute {
                    name,
                    value: None,
                    location,
                    value_location: None,
                }),
                j,
            ));
        }
        k += 1;
        while k < len && is_space(self.bytes[k]) {
            k += 1;
        }

        match self.bytes.get(k) {
            Some(&q) if q == b'"' || q == b'\'' => {
                let value_start = k + 1;
                let mut v = value_start;
                while v < len && self.bytes[v] != q {
                    if self.starts_erb(v) {
                        v = self.scan_erb(v)?;
                    } else {
                        v += 1;
                    }
                }
                if v >= len {
                    let (line, column) = self.position(k);
                    return Err(ParseError::UnterminatedQuote { line, column });
                }
                Ok((
                    Some(Attribute {
                        name,
                        value: Some(self.source[value_start..v].to_string()),
                        location,
                        value_location: Some(self.position(value_start)),
                    }),
                    v + 1,
                ))
            }
            Some(_) if self.starts_erb(k) => {
                let end = self.scan_erb(k)?;
                Ok((
                    Some(Attribute {
                        name,
                        value: Some(self.source[k..end].to_string()),
                        location,
                        value_location: Some(self.position(k)),
                    }),
                    end,
                ))
            }
            Some(b'>') | None => {
                // `=` with nothing usable after it; treated as valueless
                Ok((
                    Some(Attribute {
                        name,
                        value: None,
                        location,
                        value_location: None,
                    }),
                    k,
                ))
            }
            Some(_) => {
                let value_start = k;
                let mut v = k;
                while v < len && !is_space(self.bytes[v]) && !matches!(self.bytes[v], b'>' | b'<') {
                    v += 1;
                }
                Ok((
                    Some(Attribute {
                        name,
                        value: Some(self.source[value_start..v].to_string()),
                        location,
                        value_location: Some(self.position(value_start)),
                    }),
                    v,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_simple_tag() {
        let out = scan("<input type=\"email\">").unwrap();
        assert_eq!(out.tags.len(), 1);
        let tag = &out.tags[0];
        assert_eq!(tag.name, "input");
        assert!(!tag.closing);
        assert!(!tag.self_closing);
        assert_eq!(tag.location, (1, 1));
        assert_eq!(tag.name_location, (1, 2));
        assert_eq!(tag.attributes.len(), 1);
        assert_eq!(tag.attributes[0].name, "type");
        assert_eq!(tag.attributes[0].value.as_deref(), Some("email"));
    }

    #[test]
    fn test_scan_attribute_forms() {
        let out = scan("<input autocomplete type='a' id=\"\" class=plain>").unwrap();
        let tag = &out.tags[0];
        assert_eq!(tag.attributes.len(), 4);
        assert_eq!(tag.attributes[0].name, "autocomplete");
        assert_eq!(tag.attributes[0].value, None);
        assert_eq!(tag.attributes[1].value.as_deref(), Some("a"));
        assert_eq!(tag.attributes[2].value.as_deref(), Some(""));
        assert_eq!(tag.attributes[3].value.as_deref(), Some("plain"));
    }

    #[test]
    fn test_scan_self_closing_and_closing_tags() {
        let out = scan("<input type=\"text\" /></form>").unwrap();
        assert_eq!(out.tags.len(), 2);
        assert!(out.tags[0].self_closing);
        assert!(!out.tags[0].closing);
        assert!(out.tags[1].closing);
        assert_eq!(out.tags[1].name, "form");
    }

    #[test]
    fn test_tag_name_case_is_preserved() {
        let out = scan("<INPUT type=\"email\">").unwrap();
        assert_eq!(out.tags[0].name, "INPUT");
    }

    #[test]
    fn test_scan_erb_kinds() {
        let out = scan("<%= output %><% stmt %><%# note %><%== raw %>").unwrap();
        assert_eq!(out.tags.len(), 0);
        assert_eq!(out.regions.len(), 4);
        assert_eq!(out.regions[0].kind, ErbKind::Expression);
        assert_eq!(out.regions[0].code, " output ");
        assert_eq!(out.regions[1].kind, ErbKind::Statement);
        assert_eq!(out.regions[1].code, " stmt ");
        assert_eq!(out.regions[2].kind, ErbKind::Comment);
        assert_eq!(out.regions[2].code, " note ");
        assert_eq!(out.regions[3].kind, ErbKind::Expression);
        assert_eq!(out.regions[3].code, " raw ");
    }

    #[test]
    fn test_scan_erb_trim_markers() {
        let out = scan("<%- each_thing -%>").unwrap();
        assert_eq!(out.regions.len(), 1);
        assert_eq!(out.regions[0].kind, ErbKind::Statement);
        assert_eq!(out.regions[0].code, " each_thing ");
    }

    #[test]
    fn test_region_span_covers_delimiters() {
        let out = scan("<br />\n<%= date_field_tag do %>\n").unwrap();
        assert_eq!(out.tags.len(), 1);
        assert_eq!(out.regions.len(), 1);
        let region = &out.regions[0];
        assert_eq!(region.location, (2, 1));
        assert_eq!(region.length, 24);
        assert_eq!(region.code, " date_field_tag do ");
        assert_eq!(region.code_location, (2, 4));
    }

    #[test]
    fn test_erb_inside_attribute_value() {
        let out = scan("<input value=\"<%= user.name %>\" type=\"text\">").unwrap();
        assert_eq!(out.tags.len(), 1);
        assert_eq!(out.regions.len(), 1);
        assert_eq!(out.regions[0].code, " user.name ");
        let tag = &out.tags[0];
        assert_eq!(tag.attributes[0].value.as_deref(), Some("<%= user.name %>"));
        assert_eq!(tag.attributes[1].value.as_deref(), Some("text"));
    }

    #[test]
    fn test_erb_between_attributes() {
        let out = scan("<input <%= extra_attrs %> type=\"text\">").unwrap();
        assert_eq!(out.tags.len(), 1);
        assert_eq!(out.regions.len(), 1);
        assert_eq!(out.tags[0].attributes.len(), 1);
        assert_eq!(out.tags[0].attributes[0].name, "type");
    }

    #[test]
    fn test_escaped_erb_opener_is_literal() {
        let out = scan("<%%= not_code %>").unwrap();
        assert_eq!(out.regions.len(), 0);
    }

    #[test]
    fn test_markup_comments_and_doctype_are_skipped() {
        let out = scan("<!DOCTYPE html>\n<!-- <input type=\"email\"> -->\n<br>").unwrap();
        assert_eq!(out.tags.len(), 1);
        assert_eq!(out.tags[0].name, "br");
        assert_eq!(out.regions.len(), 0);
    }

    #[test]
    fn test_multiline_positions() {
        let out = scan("<div>\n  <input\n    type=\"url\">\n</div>").unwrap();
        let input = &out.tags[1];
        assert_eq!(input.location, (2, 3));
        assert_eq!(input.name_location, (2, 4));
        assert_eq!(input.attributes[0].location, (3, 5));
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let out = scan("a < b\n<input type=\"tel\">").unwrap();
        assert_eq!(out.tags.len(), 1);
        assert_eq!(out.tags[0].name, "input");
    }

    #[test]
    fn test_unterminated_erb_is_an_error() {
        let err = scan("<br>\n<%= text_field_tag").unwrap_err();
        match err {
            ParseError::UnterminatedErb { line, column } => {
                assert_eq!(line, 2);
                assert_eq!(column, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        let err = scan("<input type=\"email>").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedQuote { .. }));
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        let err = scan("<input type=email").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedTag { .. }));
    }
}
