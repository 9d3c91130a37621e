//! Node types produced by the template scanner

/// Presence of an attribute on a tag, looked up by name.
///
/// Presence and value-presence are independent: an attribute can appear
/// with no value at all (`<input autocomplete>`), which is distinct from
/// both absence and an explicit value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrPresence<'a> {
    /// No attribute with that name on the tag
    Absent,
    /// Attribute appears without any `=value` part
    Valueless(&'a Attribute),
    /// Attribute appears with a value (an explicit empty value counts)
    WithValue(&'a Attribute),
}

impl AttrPresence<'_> {
    /// Whether the attribute appears with a value
    pub fn has_value(&self) -> bool {
        matches!(self, AttrPresence::WithValue(_))
    }
}

/// A single attribute on a tag
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name as written in the source
    pub name: String,

    /// Attribute value; `None` when the attribute is valueless.
    /// Quoted values keep embedded ERB text verbatim.
    pub value: Option<String>,

    /// Line/column (1-based) of the attribute name token
    pub location: (usize, usize),

    /// Line/column (1-based) of the value, when present
    pub value_location: Option<(usize, usize)>,
}

/// A literal markup tag found in the template
#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    /// Tag name as written in the source
    pub name: String,

    /// Whether this is a closing tag (`</input>`)
    pub closing: bool,

    /// Whether the tag is self-closing (`<input />`)
    pub self_closing: bool,

    /// Line/column (1-based) of the opening `<`
    pub location: (usize, usize),

    /// Line/column (1-based) of the tag-name token
    pub name_location: (usize, usize),

    /// Attributes in source order
    pub attributes: Vec<Attribute>,
}

impl TagNode {
    /// Look up an attribute by name.
    ///
    /// Attribute names are matched ASCII-case-insensitively, per HTML
    /// conventions. The first matching attribute wins.
    pub fn attribute(&self, name: &str) -> AttrPresence<'_> {
        for attr in &self.attributes {
            if attr.name.eq_ignore_ascii_case(name) {
                return if attr.value.is_some() {
                    AttrPresence::WithValue(attr)
                } else {
                    AttrPresence::Valueless(attr)
                };
            }
        }
        AttrPresence::Absent
    }
}

/// Kind of an embedded-code region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErbKind {
    /// Output-emitting region (`<%=` or `<%==`)
    Expression,
    /// Statement region (`<%`)
    Statement,
    /// Comment region (`<%#`)
    Comment,
}

/// An embedded-code region (`<% ... %>`) found anywhere in the template,
/// including inside tag bodies and quoted attribute values
#[derive(Debug, Clone, PartialEq)]
pub struct ErbRegion {
    /// Region kind, derived from the indicator character
    pub kind: ErbKind,

    /// Inner code text, excluding delimiters, the indicator and trim markers
    pub code: String,

    /// Line/column (1-based) of the opening `<%`
    pub location: (usize, usize),

    /// Full span length in bytes, delimiters included
    pub length: usize,

    /// Line/column (1-based) where the inner code text starts
    pub code_location: (usize, usize),
}

impl ErbRegion {
    /// Whether this is a comment region
    pub fn is_comment(&self) -> bool {
        self.kind == ErbKind::Comment
    }

    /// Map a 1-based line/column within the inner code to a position in
    /// the enclosing file
    pub fn position_in_code(&self, line: usize, column: usize) -> (usize, usize) {
        if line == 1 {
            (self.code_location.0, self.code_location.1 + column - 1)
        } else {
            (self.code_location.0 + line - 1, column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_with(attributes: Vec<Attribute>) -> TagNode {
        TagNode {
            name: "input".to_string(),
            closing: false,
            self_closing: false,
            location: (1, 1),
            name_location: (1, 2),
            attributes,
        }
    }

    #[test]
    fn test_attribute_lookup_tri_state() {
        let tag = tag_with(vec![
            Attribute {
                name: "type".to_string(),
                value: Some("email".to_string()),
                location: (1, 8),
                value_location: Some((1, 14)),
            },
            Attribute {
                name: "autocomplete".to_string(),
                value: None,
                location: (1, 21),
                value_location: None,
            },
        ]);

        assert!(matches!(tag.attribute("type"), AttrPresence::WithValue(_)));
        assert!(matches!(
            tag.attribute("autocomplete"),
            AttrPresence::Valueless(_)
        ));
        assert!(matches!(tag.attribute("name"), AttrPresence::Absent));
    }

    #[test]
    fn test_attribute_lookup_is_case_insensitive() {
        let tag = tag_with(vec![Attribute {
            name: "TYPE".to_string(),
            value: Some("text".to_string()),
            location: (1, 8),
            value_location: Some((1, 13)),
        }]);

        match tag.attribute("type") {
            AttrPresence::WithValue(attr) => assert_eq!(attr.value.as_deref(), Some("text")),
            other => panic!("expected WithValue, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_value_counts_as_with_value() {
        let tag = tag_with(vec![Attribute {
            name: "autocomplete".to_string(),
            value: Some(String::new()),
            location: (1, 8),
            value_location: Some((1, 22)),
        }]);

        assert!(tag.attribute("autocomplete").has_value());
    }

    #[test]
    fn test_region_position_mapping() {
        let region = ErbRegion {
            kind: ErbKind::Expression,
            code: " link_to\n  path ".to_string(),
            location: (4, 3),
            length: 24,
            code_location: (4, 6),
        };

        // First code line is offset by the delimiter width
        assert_eq!(region.position_in_code(1, 2), (4, 7));
        // Later lines map straight through
        assert_eq!(region.position_in_code(2, 3), (5, 3));
    }
}
