//! Parsed template document

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;

use super::node::{ErbRegion, TagNode};
use super::parser::{scan, ParseError};

/// Type alias for disable comment parsing result
type DisableParseResult = (
    HashMap<String, HashSet<usize>>, // disabled_lines
    HashSet<String>,                 // disabled_file_rules
);

/// A parsed ERB template
pub struct Template {
    path: PathBuf,
    source: String,
    source_lines: Vec<String>,
    tags: Vec<TagNode>,
    regions: Vec<ErbRegion>,
    disabled_lines: HashMap<String, HashSet<usize>>,
    disabled_file_rules: HashSet<String>,
}

impl Template {
    pub fn parse(content: &str, path: &Path) -> Result<Self, ParseError> {
        let output = scan(content)?;
        let source_lines: Vec<String> = content.lines().map(String::from).collect();
        let (disabled_lines, disabled_file_rules) = Self::parse_disable_comments(&source_lines);

        log::debug!(
            "Parsed {}: {} tags, {} embedded regions",
            path.display(),
            output.tags.len(),
            output.regions.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            source: content.to_string(),
            source_lines,
            tags: output.tags,
            regions: output.regions,
            disabled_lines,
            disabled_file_rules,
        })
    }

    fn parse_disable_comments(lines: &[String]) -> DisableParseResult {
        let mut disabled_lines: HashMap<String, HashSet<usize>> = HashMap::new();
        let mut disabled_file_rules: HashSet<String> = HashSet::new();

        // Support formats:
        // <%# tinter-disable rule-one %>
        // <%# tinter-disable rule-one, rule-two %>
        // <%# tinter-disable all %>
        let disable_re = Regex::new(r"<%#\s*tinter-disable\s+([\w\-, ]+?)\s*%>").unwrap();
        let disable_next_re =
            Regex::new(r"<%#\s*tinter-disable-next-line\s+([\w\-, ]+?)\s*%>").unwrap();
        let disable_file_re =
            Regex::new(r"<%#\s*tinter-disable-file\s+([\w\-, ]+?)\s*%>").unwrap();

        for (i, line) in lines.iter().enumerate() {
            let line_num = i + 1;

            for cap in disable_file_re.captures_iter(line) {
                for rule_id in Self::split_rule_list(&cap[1]) {
                    disabled_file_rules.insert(rule_id);
                }
            }

            for cap in disable_next_re.captures_iter(line) {
                for rule_id in Self::split_rule_list(&cap[1]) {
                    disabled_lines
                        .entry(rule_id)
                        .or_default()
                        .insert(line_num + 1);
                }
            }

            for cap in disable_re.captures_iter(line) {
                for rule_id in Self::split_rule_list(&cap[1]) {
                    disabled_lines.entry(rule_id).or_default().insert(line_num);
                }
            }
        }

        (disabled_lines, disabled_file_rules)
    }

    fn split_rule_list(list: &str) -> impl Iterator<Item = String> + '_ {
        list.split([',', ' '])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(String::from)
    }

    /// Literal tags in document order
    pub fn tags(&self) -> &[TagNode] {
        &self.tags
    }

    /// Embedded-code regions in document order
    pub fn erb_regions(&self) -> &[ErbRegion] {
        &self.regions
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    /// Get a source line by 1-based number
    pub fn get_source_line(&self, line: usize) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.source_lines.get(line - 1).map(String::as_str)
    }

    pub fn is_rule_disabled(&self, rule_id: &str, line: usize) -> bool {
        if let Some(lines) = self.disabled_lines.get("all") {
            if lines.contains(&line) {
                return true;
            }
        }
        if let Some(lines) = self.disabled_lines.get(rule_id) {
            if lines.contains(&line) {
                return true;
            }
        }
        false
    }

    pub fn is_rule_disabled_for_file(&self, rule_id: &str) -> bool {
        self.disabled_file_rules.contains("all") || self.disabled_file_rules.contains(rule_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Template {
        Template::parse(content, Path::new("test.html.erb")).unwrap()
    }

    #[test]
    fn test_parse_collects_tags_and_regions() {
        let template = parse("<input type=\"text\">\n<%= text_field_tag :name %>\n");
        assert_eq!(template.tags().len(), 1);
        assert_eq!(template.erb_regions().len(), 1);
        assert_eq!(template.path(), Path::new("test.html.erb"));
    }

    #[test]
    fn test_get_source_line() {
        let template = parse("<br>\n<hr>\n");
        assert_eq!(template.get_source_line(1), Some("<br>"));
        assert_eq!(template.get_source_line(2), Some("<hr>"));
        assert_eq!(template.get_source_line(0), None);
        assert_eq!(template.get_source_line(3), None);
    }

    #[test]
    fn test_disable_comment_on_same_line() {
        let template = parse("<input type=\"text\"> <%# tinter-disable require-input-autocomplete %>\n");
        assert!(template.is_rule_disabled("require-input-autocomplete", 1));
        assert!(!template.is_rule_disabled("require-input-autocomplete", 2));
        assert!(!template.is_rule_disabled("other-rule", 1));
    }

    #[test]
    fn test_disable_next_line_comment() {
        let template = parse("<%# tinter-disable-next-line require-input-autocomplete %>\n<input type=\"text\">\n");
        assert!(!template.is_rule_disabled("require-input-autocomplete", 1));
        assert!(template.is_rule_disabled("require-input-autocomplete", 2));
    }

    #[test]
    fn test_disable_file_comment() {
        let template = parse("<%# tinter-disable-file require-input-autocomplete %>\n<input type=\"text\">\n");
        assert!(template.is_rule_disabled_for_file("require-input-autocomplete"));
        assert!(!template.is_rule_disabled_for_file("other-rule"));
    }

    #[test]
    fn test_disable_all_wildcard() {
        let template = parse("<input type=\"text\"> <%# tinter-disable all %>\n");
        assert!(template.is_rule_disabled("require-input-autocomplete", 1));
        assert!(template.is_rule_disabled("anything-else", 1));
    }

    #[test]
    fn test_disable_comma_separated_list() {
        let template = parse("<br> <%# tinter-disable rule-one, rule-two %>\n");
        assert!(template.is_rule_disabled("rule-one", 1));
        assert!(template.is_rule_disabled("rule-two", 1));
        assert!(!template.is_rule_disabled("rule-three", 1));
    }

    #[test]
    fn test_plain_comment_is_not_a_directive() {
        let template = parse("<br> <%# just a note %>\n");
        assert!(!template.is_rule_disabled("just", 1));
        assert!(!template.is_rule_disabled_for_file("a"));
    }
}
