//! Flags form inputs that leave autocomplete behaviour unspecified.
//!
//! Checks both literal `<input>` tags and the Rails helper calls that
//! render one. Browsers decide on their own what to autofill into
//! inputs without an explicit `autocomplete` declaration, which leaks
//! stored personal data into unrelated forms.

use crate::linter::Linter;
use crate::offense::{Location, Offense, OffenseNode, OffenseSink};
use crate::ruby;
use crate::template::{AttrPresence, TagNode, Template};

/// Input types browsers will offer to autofill. Matched case-sensitively
/// against the literal attribute value.
const TYPES_REQUIRING_AUTOCOMPLETE: &[&str] = &[
    "color",
    "date",
    "datetime-local",
    "email",
    "hidden",
    "month",
    "number",
    "password",
    "range",
    "search",
    "tel",
    "text",
    "time",
    "url",
    "week",
];

/// Rails form-helper functions that render an input element.
const INPUT_FIELD_HELPERS: &[&str] = &[
    "date_field_tag",
    "color_field_tag",
    "email_field_tag",
    "text_field_tag",
    "utf8_enforcer_tag",
    "month_field_tag",
    "hidden_field_tag",
    "number_field_tag",
    "password_field_tag",
    "search_field_tag",
    "telephone_field_tag",
    "time_field_tag",
    "url_field_tag",
    "week_field_tag",
];

const TAG_MESSAGE: &str = "Input tag is missing an autocomplete attribute. If no autocomplete \
     behaviour is desired, use the value `off` or `nope`.";

const HELPER_MESSAGE: &str = "Input field helper is missing an autocomplete attribute. If no \
     autocomplete behaviour is desired, use the value `off` or `nope`.";

/// Requires an explicit `autocomplete` declaration on autofillable inputs.
pub struct RequireInputAutocomplete;

impl Linter for RequireInputAutocomplete {
    fn name(&self) -> &'static str {
        "require-input-autocomplete"
    }

    fn description(&self) -> &'static str {
        "Form inputs that browsers can autofill must declare autocomplete behaviour"
    }

    fn run(&self, template: &Template, sink: &mut OffenseSink) {
        self.check_input_tags(template, sink);
        self.check_helper_calls(template, sink);
    }
}

impl RequireInputAutocomplete {
    fn check_input_tags(&self, template: &Template, sink: &mut OffenseSink) {
        for tag in template.tags() {
            if tag.closing || tag.name != "input" {
                continue;
            }
            let autocomplete = tag.attribute("autocomplete");
            if autocomplete.has_value() || !type_requires_autocomplete(tag) {
                continue;
            }

            // The offense points at the tag-name token, not the whole tag
            let (line, column) = tag.name_location;
            let location = Location::new(template.path().to_path_buf(), line, column)
                .with_length(tag.name.len());
            let mut offense = Offense::new(self.name(), self.severity(), TAG_MESSAGE, location);
            if let AttrPresence::Valueless(attr) = autocomplete {
                offense = offense.with_node(OffenseNode::Attribute {
                    name: attr.name.clone(),
                    location: Location::new(
                        template.path().to_path_buf(),
                        attr.location.0,
                        attr.location.1,
                    )
                    .with_length(attr.name.len()),
                });
            }
            sink.add(offense);
        }
    }

    fn check_helper_calls(&self, template: &Template, sink: &mut OffenseSink) {
        for region in template.erb_regions() {
            if region.is_comment() {
                continue;
            }
            let tree = match ruby::parse_fragment(&region.code) {
                Ok(tree) => tree,
                Err(err) => {
                    log::debug!(
                        "{}: skipping region at {}:{}: {}",
                        template.path().display(),
                        region.location.0,
                        region.location.1,
                        err
                    );
                    continue;
                }
            };
            let Some(call) = tree.first_call() else {
                continue;
            };
            let Some(method) = call.method_name() else {
                continue;
            };
            if !INPUT_FIELD_HELPERS.contains(&method) {
                continue;
            }
            // Any occurrence of the word suppresses the offense, even in
            // an unrelated argument. Coarse, but cheap to reason about.
            if region.code.contains("autocomplete") {
                continue;
            }

            let region_location = Location::new(
                template.path().to_path_buf(),
                region.location.0,
                region.location.1,
            )
            .with_length(region.length);
            let (call_line, call_column) = region.position_in_code(call.span.line, call.span.column);
            let offense = Offense::new(
                self.name(),
                self.severity(),
                HELPER_MESSAGE,
                region_location.clone(),
            )
            .with_node(OffenseNode::Region {
                location: region_location,
            })
            .with_node(OffenseNode::Call {
                method: method.to_string(),
                location: Location::new(template.path().to_path_buf(), call_line, call_column)
                    .with_length(call.span.len()),
            });
            sink.add(offense);
        }
    }
}

fn type_requires_autocomplete(tag: &TagNode) -> bool {
    match tag.attribute("type") {
        AttrPresence::WithValue(attr) => attr
            .value
            .as_deref()
            .is_some_and(|value| TYPES_REQUIRING_AUTOCOMPLETE.contains(&value)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn offenses_for(source: &str) -> Vec<Offense> {
        let template = Template::parse(source, Path::new("file.html.erb")).unwrap();
        let mut sink = OffenseSink::new();
        RequireInputAutocomplete.run(&template, &mut sink);
        sink.into_offenses()
    }

    #[test]
    fn test_autocomplete_with_value_passes() {
        assert!(offenses_for("<input type=\"email\" autocomplete=\"foo\">").is_empty());
    }

    #[test]
    fn test_type_outside_required_set_passes() {
        assert!(offenses_for("<input type=\"bar\">").is_empty());
    }

    #[test]
    fn test_missing_autocomplete_is_flagged_at_the_name_token() {
        let offenses = offenses_for("<input type=\"email\">");
        assert_eq!(offenses.len(), 1);
        let offense = &offenses[0];
        assert_eq!(offense.message, TAG_MESSAGE);
        assert_eq!(offense.location.line, 1);
        assert_eq!(offense.location.column, 2);
        assert_eq!(offense.location.length, 5);
        assert!(offense.nodes.is_empty());
    }

    #[test]
    fn test_valueless_autocomplete_is_flagged_and_carries_the_attribute() {
        let offenses = offenses_for("<input type=\"email\" autocomplete>");
        assert_eq!(offenses.len(), 1);
        match &offenses[0].nodes[..] {
            [OffenseNode::Attribute { name, location }] => {
                assert_eq!(name, "autocomplete");
                assert_eq!(location.line, 1);
                assert_eq!(location.column, 21);
            }
            other => panic!("unexpected nodes: {other:?}"),
        }
    }

    #[test]
    fn test_empty_autocomplete_value_passes() {
        // an explicit empty value still counts as declared
        assert!(offenses_for("<input type=\"email\" autocomplete=\"\">").is_empty());
    }

    #[test]
    fn test_input_without_type_passes() {
        assert!(offenses_for("<input name=\"q\">").is_empty());
    }

    #[test]
    fn test_attribute_names_match_case_insensitively() {
        let offenses = offenses_for("<input TYPE=\"email\">");
        assert_eq!(offenses.len(), 1);
    }

    #[test]
    fn test_tag_name_matches_exactly() {
        assert!(offenses_for("<INPUT type=\"email\">").is_empty());
    }

    #[test]
    fn test_type_value_matches_case_sensitively() {
        assert!(offenses_for("<input type=\"EMAIL\">").is_empty());
    }

    #[test]
    fn test_closing_tag_passes() {
        assert!(offenses_for("</input>").is_empty());
    }

    #[test]
    fn test_every_required_type_is_flagged() {
        for ty in TYPES_REQUIRING_AUTOCOMPLETE {
            let source = format!("<input type=\"{ty}\">");
            assert_eq!(offenses_for(&source).len(), 1, "type {ty}");
        }
    }

    #[test]
    fn test_helper_without_autocomplete_is_flagged_across_the_region() {
        let offenses = offenses_for("<br />\n<%= date_field_tag do %>\n");
        assert_eq!(offenses.len(), 1);
        let offense = &offenses[0];
        assert_eq!(offense.message, HELPER_MESSAGE);
        assert_eq!(offense.location.line, 2);
        assert_eq!(offense.location.column, 1);
        assert_eq!(offense.location.length, 24);
        match &offense.nodes[..] {
            [OffenseNode::Region { location }, OffenseNode::Call { method, location: call_location }] =>
            {
                assert_eq!(location, &offense.location);
                assert_eq!(method, "date_field_tag");
                assert_eq!(call_location.line, 2);
                assert_eq!(call_location.column, 5);
                assert_eq!(call_location.length, 14);
            }
            other => panic!("unexpected nodes: {other:?}"),
        }
    }

    #[test]
    fn test_helper_with_autocomplete_keyword_passes() {
        assert!(offenses_for("<br />\n<%= date_field_tag autocomplete: \"foo\" do %>\n").is_empty());
        assert!(offenses_for("<%= text_field_tag :q, autocomplete: \"off\" %>").is_empty());
    }

    #[test]
    fn test_autocomplete_anywhere_in_the_region_suppresses() {
        // the textual check does not care where the word appears
        assert!(offenses_for("<%= text_field_tag :q # autocomplete later %>").is_empty());
        assert!(offenses_for("<%= text_field_tag \"autocomplete\" %>").is_empty());
    }

    #[test]
    fn test_comment_region_passes() {
        assert!(offenses_for("<%# text_field_tag :q %>").is_empty());
    }

    #[test]
    fn test_unparsable_region_is_skipped_silently() {
        assert!(offenses_for("<%= text_field_tag(:q %>").is_empty());
        assert!(offenses_for("<%= cond ? text_field_tag : nil %>").is_empty());
    }

    #[test]
    fn test_statement_region_is_checked_too() {
        let offenses = offenses_for("<% text_field_tag :q %>");
        assert_eq!(offenses.len(), 1);
    }

    #[test]
    fn test_only_the_first_call_counts() {
        // the leading call is the operator, not the helper
        assert!(offenses_for("<%= 1 + text_field_tag %>").is_empty());
    }

    #[test]
    fn test_helper_behind_assignment_is_found() {
        let offenses = offenses_for("<% field = text_field_tag :q %>");
        assert_eq!(offenses.len(), 1);
    }

    #[test]
    fn test_utf8_enforcer_tag_is_covered() {
        assert_eq!(offenses_for("<%= utf8_enforcer_tag %>").len(), 1);
    }

    #[test]
    fn test_non_helper_call_passes() {
        assert!(offenses_for("<%= render :partial %>").is_empty());
        assert!(offenses_for("<% if signed_in? %>").is_empty());
    }

    #[test]
    fn test_tag_offenses_precede_call_offenses() {
        let source = "<%= text_field_tag :q %>\n<input type=\"email\">";
        let offenses = offenses_for(source);
        assert_eq!(offenses.len(), 2);
        assert_eq!(offenses[0].message, TAG_MESSAGE);
        assert_eq!(offenses[0].location.line, 2);
        assert_eq!(offenses[1].message, HELPER_MESSAGE);
        assert_eq!(offenses[1].location.line, 1);
    }

    #[test]
    fn test_duplicate_findings_are_not_merged() {
        let source = "<input type=\"text\">\n<input type=\"text\">";
        let offenses = offenses_for(source);
        assert_eq!(offenses.len(), 2);
        assert_eq!(offenses[0].location.line, 1);
        assert_eq!(offenses[1].location.line, 2);
    }
}
