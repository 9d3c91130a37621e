//! Built-in linters

mod require_input_autocomplete;

pub use require_input_autocomplete::RequireInputAutocomplete;

use crate::linter::Linter;

/// All built-in linters, in the order they run.
pub fn all_linters() -> Vec<Box<dyn Linter>> {
    vec![Box::new(RequireInputAutocomplete)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_linter_names_are_unique() {
        let linters = all_linters();
        let names: HashSet<&str> = linters.iter().map(|l| l.name()).collect();
        assert_eq!(names.len(), linters.len());
    }

    #[test]
    fn test_every_linter_has_a_description() {
        for linter in all_linters() {
            assert!(!linter.description().is_empty(), "{}", linter.name());
        }
    }
}
