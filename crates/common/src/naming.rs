//! Naming helpers
//!
//! Case conversion and pluralization used to derive paths, operation IDs and
//! schema names from schema graph identifiers.

use convert_case::{Case, Casing};

pub fn kebab_case(s: &str) -> String {
    s.to_case(Case::Kebab)
}

pub fn camel_case(s: &str) -> String {
    s.to_case(Case::Camel)
}

pub fn pascal_case(s: &str) -> String {
    s.to_case(Case::Pascal)
}

pub fn snake_case(s: &str) -> String {
    s.to_case(Case::Snake)
}

/// English pluralization covering the regular suffix rules
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();

    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }

    if let Some(stem) = word.strip_suffix('y') {
        let before_y = stem.chars().last();
        if matches!(before_y, Some(c) if !"aeiouAEIOU".contains(c)) {
            return format!("{}ies", stem);
        }
    }

    format!("{}s", word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("pet"), "pets");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("branch"), "branches");
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(kebab_case("PetOwner"), "pet-owner");
        assert_eq!(pascal_case("pet_owner"), "PetOwner");
        assert_eq!(camel_case("not_nil"), "notNil");
        assert_eq!(snake_case("ContainsFold"), "contains_fold");
    }
}
