/// Case-folded identity of an entity. Two mentions with equal keys are the
/// same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub name: String,
    pub entity_type: String,
}

impl EntityKey {
    pub fn new(name: &str, entity_type: &str) -> Self {
        Self {
            name: normalize_name(name),
            entity_type: entity_type.to_lowercase(),
        }
    }
}

/// Trim and lowercase a name for comparison.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Capitalize the first letter of every word, lowercase the rest.
///
/// A word starts at any letter that follows a non-letter, so
/// `"o'neil & co"` becomes `"O'Neil & Co"` and `"3m"` becomes `"3M"`.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_word = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(c);
            in_word = false;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalization() {
        assert_eq!(EntityKey::new("  Tesla ", "Company"), EntityKey::new("TESLA", "company"));
        assert_ne!(EntityKey::new("Tesla", "Company"), EntityKey::new("Tesla", "Person"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("tesla"), "Tesla");
        assert_eq!(title_case("beta inc"), "Beta Inc");
        assert_eq!(title_case("o'neil & co"), "O'Neil & Co");
        assert_eq!(title_case("3m company"), "3M Company");
        assert_eq!(title_case("jean-luc PICARD"), "Jean-Luc Picard");
    }
}
