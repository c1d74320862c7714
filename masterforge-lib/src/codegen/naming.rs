use convert_case::{Case, Casing};

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false", "fn", "for", "gen",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "priv", "pub", "ref", "return", "static", "struct", "trait",
    "true", "try", "type", "unsafe", "use", "where", "while", "yield",
];

#[must_use]
pub fn snake_name(name: &str) -> String {
    name.to_case(Case::Snake)
}

#[must_use]
pub fn pascal_name(name: &str) -> String {
    name.to_case(Case::Pascal)
}

/// A field identifier, escaped when it collides with a keyword.
#[must_use]
pub fn rust_field_ident(field: &str) -> String {
    let ident = snake_name(field);
    if RUST_KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else {
        ident
    }
}

/// Picks the schema subdirectory for a type: the longest existing directory whose
/// name prefixes the snake-cased type name on a `_` boundary, else the first
/// segment of that name.
#[must_use]
pub fn infer_subdir(snake: &str, existing: &[String]) -> String {
    existing
        .iter()
        .filter(|dir| snake == dir.as_str() || snake.strip_prefix(dir.as_str()).is_some_and(|rest| rest.starts_with('_')))
        .max_by_key(|dir| dir.len())
        .cloned()
        .unwrap_or_else(|| snake.split('_').next().unwrap_or(snake).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversion() {
        assert_eq!(snake_name("QuestReward"), "quest_reward");
        assert_eq!(pascal_name("drop_weight"), "DropWeight");
        assert_eq!(rust_field_ident("type"), "r#type");
        assert_eq!(rust_field_ident("DisplayName"), "display_name");
    }

    #[test]
    fn test_infer_subdir_prefers_longest_match() {
        let existing = vec!["quest".to_string(), "quest_reward".to_string(), "item".to_string()];
        assert_eq!(infer_subdir("quest_reward_bonus", &existing), "quest_reward");
        assert_eq!(infer_subdir("quest_chain", &existing), "quest");
        assert_eq!(infer_subdir("item", &existing), "item");
    }

    #[test]
    fn test_infer_subdir_requires_segment_boundary() {
        let existing = vec!["quest".to_string()];
        assert_eq!(infer_subdir("questline_step", &existing), "questline");
    }

    #[test]
    fn test_infer_subdir_falls_back_to_first_segment() {
        assert_eq!(infer_subdir("shop_item", &[]), "shop");
        assert_eq!(infer_subdir("single", &[]), "single");
    }
}
