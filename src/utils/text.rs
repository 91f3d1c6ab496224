// Small string helpers used while building prompts

/// Cut `s` to at most `max_chars` characters, marking the cut with "..."
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Render a list as "- item" lines, or `empty` when there is nothing to show
pub fn bullet_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(bullet_list(&[], "none"), "none");
        assert_eq!(bullet_list(&["a".to_string(), "b".to_string()], "none"), "- a\n- b");
    }
}
