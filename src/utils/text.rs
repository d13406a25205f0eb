//! Text processing utilities.

/// Check if a chunk carries any actual text (not just whitespace).
pub fn has_meaningful_content(content: &str) -> bool {
    content.chars().any(|c| !c.is_whitespace())
}

/// The trailing `overlap` characters of a chunk, carried into the next chunk
/// for continuity across a boundary.
pub fn trailing_overlap(content: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = content.chars().collect();
    let start = chars.len().saturating_sub(overlap);
    chars[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meaningful_content() {
        assert!(!has_meaningful_content(""));
        assert!(!has_meaningful_content("   \n\n   "));
        assert!(has_meaningful_content("a"));
        assert!(has_meaningful_content("  note text  "));
    }

    #[test]
    fn overlap_tail() {
        assert_eq!(trailing_overlap("abcdef", 3), "def");
        assert_eq!(trailing_overlap("ab", 5), "ab");
        assert_eq!(trailing_overlap("abcdef", 0), "");
    }
}
