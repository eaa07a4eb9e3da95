/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// True when `name` carries any decimal digit, e.g. a `.1` swap suffix or a
/// serial-suffixed sensor label.
pub fn has_digit(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_digit())
}
