// Built-in table themes
// The header button cycles through them in order.

pub const THEMES: [&str; 6] = ["lite", "dark", "solarized", "dracula", "monokai", "gruvbox"];

pub fn is_known(theme: &str) -> bool {
    THEMES.contains(&theme)
}

/// Next theme in the cycle; unknown themes restart at the first one
pub fn next_theme(current: &str) -> &'static str {
    match THEMES.iter().position(|t| *t == current) {
        Some(idx) => THEMES[(idx + 1) % THEMES.len()],
        None => THEMES[0],
    }
}

pub fn is_dark(theme: &str) -> bool {
    matches!(theme, "dark" | "dracula" | "monokai" | "gruvbox")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(next_theme("lite"), "dark");
        assert_eq!(next_theme("gruvbox"), "lite");
        assert_eq!(next_theme("custom"), "lite");
    }

    #[test]
    fn test_full_cycle_returns_home() {
        let mut theme = "solarized";
        for _ in 0..THEMES.len() {
            theme = next_theme(theme);
        }
        assert_eq!(theme, "solarized");
        assert!(is_known(theme));
        assert!(!is_dark("lite"));
    }
}
