pub use anstream::println as aprintln;

use dialoguer::Confirm;

/// Tokyo Night color palette
#[allow(dead_code)]
pub mod colors {
    pub const RESET: &str = "\x1b[0m";

    pub const TKN_RED: &str = "\x1b[38;2;247;118;142m"; // #f7768e
    pub const TKN_GREEN: &str = "\x1b[38;2;158;206;106m"; // #9ece6a
    pub const TKN_YELLOW: &str = "\x1b[38;2;224;175;104m"; // #e0af68
    pub const TKN_BLUE: &str = "\x1b[38;2;122;162;247m"; // #7aa2f7
    pub const TKN_CYAN: &str = "\x1b[38;2;125;207;255m"; // #7dcfff
}

fn paint(color: &str, text: &str) -> String {
    format!("{}{}{}", color, text, colors::RESET)
}

pub fn p_g(text: &str) -> String {
    paint(colors::TKN_GREEN, text)
}

pub fn p_r(text: &str) -> String {
    paint(colors::TKN_RED, text)
}

pub fn p_y(text: &str) -> String {
    paint(colors::TKN_YELLOW, text)
}

pub fn p_b(text: &str) -> String {
    paint(colors::TKN_BLUE, text)
}

pub fn p_c(text: &str) -> String {
    paint(colors::TKN_CYAN, text)
}

/// Asks the user to confirm an action. `force` skips the prompt.
///
/// Returns `Ok(false)` when the user declines.
pub fn confirm(prompt: &str, default: bool, force: bool) -> Result<bool, dialoguer::Error> {
    if force {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
}

/// Renders an optional value, or `-` when it is missing.
pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_wraps_in_reset() {
        let text = p_g("ok");
        assert!(text.starts_with(colors::TKN_GREEN));
        assert!(text.ends_with(colors::RESET));
        assert!(text.contains("ok"));
    }

    #[test]
    fn test_confirm_forced() {
        assert!(confirm("Delete everything?", false, true).unwrap());
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("t2.micro")), "t2.micro");
    }
}
