//! Command input parsing: argument text and `-flag` tokens.

use regex::Regex;
use std::collections::HashMap;

/// Default flag prefix
pub const DEFAULT_FLAG_PREFIX: &str = "-";

/// How flags are recognised for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagOptions {
    /// Prefix that marks a flag token
    pub prefix: String,
    /// Drop the prefix from flag keys
    pub strip_prefix: bool,
}

impl Default for FlagOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_FLAG_PREFIX.to_string(),
            strip_prefix: false,
        }
    }
}

/// Input split into free text and flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInput {
    /// Input with flag tokens removed, single-space joined
    pub filtered: String,
    /// Flag key to numeric suffix (empty when absent)
    pub flags: HashMap<String, String>,
}

/// Returns the text after the command word.
///
/// Only text containing a space has arguments; the remainder after the first
/// whitespace run is trimmed.
///
/// # Examples
///
/// ```
/// use userbot::bot::flags::input_str;
///
/// assert_eq!(input_str("/sthumb  some  args "), "some  args");
/// assert_eq!(input_str("/sthumb"), "");
/// ```
#[must_use]
pub fn input_str(text: &str) -> &str {
    if !text.contains(' ') {
        return "";
    }
    text.trim_start()
        .split_once(char::is_whitespace)
        .map_or("", |(_, rest)| rest.trim())
}

/// Splits `input` into flags and remaining text.
///
/// A token is a flag when it is the prefix, lowercase ASCII letters and an
/// optional numeric suffix. The suffix becomes the flag's value.
///
/// # Examples
///
/// ```
/// use userbot::bot::flags::{parse_flags, FlagOptions};
///
/// let parsed = parse_flags("-d10 hello -v world", &FlagOptions::default());
/// assert_eq!(parsed.filtered, "hello world");
/// assert_eq!(parsed.flags["-d"], "10");
/// assert_eq!(parsed.flags["-v"], "");
/// ```
#[must_use]
pub fn parse_flags(input: &str, options: &FlagOptions) -> ParsedInput {
    let prefix = regex::escape(&options.prefix);
    // Escaped prefix keeps the pattern valid for any input
    let Ok(re) = Regex::new(&format!("^({prefix}[a-z]+)([0-9]+)?$")) else {
        return ParsedInput {
            filtered: input.trim().to_string(),
            flags: HashMap::new(),
        };
    };

    let mut parsed = ParsedInput::default();
    let mut rest: Vec<&str> = Vec::new();

    for token in input.split_whitespace() {
        if let Some(caps) = re.captures(token) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let key = if options.strip_prefix {
                name.strip_prefix(options.prefix.as_str()).unwrap_or(name)
            } else {
                name
            };
            let value = caps.get(2).map_or("", |m| m.as_str());
            parsed.flags.insert(key.to_string(), value.to_string());
        } else {
            rest.push(token);
        }
    }

    parsed.filtered = rest.join(" ");
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_str_requires_a_space() {
        assert_eq!(input_str("/cmd\nline"), "");
        assert_eq!(input_str("/cmd "), "");
        assert_eq!(input_str("/cmd a\nb"), "a\nb");
        assert_eq!(input_str("  /cmd   arg"), "arg");
    }

    #[test]
    fn test_flags_and_filtered_text() {
        let parsed = parse_flags("-l2 some text -x", &FlagOptions::default());
        assert_eq!(parsed.filtered, "some text");
        assert_eq!(parsed.flags.len(), 2);
        assert_eq!(parsed.flags["-l"], "2");
        assert_eq!(parsed.flags["-x"], "");
    }

    #[test]
    fn test_non_flag_tokens_are_kept() {
        // uppercase, trailing letters after digits and bare prefix are not flags
        let parsed = parse_flags("-A -a1b - -- text", &FlagOptions::default());
        assert!(parsed.flags.is_empty());
        assert_eq!(parsed.filtered, "-A -a1b - -- text");
    }

    #[test]
    fn test_strip_prefix() {
        let options = FlagOptions {
            prefix: "--".to_string(),
            strip_prefix: true,
        };
        let parsed = parse_flags("--all --n5 -x", &options);
        assert_eq!(parsed.flags["all"], "");
        assert_eq!(parsed.flags["n"], "5");
        assert_eq!(parsed.filtered, "-x");
    }

    #[test]
    fn test_regex_metachar_prefix() {
        let options = FlagOptions {
            prefix: ".".to_string(),
            strip_prefix: false,
        };
        let parsed = parse_flags(".f xf", &options);
        assert_eq!(parsed.flags.len(), 1);
        assert!(parsed.flags.contains_key(".f"));
        assert_eq!(parsed.filtered, "xf");
    }

    #[test]
    fn test_later_flag_wins() {
        let parsed = parse_flags("-n1 -n2", &FlagOptions::default());
        assert_eq!(parsed.flags["-n"], "2");
        assert_eq!(parsed.filtered, "");
    }
}
