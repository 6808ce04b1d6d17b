//! Turns a raw text line into `{prefix?, command, args, is_command}` (§4.2).
#![allow(dead_code)]

/// The result of parsing one raw inbound text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub raw: String,
    pub prefix: Option<String>,
    pub command: String,
    pub args: String,
    pub is_command: bool,
}

/// Stateless parser over the current set of known prefixes. The prefix set
/// changes whenever the catalog is rebuilt, so callers pass it in per call
/// rather than the parser owning it.
pub struct Parser;

impl Parser {
    /// Parse `raw` against the known prefixes `prefixes`, longest-first.
    ///
    /// Algorithm, in order:
    /// 1. If a prefix matches (`prefix` then an optional `:`, run of
    ///    whitespace, or nothing, then a `/command`), use it.
    /// 2. Else if the whole line starts with `/command`, use that with no
    ///    prefix.
    /// 3. Else the line is not a command at all.
    pub fn parse(raw: &str, prefixes: &[String]) -> ParsedCommand {
        let raw = raw.trim();

        if let Some(parsed) = Self::try_prefixed(raw, prefixes) {
            return parsed;
        }

        if let Some((command, args)) = Self::try_bare_command(raw) {
            return ParsedCommand {
                raw: raw.to_string(),
                prefix: None,
                command,
                args,
                is_command: true,
            };
        }

        ParsedCommand {
            raw: raw.to_string(),
            prefix: None,
            command: String::new(),
            args: raw.to_string(),
            is_command: false,
        }
    }

    /// Try every known prefix, longest first, so a prefix like `"cuteplus"`
    /// is tried before its shorter shadow `"cute"`.
    fn try_prefixed(raw: &str, prefixes: &[String]) -> Option<ParsedCommand> {
        let mut sorted: Vec<&String> = prefixes.iter().collect();
        sorted.sort_by_key(|p| std::cmp::Reverse(p.len()));

        for prefix in sorted {
            if let Some(rest) = raw.strip_prefix(prefix.as_str()) {
                // Accept `prefix:/cmd`, `prefix /cmd`, `prefix/cmd` interchangeably.
                let after_delim = rest
                    .strip_prefix(':')
                    .or_else(|| rest.strip_prefix(char::is_whitespace).map(str::trim_start))
                    .unwrap_or(rest);

                if let Some((command, args)) = Self::try_bare_command(after_delim) {
                    return Some(ParsedCommand {
                        raw: raw.to_string(),
                        prefix: Some(prefix.clone()),
                        command,
                        args,
                        is_command: true,
                    });
                }
            }
        }

        None
    }

    /// Split `/command rest-of-line` into `(command, trimmed-args)`.
    fn try_bare_command(text: &str) -> Option<(String, String)> {
        if !text.starts_with('/') {
            return None;
        }

        match text.split_once(char::is_whitespace) {
            Some((command, args)) if !command.is_empty() => {
                Some((command.to_string(), args.trim().to_string()))
            }
            Some(_) => None,
            None if !text.is_empty() => Some((text.to_string(), String::new())),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_bare_command_with_no_prefixes_known() {
        let parsed = Parser::parse("/chat hello world", &[]);
        assert_eq!(parsed.prefix, None);
        assert_eq!(parsed.command, "/chat");
        assert_eq!(parsed.args, "hello world");
        assert!(parsed.is_command);
    }

    #[test]
    fn non_command_text_is_not_a_command() {
        let parsed = Parser::parse("just chatting", &prefixes(&["萌"]));
        assert!(!parsed.is_command);
        assert_eq!(parsed.args, "just chatting");
    }

    #[test]
    fn colon_delimiter_is_accepted() {
        let parsed = Parser::parse("萌:/chat 你好", &prefixes(&["萌"]));
        assert_eq!(parsed.prefix.as_deref(), Some("萌"));
        assert_eq!(parsed.command, "/chat");
        assert_eq!(parsed.args, "你好");
    }

    #[test]
    fn space_delimiter_is_accepted() {
        let parsed = Parser::parse("萌 /chat 你好", &prefixes(&["萌"]));
        assert_eq!(parsed.prefix.as_deref(), Some("萌"));
        assert_eq!(parsed.command, "/chat");
    }

    #[test]
    fn no_delimiter_is_accepted() {
        let parsed = Parser::parse("萌/chat 你好", &prefixes(&["萌"]));
        assert_eq!(parsed.prefix.as_deref(), Some("萌"));
        assert_eq!(parsed.command, "/chat");
    }

    #[test]
    fn longest_prefix_wins_over_shadowing_shorter_one() {
        let parsed = Parser::parse("cuteplus:/chat hi", &prefixes(&["cute", "cuteplus"]));
        assert_eq!(parsed.prefix.as_deref(), Some("cuteplus"));
    }

    #[test]
    fn shorter_prefix_still_matches_when_longer_does_not_apply() {
        let parsed = Parser::parse("cute:/chat hi", &prefixes(&["cute", "cuteplus"]));
        assert_eq!(parsed.prefix.as_deref(), Some("cute"));
    }
}
