//! Parses one line of buffer input into a structured command (spec.md §4.3:
//! "User-entered input to a buffer is a line of text that is either plain...
//! a `/command`... interpreted locally, or expanded by the macro engine").
//! Parsing here is pure and synchronous; [`crate::engine::Engine`] decides
//! what each variant actually does.

use std::time::Duration;

/// One line of buffer input, already classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedInput {
    /// Plain text, sent as `PRIVMSG` to the buffer's own target.
    Text(String),
    /// A line to send to the wire unmodified (`/RAW`, `/QUOTE`, and the
    /// fallback for any unrecognized or malformed command).
    Raw(String),
    Open(String),
    Leave(Option<String>),
    Msg(String, String),
    Query(String),
    Me(String),
    Ignore(String),
    Unignore(String),
    /// `VERSION`/`CLIENTINFO`/`TIME`/`FINGER`/`SOURCE`/`USERINFO`, sent as a
    /// CTCP query to a target.
    CtcpQuery(String, String),
    Ctcp(String, String),
    Chat(String),
    Dns(String),
    Server(String),
    ShowPings(bool),
    AutoJoin(bool),
    AutoRejoinSet(bool),
    AutoRejoinQuery,
    All(String),
    Clear,
    Hide,
    Show,
    Delay(Duration, String),
    Echo(String),
    Xyzzy,
    FindUser(String),
    Timer {
        name: String,
        interval: Duration,
        repeat: Option<u32>,
        command: String,
    },
}

/// Classifies one line of input typed into a buffer. A leading `/` marks a
/// command; `//` escapes a literal slash so the rest is sent as plain text.
/// A recognized command name with the wrong shape of arguments, and any
/// unrecognized command name, falls through to [`ParsedInput::Raw`]
/// unchanged (spec.md §4.3: "unknown commands pass through to wire as-is").
pub fn parse(line: &str) -> ParsedInput {
    if let Some(rest) = line.strip_prefix("//") {
        return ParsedInput::Text(format!("/{rest}"));
    }
    let Some(rest) = line.strip_prefix('/') else {
        return ParsedInput::Text(line.to_owned());
    };
    let (name, args) = split_command(rest);
    let args = args.trim();
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "OPEN" => non_empty(args).map(|t| ParsedInput::Open(t.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "LEAVE" | "PART" => ParsedInput::Leave(non_empty(args).map(str::to_owned)),
        "MSG" | "SAY" => split_one(args)
            .map(|(t, m)| ParsedInput::Msg(t.to_owned(), m.to_owned()))
            .unwrap_or_else(|| passthrough(name, args)),
        "QUERY" => non_empty(args).map(|t| ParsedInput::Query(t.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "RAW" | "QUOTE" => ParsedInput::Raw(args.to_owned()),
        "ME" | "ACTION" | "EMOTE" => ParsedInput::Me(args.to_owned()),
        "IGNORE" => non_empty(args).map(|n| ParsedInput::Ignore(n.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "UNIGNORE" => non_empty(args).map(|n| ParsedInput::Unignore(n.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "VERSION" | "CLIENTINFO" | "TIME" | "FINGER" | "SOURCE" | "USERINFO" => non_empty(args)
            .map(|t| ParsedInput::CtcpQuery(t.to_owned(), upper.clone()))
            .unwrap_or_else(|| passthrough(name, args)),
        "SERVER" => non_empty(args).map(|s| ParsedInput::Server(s.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "CTCP" => split_one(args)
            .map(|(t, rest)| ParsedInput::Ctcp(t.to_owned(), rest.to_owned()))
            .unwrap_or_else(|| passthrough(name, args)),
        "CHAT" => non_empty(args).map(|n| ParsedInput::Chat(n.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "DNS" => non_empty(args).map(|h| ParsedInput::Dns(h.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "SHOWPINGS" => ParsedInput::ShowPings(true),
        "HIDEPINGS" => ParsedInput::ShowPings(false),
        "AUTOJOIN" => ParsedInput::AutoJoin(!args.eq_ignore_ascii_case("off")),
        "AUTOREJOIN" => match args.to_ascii_lowercase().as_str() {
            "on" => ParsedInput::AutoRejoinSet(true),
            "off" => ParsedInput::AutoRejoinSet(false),
            _ => ParsedInput::AutoRejoinQuery,
        },
        "ALL" => ParsedInput::All(args.to_owned()),
        "CLEAR" | "CLS" => ParsedInput::Clear,
        "HIDE" => ParsedInput::Hide,
        "SHOW" => ParsedInput::Show,
        "DELAY" => parse_delay(args).unwrap_or_else(|| passthrough(name, args)),
        "ECHO" => ParsedInput::Echo(args.to_owned()),
        "XYZZY" => ParsedInput::Xyzzy,
        "FINDUSER" => non_empty(args).map(|p| ParsedInput::FindUser(p.to_owned())).unwrap_or_else(|| passthrough(name, args)),
        "TIMER" => parse_timer(args).unwrap_or_else(|| passthrough(name, args)),
        _ => passthrough(name, args),
    }
}

/// Splits a `/COMMAND rest` line (without its leading slash) into the
/// command word and the remainder.
fn split_command(rest: &str) -> (&str, &str) {
    match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args),
        None => (rest, ""),
    }
}

/// Splits `args` into a first word and a non-empty remainder, for commands
/// shaped `TARGET rest of line`. `None` if either half is missing.
fn split_one(args: &str) -> Option<(&str, &str)> {
    let args = args.trim();
    let (first, rest) = args.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    if first.is_empty() || rest.is_empty() {
        return None;
    }
    Some((first, rest))
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn passthrough(name: &str, args: &str) -> ParsedInput {
    if args.is_empty() {
        ParsedInput::Raw(name.to_ascii_uppercase())
    } else {
        ParsedInput::Raw(format!("{} {args}", name.to_ascii_uppercase()))
    }
}

fn parse_delay(args: &str) -> Option<ParsedInput> {
    let (ms, command) = split_one(args)?;
    let ms: u64 = ms.parse().ok()?;
    Some(ParsedInput::Delay(Duration::from_millis(ms), command.to_owned()))
}

/// Parses `name=foo interval=500 [repeat=3] /command ...`: leading
/// `key=value` tokens are consumed in any order, and everything from the
/// first token that isn't one of them is taken verbatim as the command to
/// run on each firing.
fn parse_timer(args: &str) -> Option<ParsedInput> {
    let mut name = None;
    let mut interval = None;
    let mut repeat = None;
    let mut rest = args.trim();
    loop {
        let (token, remainder) = match rest.split_once(char::is_whitespace) {
            Some((t, r)) => (t, r.trim_start()),
            None => (rest, ""),
        };
        match token.split_once('=') {
            Some(("name", v)) if !v.is_empty() => {
                name = Some(v.to_owned());
                rest = remainder;
            }
            Some(("interval", v)) => {
                interval = Some(v.parse::<u64>().ok()?);
                rest = remainder;
            }
            Some(("repeat", v)) => {
                repeat = Some(v.parse::<u32>().ok()?);
                rest = remainder;
            }
            _ => break,
        }
        if rest.is_empty() {
            break;
        }
    }
    let name = name?;
    let interval = interval?;
    let command = non_empty(rest)?.to_owned();
    Some(ParsedInput::Timer { name, interval: Duration::from_millis(interval), repeat, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line_is_text() {
        assert_eq!(parse("hello there"), ParsedInput::Text("hello there".into()));
    }

    #[test]
    fn double_slash_escapes_to_literal_slash_text() {
        assert_eq!(parse("//help me"), ParsedInput::Text("/help me".into()));
    }

    #[test]
    fn msg_splits_target_and_body() {
        assert_eq!(parse("/msg bob hey there"), ParsedInput::Msg("bob".into(), "hey there".into()));
    }

    #[test]
    fn leave_without_argument_uses_current_buffer() {
        assert_eq!(parse("/leave"), ParsedInput::Leave(None));
        assert_eq!(parse("/part #rust"), ParsedInput::Leave(Some("#rust".into())));
    }

    #[test]
    fn me_keeps_the_whole_remainder() {
        assert_eq!(parse("/me waves hello"), ParsedInput::Me("waves hello".into()));
    }

    #[test]
    fn raw_and_quote_pass_through_verbatim() {
        assert_eq!(parse("/raw WHOIS bob"), ParsedInput::Raw("WHOIS bob".into()));
        assert_eq!(parse("/quote PING :x"), ParsedInput::Raw("PING :x".into()));
    }

    #[test]
    fn ctcp_query_commands_target_a_user() {
        assert_eq!(parse("/version bob"), ParsedInput::CtcpQuery("bob".into(), "VERSION".into()));
        assert_eq!(parse("/finger bob"), ParsedInput::CtcpQuery("bob".into(), "FINGER".into()));
    }

    #[test]
    fn ctcp_splits_target_and_verb() {
        assert_eq!(parse("/ctcp bob PING 12345"), ParsedInput::Ctcp("bob".into(), "PING 12345".into()));
    }

    #[test]
    fn showpings_and_hidepings_toggle() {
        assert_eq!(parse("/showpings"), ParsedInput::ShowPings(true));
        assert_eq!(parse("/hidepings"), ParsedInput::ShowPings(false));
    }

    #[test]
    fn autojoin_defaults_on_unless_off() {
        assert_eq!(parse("/autojoin"), ParsedInput::AutoJoin(true));
        assert_eq!(parse("/autojoin off"), ParsedInput::AutoJoin(false));
    }

    #[test]
    fn autorejoin_parses_on_off_and_query() {
        assert_eq!(parse("/autorejoin on"), ParsedInput::AutoRejoinSet(true));
        assert_eq!(parse("/autorejoin off"), ParsedInput::AutoRejoinSet(false));
        assert_eq!(parse("/autorejoin ?"), ParsedInput::AutoRejoinQuery);
    }

    #[test]
    fn delay_parses_milliseconds_and_command() {
        assert_eq!(parse("/delay 500 /me waves"), ParsedInput::Delay(Duration::from_millis(500), "/me waves".into()));
    }

    #[test]
    fn timer_parses_key_value_prefix_then_command() {
        assert_eq!(
            parse("/timer name=poke interval=1000 repeat=3 /me pokes"),
            ParsedInput::Timer {
                name: "poke".into(),
                interval: Duration::from_millis(1000),
                repeat: Some(3),
                command: "/me pokes".into(),
            }
        );
    }

    #[test]
    fn timer_without_repeat_fires_once() {
        assert_eq!(
            parse("/timer name=once interval=250 /echo done"),
            ParsedInput::Timer { name: "once".into(), interval: Duration::from_millis(250), repeat: None, command: "/echo done".into() }
        );
    }

    #[test]
    fn malformed_timer_falls_back_to_raw_passthrough() {
        assert_eq!(parse("/timer interval=not-a-number /echo done"), ParsedInput::Raw("TIMER interval=not-a-number /echo done".into()));
    }

    #[test]
    fn unknown_command_passes_through_to_wire() {
        assert_eq!(parse("/whois bob"), ParsedInput::Raw("WHOIS bob".into()));
        assert_eq!(parse("/mode #rust +o bob"), ParsedInput::Raw("MODE #rust +o bob".into()));
    }

    #[test]
    fn clear_hide_show_take_no_arguments() {
        assert_eq!(parse("/clear"), ParsedInput::Clear);
        assert_eq!(parse("/cls"), ParsedInput::Clear);
        assert_eq!(parse("/hide"), ParsedInput::Hide);
        assert_eq!(parse("/show"), ParsedInput::Show);
    }

    #[test]
    fn xyzzy_and_echo() {
        assert_eq!(parse("/xyzzy"), ParsedInput::Xyzzy);
        assert_eq!(parse("/echo hi there"), ParsedInput::Echo("hi there".into()));
    }
}
