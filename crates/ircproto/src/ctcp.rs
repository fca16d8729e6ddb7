//! CTCP framing: a body wrapped in `\x01` delimiters, as carried inside a
//! `PRIVMSG`/`NOTICE` text parameter. Grounded on spec.md §6 ("CTCP: body
//! framed by `\x01CMD [args]\x01`"); `ACTION` is the one CTCP command the
//! engine treats specially (as a "me" emote) rather than a plain query.

const DELIM: char = '\x01';

/// A CTCP request or reply split out of a message body: the verb (first
/// word, upper-cased on the wire but returned as-is here) and the remaining
/// argument text, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp {
    pub command: String,
    pub args: Option<String>,
}

impl Ctcp {
    /// Wraps a command and optional arguments into a `\x01`-delimited body.
    pub fn encode(command: &str, args: Option<&str>) -> String {
        match args {
            Some(args) if !args.is_empty() => format!("{DELIM}{command} {args}{DELIM}"),
            _ => format!("{DELIM}{command}{DELIM}"),
        }
    }

    /// The conventional `ACTION` emote body, e.g. `/me waves` becomes
    /// `\x01ACTION waves\x01`.
    pub fn encode_action(text: &str) -> String {
        Ctcp::encode("ACTION", Some(text))
    }
}

/// Returns `true` if `body` is framed as a CTCP message (starts and ends
/// with `\x01` and has at least one byte of payload in between).
pub fn is_ctcp(body: &str) -> bool {
    let mut chars = body.chars();
    chars.next() == Some(DELIM) && body.len() > 1 && body.ends_with(DELIM)
}

/// Unwraps a CTCP-framed body into its command and argument text. Returns
/// `None` if `body` is not CTCP-framed per [`is_ctcp`].
pub fn decode(body: &str) -> Option<Ctcp> {
    if !is_ctcp(body) {
        return None;
    }
    let inner = &body[DELIM.len_utf8()..body.len() - DELIM.len_utf8()];
    match inner.split_once(' ') {
        Some((command, args)) => Some(Ctcp {
            command: command.to_owned(),
            args: Some(args.to_owned()),
        }),
        None => Some(Ctcp {
            command: inner.to_owned(),
            args: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_round_trip() {
        let wire = Ctcp::encode("VERSION", None);
        assert_eq!(wire, "\x01VERSION\x01");
        assert_eq!(
            decode(&wire),
            Some(Ctcp {
                command: "VERSION".into(),
                args: None
            })
        );
    }

    #[test]
    fn encodes_action_with_args() {
        let wire = Ctcp::encode_action("waves hello");
        assert_eq!(wire, "\x01ACTION waves hello\x01");
        let parsed = decode(&wire).unwrap();
        assert_eq!(parsed.command, "ACTION");
        assert_eq!(parsed.args.as_deref(), Some("waves hello"));
    }

    #[test]
    fn plain_text_is_not_ctcp() {
        assert!(!is_ctcp("hello there"));
        assert_eq!(decode("hello there"), None);
    }
}
