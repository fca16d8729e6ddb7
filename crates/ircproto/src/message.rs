//! Wire message parsing, serialization, and classification.

use std::fmt;

use crate::command::Command;
use crate::ctcp;
use crate::error::{ParseError, Result};
use crate::prefix::Prefix;
use crate::response::Response;

/// The maximum number of bytes a single line may occupy on the wire,
/// including the trailing `\r\n`.
pub const MAX_LINE_BYTES: usize = 512;

/// How a message's command classified: a recognized textual command, an
/// unrecognized one (raw string kept verbatim), a recognized numeric, or an
/// unrecognized numeric. Mirrors spec.md §4.1's "UNKNOWN/RPL_UNKNOWN" fold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A recognized textual command.
    Known(Command),
    /// An unrecognized textual command, command name kept as-is.
    Unknown(String),
    /// A recognized 3-digit numeric reply.
    Numeric(Response),
    /// An unrecognized 3-digit numeric reply.
    UnknownNumeric(u16),
}

impl MessageKind {
    /// The wire command token: a command name or a zero-padded 3-digit code.
    pub fn raw_command(&self) -> String {
        match self {
            MessageKind::Known(cmd) => cmd.name().to_owned(),
            MessageKind::Unknown(name) => name.clone(),
            MessageKind::Numeric(r) => format!("{:03}", r.code()),
            MessageKind::UnknownNumeric(code) => format!("{:03}", code),
        }
    }

    /// Whether this message is a numeric reply (known or not).
    pub fn is_numeric(&self) -> bool {
        matches!(self, MessageKind::Numeric(_) | MessageKind::UnknownNumeric(_))
    }
}

/// A single parsed IRC protocol line: origin, command, and parameters.
///
/// `trailing` records whether the source line marked its last parameter with
/// a leading `:` (or, for an outgoing message built in memory, whether one
/// should be emitted). Preserving this bit rather than inferring it purely
/// from content is what makes `to_wire(parse(line)) == line` hold exactly
/// (spec.md §8 property 1), since a sender is free to colon-quote a
/// parameter that didn't strictly need it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<Prefix>,
    pub kind: MessageKind,
    pub params: Vec<String>,
    pub trailing: bool,
}

impl Message {
    /// Builds a message from a classified command and parameters, choosing
    /// `trailing` automatically: the last parameter is colon-quoted if it is
    /// empty, starts with `:`, or contains a space.
    pub fn new(prefix: Option<Prefix>, kind: MessageKind, params: Vec<String>) -> Message {
        let trailing = params
            .last()
            .is_some_and(|p| p.is_empty() || p.starts_with(':') || p.contains(' '));
        Message {
            prefix,
            kind,
            params,
            trailing,
        }
    }

    /// Builds a message from a known textual command, deriving its
    /// parameters from the command's own fields.
    pub fn from_command(prefix: Option<Prefix>, command: Command) -> Message {
        let params = command.params();
        Message::new(prefix, MessageKind::Known(command), params)
    }

    /// Parses the origin prefix and command token off the front of a line,
    /// returning the command token and the remainder of the line (params,
    /// not yet split).
    ///
    /// `line` must already have trailing `\r\n`/`\n` stripped.
    pub fn parse_command(line: &str) -> Result<(Option<Prefix>, String, &str)> {
        let line = line.trim_end();
        if line.is_empty() {
            return Err(ParseError::Empty.into());
        }

        let (prefix, rest) = if let Some(stripped) = line.strip_prefix(':') {
            match stripped.find(' ') {
                Some(idx) => (Some(Prefix::parse(&stripped[..idx])), stripped[idx + 1..].trim_start_matches(' ')),
                None => return Err(ParseError::MissingCommand.into()),
            }
        } else {
            (None, line)
        };

        let (command, params_rest) = match rest.find(' ') {
            Some(idx) => (&rest[..idx], rest[idx + 1..].trim_start_matches(' ')),
            None => (rest, ""),
        };
        if command.is_empty() {
            return Err(ParseError::MissingCommand.into());
        }

        Ok((prefix, command.to_owned(), params_rest))
    }

    /// Splits the parameter portion of a line (as returned by
    /// [`Message::parse_command`]) into individual parameters, honoring the
    /// trailing `:`-prefixed parameter rule.
    pub fn parse_parameters(rest: &str) -> (Vec<String>, bool) {
        if rest.is_empty() {
            return (Vec::new(), false);
        }
        let mut params = Vec::new();
        let mut remaining = rest;
        loop {
            if let Some(stripped) = remaining.strip_prefix(':') {
                params.push(stripped.to_owned());
                return (params, true);
            }
            match remaining.find(' ') {
                Some(idx) => {
                    params.push(remaining[..idx].to_owned());
                    remaining = remaining[idx + 1..].trim_start_matches(' ');
                    if remaining.is_empty() {
                        return (params, false);
                    }
                }
                None => {
                    params.push(remaining.to_owned());
                    return (params, false);
                }
            }
        }
    }

    /// Parses a full wire line into a `Message`.
    pub fn parse(line: &str) -> Result<Message> {
        let (prefix, command_token, rest) = Message::parse_command(line)?;
        let (params, trailing) = Message::parse_parameters(rest);
        let kind = classify(&command_token, &params);
        Ok(Message {
            prefix,
            kind,
            params,
            trailing,
        })
    }

    /// Parses a line recovered from a scrollback log: same grammar as
    /// [`Message::parse`], but tolerant of a missing/partial CRLF since
    /// on-disk logs are newline-terminated, not CRLF-terminated.
    pub fn parse_log(line: &str) -> Result<Message> {
        Message::parse(line.trim_end_matches(['\r', '\n']))
    }

    /// The target of a numeric reply, i.e. its first parameter (conventionally
    /// the client's own nickname or `*` before registration completes).
    pub fn numeric_target(&self) -> Option<&str> {
        if self.kind.is_numeric() {
            self.params.first().map(String::as_str)
        } else {
            None
        }
    }

    /// The "body" parameter for this message, per spec.md §4.1's content-param
    /// table (e.g. index 1 for `PRIVMSG`/`NOTICE`, index 2 for `KICK`).
    pub fn content(&self) -> Option<&str> {
        let index = match &self.kind {
            MessageKind::Known(cmd) => cmd.content_param_index(),
            MessageKind::Numeric(Response::RPL_TOPIC) | MessageKind::Numeric(Response::RPL_AWAY) => Some(1),
            MessageKind::Numeric(Response::RPL_LIST) => Some(2),
            MessageKind::Numeric(Response::RPL_WHOISUSER) => Some(4),
            _ => None,
        }?;
        self.params.get(index).map(String::as_str)
    }

    /// Whether this message's content is CTCP-framed.
    pub fn is_ctcp(&self) -> bool {
        self.content().is_some_and(ctcp::is_ctcp)
    }

    /// Re-serializes this message to its wire form, including the trailing
    /// `\r\n`. `self_prefix`, when given, is emitted as a leading `:prefix `
    /// even if `self.prefix` is `None` (used by an outgoing client that wants
    /// to tag its own messages, e.g. when echoing to a local log).
    pub fn to_wire(&self) -> Result<String> {
        let mut out = String::new();
        if let Some(prefix) = &self.prefix {
            out.push(':');
            out.push_str(&prefix.to_string());
            out.push(' ');
        }
        out.push_str(&self.kind.raw_command());

        let n = self.params.len();
        for (i, param) in self.params.iter().enumerate() {
            out.push(' ');
            if i + 1 == n && self.trailing {
                out.push(':');
            }
            out.push_str(param);
        }
        out.push_str("\r\n");

        if out.len() > MAX_LINE_BYTES {
            // Still returned: splitting is the caller's responsibility (see
            // `split_privmsg`), since only some commands have a splittable
            // content parameter.
        }
        Ok(out)
    }
}

fn classify(command_token: &str, params: &[String]) -> MessageKind {
    if command_token.len() == 3 && command_token.bytes().all(|b| b.is_ascii_digit()) {
        let code: u16 = command_token.parse().unwrap_or(0);
        return match Response::from_u16(code) {
            Some(r) => MessageKind::Numeric(r),
            None => MessageKind::UnknownNumeric(code),
        };
    }
    match Command::from_wire(command_token, params) {
        Command::Unknown(name, _) => MessageKind::Unknown(name),
        known => MessageKind::Known(known),
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire().unwrap_or_default().trim_end())
    }
}

/// Splits an outgoing `PRIVMSG`/`NOTICE` body so each resulting wire line
/// stays within [`MAX_LINE_BYTES`], never cutting a UTF-8 continuation byte.
/// `prefix_len` is the number of bytes the command/target/origin portion of
/// the line will occupy (everything but the trailing `:body\r\n`).
pub fn split_content(body: &str, prefix_len: usize) -> Vec<String> {
    // ':' + CRLF = 3 bytes of fixed overhead around the content itself.
    let budget = MAX_LINE_BYTES.saturating_sub(prefix_len + 3);
    if budget == 0 || body.len() <= budget {
        return vec![body.to_owned()];
    }

    let mut chunks = Vec::new();
    let bytes = body.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = std::cmp::min(start + budget, bytes.len());
        while end > start && !body.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push(body[start..end].to_owned());
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_privmsg() {
        let line = "PRIVMSG #chan :hello there\r\n";
        let msg = Message::parse(line).unwrap();
        assert_eq!(msg.to_wire().unwrap(), line);
    }

    #[test]
    fn round_trips_with_prefix() {
        let line = ":alice!u@h PRIVMSG #chan :hi\r\n";
        let msg = Message::parse(line).unwrap();
        assert_eq!(msg.prefix, Some(Prefix::parse("alice!u@h")));
        assert_eq!(msg.to_wire().unwrap(), line);
    }

    #[test]
    fn classifies_known_numeric() {
        let msg = Message::parse(":srv 433 * alice :Nickname is already in use\r\n").unwrap();
        assert_eq!(msg.kind, MessageKind::Numeric(Response::ERR_NICKNAMEINUSE));
        assert_eq!(msg.numeric_target(), Some("*"));
    }

    #[test]
    fn classifies_unknown_numeric() {
        let msg = Message::parse(":srv 999 alice :mystery\r\n").unwrap();
        assert_eq!(msg.kind, MessageKind::UnknownNumeric(999));
    }

    #[test]
    fn classifies_unknown_text_command() {
        let msg = Message::parse("FOOBAR a b\r\n").unwrap();
        assert_eq!(msg.kind, MessageKind::Unknown("FOOBAR".into()));
    }

    #[test]
    fn empty_line_is_an_error() {
        assert!(Message::parse("\r\n").is_err());
        assert!(Message::parse("").is_err());
    }

    #[test]
    fn privmsg_content_is_ctcp_framed() {
        let msg = Message::parse("PRIVMSG #c :\x01VERSION\x01\r\n").unwrap();
        assert!(msg.is_ctcp());
    }

    #[test]
    fn splits_long_content_without_cutting_utf8() {
        let body: String = std::iter::repeat('é').take(400).collect();
        let chunks = split_content(&body, "PRIVMSG #channel ".len());
        assert!(chunks.len() > 1);
        let joined: String = chunks.concat();
        assert_eq!(joined, body);
        for chunk in &chunks {
            assert!(chunk.len() + "PRIVMSG #channel ".len() + 3 <= MAX_LINE_BYTES);
        }
    }

    #[test]
    fn short_content_is_not_split() {
        assert_eq!(split_content("hi", 20), vec!["hi".to_string()]);
    }
}
