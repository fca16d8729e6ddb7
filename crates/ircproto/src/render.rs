//! Nice-form rendering: turning a message into human-readable text via
//! `%CODE%` template substitution, with output spans for rich-text display.

use std::collections::HashMap;

/// What kind of entity a rendered span refers to, so a UI can style or link
/// it (e.g. underline a `Channel` span, make a `NickName` span clickable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    NickName,
    Channel,
    Url,
}

/// A byte range of the rendered output tagged with a [`SpanKind`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

/// What a `%CODE%` substitutes to: its replacement text, and optionally the
/// span kind to tag that replacement with in the output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    pub kind: Option<SpanKind>,
}

impl Substitution {
    pub fn plain(text: impl Into<String>) -> Substitution {
        Substitution {
            text: text.into(),
            kind: None,
        }
    }

    pub fn spanned(text: impl Into<String>, kind: SpanKind) -> Substitution {
        Substitution {
            text: text.into(),
            kind: Some(kind),
        }
    }
}

/// Expands a template against a code table, returning the rendered text and
/// the spans any tagged substitution produced.
///
/// Grammar: `%%` is a literal `%`. `%CODE%` substitutes the code's text (an
/// unrecognized code is emitted literally, delimiters and all). `%?CODE% …
/// %?%` is an optional block: it expands (recursively) only when `CODE`
/// resolves to non-empty text, and is dropped (delimiters and inner text)
/// otherwise.
pub fn render(template: &str, codes: &HashMap<&str, Substitution>) -> (String, Vec<Span>) {
    let mut out = String::new();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < template.len() {
        let rest = &template[i..];

        if let Some(block_rest) = rest.strip_prefix("%?") {
            if let Some((code, after_code)) = block_rest.split_once('%') {
                if let Some(end) = after_code.find("%?%") {
                    let inner = &after_code[..end];
                    let expand = codes.get(code).is_some_and(|s| !s.text.is_empty());
                    if expand {
                        let (inner_text, inner_spans) = render(inner, codes);
                        let shift = out.len();
                        spans.extend(inner_spans.into_iter().map(|s| Span {
                            start: s.start + shift,
                            end: s.end + shift,
                            kind: s.kind,
                        }));
                        out.push_str(&inner_text);
                    }
                    i += 2 + code.len() + 1 + end + 3;
                    continue;
                }
            }
            out.push('%');
            i += 1;
            continue;
        }

        if rest.starts_with("%%") {
            out.push('%');
            i += 2;
            continue;
        }

        if rest.starts_with('%') {
            if let Some((code, _)) = rest[1..].split_once('%') {
                if let Some(sub) = codes.get(code) {
                    let start = out.len();
                    out.push_str(&sub.text);
                    if let Some(kind) = sub.kind {
                        spans.push(Span {
                            start,
                            end: out.len(),
                            kind,
                        });
                    }
                    i += 1 + code.len() + 1;
                    continue;
                }
            }
            out.push('%');
            i += 1;
            continue;
        }

        let ch = rest.chars().next().expect("rest is non-empty");
        out.push(ch);
        i += ch.len_utf8();
    }

    (out, spans)
}

/// Prepends a timestamp to already-rendered text, shifting any spans by the
/// timestamp's byte length. `column` mode separates the timestamp from the
/// body with a tab instead of embedding it per the template's own formatting.
pub fn prepend_timestamp(text: &str, timestamp: &str, column: bool, spans: &mut [Span]) -> String {
    let separator = if column { "\t" } else { "" };
    let prefix_len = timestamp.len() + separator.len();
    for span in spans.iter_mut() {
        span.start += prefix_len;
        span.end += prefix_len;
    }
    format!("{timestamp}{separator}{text}")
}

/// The ordinal suffix for a day-of-month number (`1` -> `"st"`, `2` ->
/// `"nd"`, `11`..`13` -> `"th"`, etc). Teeth-cutting detail: the source this
/// engine's timestamp formatting is modeled on built this string with `ret +
/// "nd"` (a no-op expression result, discarded) instead of `ret += "nd"` for
/// one branch; this implementation uses the evidently-intended `+=` behavior.
pub fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(pairs: &[(&'static str, Substitution)]) -> HashMap<&'static str, Substitution> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn substitutes_plain_code() {
        let c = codes(&[("N", Substitution::spanned("alice", SpanKind::NickName))]);
        let (text, spans) = render("%N% joined", &c);
        assert_eq!(text, "alice joined");
        assert_eq!(spans, vec![Span { start: 0, end: 5, kind: SpanKind::NickName }]);
    }

    #[test]
    fn escaped_percent_is_literal() {
        let c = HashMap::new();
        let (text, spans) = render("100%% done", &c);
        assert_eq!(text, "100% done");
        assert!(spans.is_empty());
    }

    #[test]
    fn unknown_code_passes_through() {
        let c = HashMap::new();
        let (text, _) = render("%MYSTERY%", &c);
        assert_eq!(text, "%MYSTERY%");
    }

    #[test]
    fn optional_block_expands_when_code_present() {
        let c = codes(&[("FN", Substitution::plain("Alice Example"))]);
        let (text, _) = render("%U%@%H%%?FN% (%FN%)%?%", &{
            let mut m = c;
            m.insert("U", Substitution::plain("u"));
            m.insert("H", Substitution::plain("h"));
            m
        });
        assert_eq!(text, "u@h (Alice Example)");
    }

    #[test]
    fn optional_block_drops_when_code_empty() {
        let c = codes(&[("U", Substitution::plain("u")), ("H", Substitution::plain("h"))]);
        let (text, _) = render("%U%@%H%%?FN% (%FN%)%?%", &c);
        assert_eq!(text, "u@h");
    }

    #[test]
    fn span_shifts_when_prefixed_by_earlier_substitution() {
        let c = codes(&[
            ("N", Substitution::spanned("bob", SpanKind::NickName)),
            ("C", Substitution::spanned("#chan", SpanKind::Channel)),
        ]);
        let (text, spans) = render("%N% parted %C%", &c);
        assert_eq!(text, "bob parted #chan");
        assert_eq!(spans[1], Span { start: 11, end: 16, kind: SpanKind::Channel });
    }

    #[test]
    fn timestamp_prefix_shifts_spans() {
        let mut spans = vec![Span { start: 0, end: 3, kind: SpanKind::NickName }];
        let out = prepend_timestamp("bob: hi", "[12:00]", false, &mut spans);
        assert_eq!(out, "[12:00]bob: hi");
        assert_eq!(spans[0], Span { start: 7, end: 10, kind: SpanKind::NickName });
    }

    #[test]
    fn ordinal_suffix_handles_teens_exception() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(22), "nd");
    }
}
