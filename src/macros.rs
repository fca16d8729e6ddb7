//! The macro engine: `%CODE%` script expansion with recursive re-submission
//! (spec.md §4.6).

use std::collections::HashMap;

use ircproto::User;

/// One user-defined macro: `/name args` looks this up by name.
#[derive(Clone, Debug)]
pub struct Macro {
    pub name: String,
    pub description: String,
    pub script: String,
    pub enabled: bool,
    pub user_menu: bool,
}

/// The registry of macros, keyed by name (including the leading `/`).
#[derive(Clone, Debug, Default)]
pub struct MacroSet {
    macros: HashMap<String, Macro>,
}

impl MacroSet {
    pub fn insert(&mut self, macro_def: Macro) {
        self.macros.insert(macro_def.name.clone(), macro_def);
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Macro> {
        self.macros.remove(name)
    }
}

/// Errors reported to the host's GUI observer during expansion (spec.md
/// §4.6: "OK, SYNTAX_ERROR, INSUFFICIENT_PARAMETERS, NOT_FOUND, TOO_DEEP").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacroError {
    SyntaxError,
    InsufficientParameters,
    NotFound,
    TooDeep,
}

/// How many nested `/macro`-within-`/macro` expansions are allowed before
/// erroring with [`MacroError::TooDeep`] (spec.md §4.6: "depth capped at
/// 10").
pub const MAX_RECURSION_DEPTH: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    Index(usize),
    OpenRange(usize),
    ClosedRange(usize),
    Full,
    Range(usize, usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Function {
    BanMask,
    Ip,
    Who,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum CodeBody {
    CurrentBuffer,
    Param(Slot),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Code {
    body: CodeBody,
    function: Option<Function>,
}

fn parse_code(raw: &str) -> Result<Code, MacroError> {
    let (base, func) = match raw.split_once(':') {
        Some((base, func)) => (base, Some(func)),
        None => (raw, None),
    };
    let function = match func {
        None => None,
        Some("banmask") => Some(Function::BanMask),
        Some("ip") => Some(Function::Ip),
        Some("id") | Some("who") => Some(Function::Who),
        Some(_) => return Err(MacroError::SyntaxError),
    };
    if base == "C" {
        return Ok(Code { body: CodeBody::CurrentBuffer, function });
    }
    let slot = parse_slot(base)?;
    Ok(Code { body: CodeBody::Param(slot), function })
}

fn parse_slot(base: &str) -> Result<Slot, MacroError> {
    if base == ".." {
        return Ok(Slot::Full);
    }
    if let Some(rest) = base.strip_suffix("..") {
        return rest.parse().map(Slot::OpenRange).map_err(|_| MacroError::SyntaxError);
    }
    if let Some(rest) = base.strip_prefix("..") {
        return rest.parse().map(Slot::ClosedRange).map_err(|_| MacroError::SyntaxError);
    }
    if let Some((n, m)) = base.split_once("..") {
        let n: usize = n.parse().map_err(|_| MacroError::SyntaxError)?;
        let m: usize = m.parse().map_err(|_| MacroError::SyntaxError)?;
        return Ok(Slot::Range(n, m));
    }
    base.parse().map(Slot::Index).map_err(|_| MacroError::SyntaxError)
}

/// The inputs a macro script expands against: the tokenized input (slot 0 is
/// the whole input minus the command, per spec.md §4.6), the current
/// buffer's display name, and the lookups `:banmask`/`:ip`/`:id`/`:who`
/// resolve against (spec.md §4.6 function suffixes).
pub struct ExpansionContext<'a> {
    pub params: Vec<String>,
    pub current_buffer: &'a str,
    pub resolve_user: &'a dyn Fn(&str) -> Option<User>,
    pub resolve_ip: &'a dyn Fn(&str) -> Option<String>,
}

impl<'a> ExpansionContext<'a> {
    fn slot_values(&self, slot: &Slot) -> Result<Vec<&str>, MacroError> {
        let words = &self.params;
        let get = |i: usize| words.get(i).map(String::as_str);
        match slot {
            Slot::Index(0) => Ok(vec![get(0).unwrap_or("")]),
            Slot::Index(n) => get(*n).map(|s| vec![s]).ok_or(MacroError::InsufficientParameters),
            Slot::Full => Ok(words.iter().skip(1).map(String::as_str).collect()),
            Slot::OpenRange(n) => {
                if words.len() <= *n {
                    return Err(MacroError::InsufficientParameters);
                }
                Ok(words[*n..].iter().map(String::as_str).collect())
            }
            Slot::ClosedRange(n) => {
                if words.len() <= *n {
                    return Err(MacroError::InsufficientParameters);
                }
                Ok(words[1..=*n].iter().map(String::as_str).collect())
            }
            Slot::Range(n, m) => {
                if words.len() <= *m || n > m {
                    return Err(MacroError::InsufficientParameters);
                }
                Ok(words[*n..=*m].iter().map(String::as_str).collect())
            }
        }
    }

    fn apply_function(&self, function: Function, value: &str) -> Result<String, MacroError> {
        match function {
            Function::BanMask => {
                let user = (self.resolve_user)(value).ok_or(MacroError::NotFound)?;
                Ok(user.ban_mask())
            }
            Function::Who => {
                let user = (self.resolve_user)(value).ok_or(MacroError::NotFound)?;
                Ok(user.full_mask())
            }
            Function::Ip => (self.resolve_ip)(value).ok_or(MacroError::NotFound),
        }
    }

    fn resolve(&self, code: &Code) -> Result<String, MacroError> {
        if let CodeBody::CurrentBuffer = code.body {
            return match code.function {
                None => Ok(self.current_buffer.to_owned()),
                Some(f) => self.apply_function(f, self.current_buffer),
            };
        }
        let CodeBody::Param(slot) = &code.body else { unreachable!() };
        let values = self.slot_values(slot)?;
        match code.function {
            None => Ok(values.join(" ")),
            Some(f) => {
                let resolved: Result<Vec<String>, MacroError> = values.iter().map(|v| self.apply_function(f, v)).collect();
                Ok(resolved?.join(" "))
            }
        }
    }
}

/// Expands one script line's `%CODE%` tokens against `context`. `%%` is a
/// literal `%` (spec.md §4.6).
pub fn expand_line(line: &str, context: &ExpansionContext) -> Result<String, MacroError> {
    let mut out = String::new();
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            let ch = line[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }
        if line[i + 1..].starts_with('%') {
            out.push('%');
            i += 2;
            continue;
        }
        let rest = &line[i + 1..];
        let end = rest.find('%').ok_or(MacroError::SyntaxError)?;
        let raw_code = &rest[..end];
        let code = parse_code(raw_code)?;
        out.push_str(&context.resolve(&code)?);
        i += 1 + end + 1;
    }
    Ok(out)
}

/// Splits a macro's CRLF-separated script into lines.
pub fn script_lines(script: &str) -> Vec<&str> {
    script.split("\r\n").filter(|l| !l.is_empty()).collect()
}

/// Expands every line of a macro's script, erroring with [`MacroError::TooDeep`]
/// before expanding anything if `depth` has already reached
/// [`MAX_RECURSION_DEPTH`] (spec.md §4.6: "recursive; depth capped at 10,
/// error reported on overflow"). The caller is responsible for re-submitting
/// each returned line as new buffer input and incrementing `depth` if that
/// line is itself a macro invocation.
pub fn expand_macro(macro_def: &Macro, context: &ExpansionContext, depth: usize) -> Result<Vec<String>, MacroError> {
    if depth >= MAX_RECURSION_DEPTH {
        return Err(MacroError::TooDeep);
    }
    script_lines(&macro_def.script).into_iter().map(|line| expand_line(line, context)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircproto::CaseMapping;

    fn context<'a>(params: Vec<&str>, buffer: &'a str, resolve_user: &'a dyn Fn(&str) -> Option<User>, resolve_ip: &'a dyn Fn(&str) -> Option<String>) -> ExpansionContext<'a> {
        ExpansionContext {
            params: params.into_iter().map(String::from).collect(),
            current_buffer: buffer,
            resolve_user,
            resolve_ip,
        }
    }

    #[test]
    fn expands_numbered_slot_and_current_buffer() {
        let no_user = |_: &str| None;
        let no_ip = |_: &str| None;
        let ctx = context(vec!["kick bob spam", "bob", "spam"], "#rust", &no_user, &no_ip);
        assert_eq!(expand_line("KICK %C% %1% :%2%", &ctx).unwrap(), "KICK #rust bob :spam");
    }

    #[test]
    fn literal_percent_escape() {
        let no_user = |_: &str| None;
        let no_ip = |_: &str| None;
        let ctx = context(vec!["x"], "#c", &no_user, &no_ip);
        assert_eq!(expand_line("100%% done", &ctx).unwrap(), "100% done");
    }

    #[test]
    fn open_range_joins_remaining_words() {
        let no_user = |_: &str| None;
        let no_ip = |_: &str| None;
        let ctx = context(vec!["a b c d", "a", "b", "c", "d"], "#c", &no_user, &no_ip);
        assert_eq!(expand_line("%2..%", &ctx).unwrap(), "b c d");
    }

    #[test]
    fn missing_parameter_is_insufficient_parameters() {
        let no_user = |_: &str| None;
        let no_ip = |_: &str| None;
        let ctx = context(vec!["only"], "#c", &no_user, &no_ip);
        assert_eq!(expand_line("%3%", &ctx), Err(MacroError::InsufficientParameters));
    }

    #[test]
    fn banmask_function_on_unknown_user_is_not_found() {
        let no_user = |_: &str| None;
        let no_ip = |_: &str| None;
        let ctx = context(vec!["bob", "bob"], "#c", &no_user, &no_ip);
        assert_eq!(expand_line("%1:banmask%", &ctx), Err(MacroError::NotFound));
    }

    #[test]
    fn banmask_function_resolves_through_lookup() {
        let resolve_user = |nick: &str| Some(User::new(nick, "u", "h", CaseMapping::default()));
        let no_ip = |_: &str| None;
        let ctx = context(vec!["bob", "bob"], "#c", &resolve_user, &no_ip);
        assert_eq!(expand_line("%1:banmask%", &ctx).unwrap(), "*!*@h");
    }

    #[test]
    fn unterminated_code_is_syntax_error() {
        let no_user = |_: &str| None;
        let no_ip = |_: &str| None;
        let ctx = context(vec!["x"], "#c", &no_user, &no_ip);
        assert_eq!(expand_line("%1", &ctx), Err(MacroError::SyntaxError));
    }

    #[test]
    fn expand_macro_rejects_past_max_recursion_depth() {
        let no_user = |_: &str| None;
        let no_ip = |_: &str| None;
        let ctx = context(vec!["x"], "#c", &no_user, &no_ip);
        let macro_def = Macro {
            name: "/greet".into(),
            description: "".into(),
            script: "PRIVMSG %C% :hi".into(),
            enabled: true,
            user_menu: false,
        };
        assert!(expand_macro(&macro_def, &ctx, MAX_RECURSION_DEPTH).is_err());
        assert_eq!(expand_macro(&macro_def, &ctx, 0).unwrap(), vec!["PRIVMSG #c :hi".to_string()]);
    }

    #[test]
    fn script_lines_splits_on_crlf_and_drops_blanks() {
        let lines = script_lines("ME does a thing\r\n\r\nSAY done");
        assert_eq!(lines, vec!["ME does a thing", "SAY done"]);
    }
}
