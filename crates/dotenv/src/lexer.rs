//! Hand-written lexer/evaluator for the dotenv grammar.
//!
//! Responsibilities:
//! - Tokenise a single `.env` text into an encounter-ordered name/value map.
//! - Resolve `$NAME` / `${NAME}` / `${NAME:-d}` / `${NAME:=d}` interpolation.
//! - Expand `$(...)` command substitution when enabled.
//! - Produce positioned `DotenvError::Format` diagnostics on malformed input.
//!
//! Does NOT handle:
//! - File discovery, the multi-file cascade, or populating the process
//!   environment (see `cascade.rs`).
//!
//! Invariants / Assumptions:
//! - `0 <= cursor <= end`; `line` increments exactly once per consumed `\n`.
//! - The lexer alternates between two states: expecting a variable name and
//!   expecting a value.
//! - Interpolation prefers the process environment over in-parse values for
//!   names not previously loaded by this library; this ordering is what lets
//!   a host-supplied variable beat an inline reassignment.
//! - Backslash escapes are accounted by actual run parity, never by blind
//!   substring replacement.

use std::collections::HashSet;
use std::env;

use indexmap::IndexMap;

use crate::cascade::VARS_SENTINEL;
use crate::error::DotenvError;

/// Comment directive that enables `$(...)` expansion for the rest of the file.
const EXPAND_COMMANDS_DIRECTIVE: &str = "@dotenv-expand-commands";

/// Parse a single dotenv text into an encounter-ordered map.
///
/// `path` is used for diagnostics only. `expand_commands` pre-enables
/// command substitution; the in-file directive comment can also enable it
/// for values that follow the directive.
pub(crate) fn parse(
    data: &str,
    path: &str,
    expand_commands: bool,
) -> Result<IndexMap<String, String>, DotenvError> {
    if data.starts_with('\u{feff}') {
        return Err(DotenvError::Format {
            message: "Loading files starting with a byte-order-mark (BOM) is not supported"
                .to_string(),
            path: path.to_string(),
            line: 1,
            column: 1,
        });
    }

    let normalized = data.replace("\r\n", "\n");
    let mut lexer = Lexer::new(&normalized, path, expand_commands);
    lexer.run()
}

/// What the lexer expects next.
enum State {
    Varname,
    Value,
}

/// How a `${NAME:?d}` default interacts with the parse map.
#[derive(PartialEq)]
enum DefaultMode {
    /// `:-` substitutes without storing.
    Substitute,
    /// `:=` substitutes and stores `NAME=d` for later references.
    Assign,
}

/// A scanned `$NAME` / `${NAME...}` interpolation token.
struct VarToken {
    name: String,
    default: Option<(DefaultMode, String)>,
}

struct Lexer<'a> {
    path: &'a str,
    chars: Vec<char>,
    cursor: usize,
    line: usize,
    end: usize,
    values: IndexMap<String, String>,
    /// Names listed in the loaded-by-us sentinel at parse start.
    loaded_vars: HashSet<String>,
    commands_enabled: bool,
}

impl<'a> Lexer<'a> {
    fn new(data: &str, path: &'a str, expand_commands: bool) -> Self {
        let chars: Vec<char> = data.chars().collect();
        let end = chars.len();
        let loaded_vars = env::var(VARS_SENTINEL)
            .map(|raw| {
                raw.split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            path,
            chars,
            cursor: 0,
            line: 1,
            end,
            values: IndexMap::new(),
            loaded_vars,
            commands_enabled: expand_commands,
        }
    }

    fn run(&mut self) -> Result<IndexMap<String, String>, DotenvError> {
        let mut state = State::Varname;
        let mut name = String::new();

        self.skip_empty_lines();
        while self.cursor < self.end {
            match state {
                State::Varname => {
                    name = self.lex_varname()?;
                    state = State::Value;
                }
                State::Value => {
                    let value = self.lex_value()?;
                    self.values.insert(std::mem::take(&mut name), value);
                    state = State::Varname;
                }
            }
        }
        if let State::Value = state {
            self.values.insert(name, String::new());
        }

        Ok(std::mem::take(&mut self.values))
    }

    /// Lex `export`-prefixed or plain variable names up to the `=` sign.
    fn lex_varname(&mut self) -> Result<String, DotenvError> {
        let mut had_export = false;
        if self.peek_word("export") {
            let mut j = self.cursor + "export".len();
            let mark = j;
            while j < self.end && matches!(self.chars[j], ' ' | '\t') {
                j += 1;
            }
            if j > mark {
                self.cursor = j;
                had_export = true;
            }
        }

        let name_start = self.cursor;
        let mut j = self.cursor;
        if j < self.end && self.chars[j] == '_' {
            j += 1;
        }
        if j < self.end && self.chars[j].is_ascii_alphabetic() {
            j += 1;
            while j < self.end && (self.chars[j].is_ascii_alphanumeric() || self.chars[j] == '_') {
                j += 1;
            }
        } else {
            return Err(self.format_error("Invalid character in variable name"));
        }
        self.cursor = j;
        let name: String = self.chars[name_start..j].iter().collect();

        if self.cursor == self.end || matches!(self.chars[self.cursor], '\n' | '#') {
            if had_export {
                return Err(self.format_error("Unable to unset an environment variable"));
            }
            return Err(self.format_error("Missing = in the environment variable declaration"));
        }
        if matches!(self.chars[self.cursor], ' ' | '\t') {
            return Err(
                self.format_error("Whitespace characters are not supported after the variable name")
            );
        }
        if self.chars[self.cursor] != '=' {
            return Err(self.format_error("Missing = in the environment variable declaration"));
        }
        self.cursor += 1;

        Ok(name)
    }

    /// Lex the value segments following `=` up to the end of the line.
    fn lex_value(&mut self) -> Result<String, DotenvError> {
        // A rest-of-line that is blank or a comment is an empty value.
        let mut j = self.cursor;
        while j < self.end && matches!(self.chars[j], ' ' | '\t') {
            j += 1;
        }
        if j == self.end || matches!(self.chars[j], '\n' | '#') {
            self.cursor = j;
            self.skip_empty_lines();
            return Ok(String::new());
        }
        if j > self.cursor {
            return Err(self.format_error("Whitespace characters are not supported before the value"));
        }

        let mut v = String::new();
        loop {
            match self.chars[self.cursor] {
                '\'' => {
                    self.cursor += 1;
                    let start = self.cursor;
                    loop {
                        if self.cursor == self.end {
                            return Err(self.format_error("Missing quote to end the value"));
                        }
                        match self.chars[self.cursor] {
                            '\'' => break,
                            '\n' => self.line += 1,
                            _ => {}
                        }
                        self.cursor += 1;
                    }
                    v.extend(&self.chars[start..self.cursor]);
                    self.cursor += 1;
                }
                '"' => {
                    self.cursor += 1;
                    let start = self.cursor;
                    let mut backslashes = 0usize;
                    loop {
                        if self.cursor == self.end {
                            return Err(self.format_error("Missing quote to end the value"));
                        }
                        let c = self.chars[self.cursor];
                        if c == '"' && backslashes % 2 == 0 {
                            break;
                        }
                        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
                        if c == '\n' {
                            self.line += 1;
                        }
                        self.cursor += 1;
                    }
                    let raw: String = self.chars[start..self.cursor].iter().collect();
                    self.cursor += 1;

                    let unescaped = unescape_double_quoted(&raw);
                    let resolved = self.resolve_variables(&unescaped)?;
                    let resolved = self.resolve_commands(&resolved)?;
                    v.push_str(&resolved.replace("\\\\", "\\"));
                }
                _ => {
                    let mut raw = String::new();
                    let mut prev = self.chars[self.cursor - 1];
                    let mut at_comment = false;
                    while self.cursor < self.end {
                        let c = self.chars[self.cursor];
                        if matches!(c, '\n' | '"' | '\'') {
                            break;
                        }
                        if c == '#' && matches!(prev, ' ' | '\t') {
                            at_comment = true;
                            break;
                        }
                        if c == '\\'
                            && self.cursor + 1 < self.end
                            && matches!(self.chars[self.cursor + 1], '"' | '\'')
                        {
                            self.cursor += 1;
                        }
                        let taken = self.chars[self.cursor];
                        raw.push(taken);
                        prev = taken;
                        if taken == '$'
                            && self.cursor + 1 < self.end
                            && self.chars[self.cursor + 1] == '('
                        {
                            self.cursor += 1;
                            let nested = self.lex_nested_expression()?;
                            raw.push('(');
                            raw.push_str(&nested);
                            raw.push(')');
                        }
                        self.cursor += 1;
                    }

                    let raw = raw.trim_end().to_string();
                    let resolved = self.resolve_variables(&raw)?;
                    let resolved = self.resolve_commands(&resolved)?;
                    let resolved = resolved.replace("\\\\", "\\");
                    if resolved == raw && has_bare_whitespace(&raw) {
                        return Err(
                            self.format_error("A value containing spaces must be surrounded by quotes")
                        );
                    }
                    v.push_str(&resolved);
                    if at_comment {
                        break;
                    }
                }
            }
            if self.cursor == self.end || self.chars[self.cursor] == '\n' {
                break;
            }
        }
        self.skip_empty_lines();

        Ok(v)
    }

    /// Collect the body of a `$(...)` expression, tracking balanced parens.
    ///
    /// The cursor enters on `(` and leaves on the matching `)`.
    fn lex_nested_expression(&mut self) -> Result<String, DotenvError> {
        self.cursor += 1;
        let mut value = String::new();
        loop {
            if self.cursor == self.end {
                return Err(self.format_error("Missing closing parenthesis in command expansion"));
            }
            let c = self.chars[self.cursor];
            if c == '\n' {
                return Err(self.format_error("Missing closing parenthesis in command expansion"));
            }
            if c == ')' {
                break;
            }
            value.push(c);
            if c == '(' {
                let inner = self.lex_nested_expression()?;
                value.push_str(&inner);
                value.push(')');
            }
            self.cursor += 1;
        }
        Ok(value)
    }

    /// Consume whitespace, blank lines, and comment lines.
    ///
    /// Comment text is inspected for the command-expansion directive, which
    /// applies to every value lexed after it.
    fn skip_empty_lines(&mut self) {
        loop {
            while self.cursor < self.end && matches!(self.chars[self.cursor], ' ' | '\t' | '\n' | '\r')
            {
                if self.chars[self.cursor] == '\n' {
                    self.line += 1;
                }
                self.cursor += 1;
            }
            if self.cursor < self.end && self.chars[self.cursor] == '#' {
                let start = self.cursor + 1;
                while self.cursor < self.end && self.chars[self.cursor] != '\n' {
                    self.cursor += 1;
                }
                let comment: String = self.chars[start..self.cursor].iter().collect();
                if comment.trim() == EXPAND_COMMANDS_DIRECTIVE {
                    self.commands_enabled = true;
                }
                continue;
            }
            break;
        }
    }

    /// Substitute `$NAME` / `${NAME}` tokens in one resolved segment.
    fn resolve_variables(&mut self, value: &str) -> Result<String, DotenvError> {
        let chars: Vec<char> = value.chars().collect();
        let len = chars.len();
        let mut out = String::new();
        let mut i = 0;

        while i < len {
            let c = chars[i];
            if c == '\\' {
                let run_start = i;
                while i < len && chars[i] == '\\' {
                    i += 1;
                }
                let run = i - run_start;
                if i < len && chars[i] == '$' && !starts_command(&chars, i) {
                    if run % 2 == 1 {
                        // Odd parity escapes the dollar sign; the rest of the
                        // token text flows through literally, unparsed.
                        out.extend(std::iter::repeat_n('\\', run - 1));
                        out.push('$');
                        i += 1;
                    } else {
                        out.extend(std::iter::repeat_n('\\', run));
                        let token_start = i;
                        match self.scan_var_token(&chars, &mut i)? {
                            Some(token) => out.push_str(&self.expand_var_token(token)?),
                            None => out.extend(&chars[token_start..i]),
                        }
                    }
                } else {
                    out.extend(std::iter::repeat_n('\\', run));
                }
                continue;
            }
            if c == '$' && !starts_command(&chars, i) {
                let token_start = i;
                match self.scan_var_token(&chars, &mut i)? {
                    Some(token) => out.push_str(&self.expand_var_token(token)?),
                    None => out.extend(&chars[token_start..i]),
                }
            } else {
                out.push(c);
                i += 1;
            }
        }

        Ok(out)
    }

    /// Scan one interpolation token starting at `chars[*i] == '$'`.
    ///
    /// Returns `None` for an isolated `$` (kept literal); `*i` is always
    /// advanced past the consumed text.
    fn scan_var_token(
        &mut self,
        chars: &[char],
        i: &mut usize,
    ) -> Result<Option<VarToken>, DotenvError> {
        let len = chars.len();
        let mut j = *i + 1;
        let braced = j < len && chars[j] == '{';
        if braced {
            j += 1;
        }

        let name_start = j;
        if j < len && chars[j] == '_' {
            j += 1;
        }
        if j < len && chars[j].is_ascii_alphabetic() {
            j += 1;
            while j < len && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
        } else {
            j = name_start;
        }

        if j == name_start {
            if braced {
                if j < len && chars[j] == '}' {
                    // `${}` stays literal.
                    *i = j + 1;
                    return Ok(None);
                }
                return Err(self.format_error("Unclosed braces on variable expansion"));
            }
            *i += 1;
            return Ok(None);
        }
        let name: String = chars[name_start..j].iter().collect();

        // The default body is collected permissively up to the brace; its
        // character restrictions are enforced only if the default is applied.
        let mut default = None;
        if braced && j + 1 < len && chars[j] == ':' && matches!(chars[j + 1], '-' | '=') {
            let mode = if chars[j + 1] == '-' {
                DefaultMode::Substitute
            } else {
                DefaultMode::Assign
            };
            j += 2;
            let mut body = String::new();
            loop {
                if j == len {
                    return Err(self.format_error("Unclosed braces on variable expansion"));
                }
                let c = chars[j];
                if c == '}' {
                    break;
                }
                body.push(c);
                j += 1;
            }
            default = Some((mode, body));
        }

        if braced {
            if j == len || chars[j] != '}' {
                return Err(self.format_error("Unclosed braces on variable expansion"));
            }
            j += 1;
        }

        *i = j;
        Ok(Some(VarToken { name, default }))
    }

    /// Look up a token's value and apply its default modifier.
    fn expand_var_token(&mut self, token: VarToken) -> Result<String, DotenvError> {
        let mut value = if self.loaded_vars.contains(&token.name) {
            match self.values.get(&token.name) {
                Some(v) => v.clone(),
                None => env::var(&token.name).unwrap_or_default(),
            }
        } else if let Ok(v) = env::var(&token.name) {
            v
        } else if let Some(v) = self.values.get(&token.name) {
            v.clone()
        } else {
            String::new()
        };

        if value.is_empty()
            && let Some((mode, body)) = token.default
        {
            if let Some(unsupported) = body.chars().find(|c| matches!(c, '\'' | '"' | '{' | '$')) {
                return Err(self.format_error(&format!(
                    "Unsupported character \"{unsupported}\" found in the default value of variable \"${}\"",
                    token.name
                )));
            }
            value = body;
            if mode == DefaultMode::Assign {
                self.values.insert(token.name, value.clone());
            }
        }

        Ok(value)
    }

    /// Expand `$(...)` expressions in one resolved segment.
    ///
    /// A failing or non-zero command leaves the literal `$(...)` text in
    /// place; only a structurally unclosed expression is an error.
    fn resolve_commands(&mut self, value: &str) -> Result<String, DotenvError> {
        if !self.commands_enabled || !value.contains("$(") {
            return Ok(value.to_string());
        }

        let chars: Vec<char> = value.chars().collect();
        let len = chars.len();
        let mut out = String::new();
        let mut i = 0;

        while i < len {
            let c = chars[i];
            if c == '\\' {
                let run_start = i;
                while i < len && chars[i] == '\\' {
                    i += 1;
                }
                let run = i - run_start;
                if starts_command(&chars, i) && run >= 2 {
                    // A double backslash keeps the expression literal.
                    let close = self.find_balanced_close(&chars, i + 1)?;
                    out.extend(std::iter::repeat_n('\\', run - 1));
                    out.extend(&chars[i..=close]);
                    i = close + 1;
                } else {
                    out.extend(std::iter::repeat_n('\\', run));
                }
                continue;
            }
            if starts_command(&chars, i) {
                let close = self.find_balanced_close(&chars, i + 1)?;
                let cmd: String = chars[i + 2..close].iter().collect();
                out.push_str(&self.run_command(&cmd)?);
                i = close + 1;
            } else {
                out.push(c);
                i += 1;
            }
        }

        Ok(out)
    }

    /// Index of the `)` matching the `(` at `open`.
    fn find_balanced_close(&self, chars: &[char], open: usize) -> Result<usize, DotenvError> {
        let mut depth = 0usize;
        for (k, &c) in chars.iter().enumerate().skip(open) {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(k);
                    }
                }
                _ => {}
            }
        }
        Err(self.format_error("Missing closing parenthesis in command expansion"))
    }

    #[cfg(windows)]
    fn run_command(&mut self, _cmd: &str) -> Result<String, DotenvError> {
        Err(DotenvError::CommandsUnsupported)
    }

    /// Run one command under `sh -c` and return its output, or the literal
    /// `$(...)` text when execution fails.
    #[cfg(not(windows))]
    fn run_command(&mut self, cmd: &str) -> Result<String, DotenvError> {
        use std::process::Command;

        let mut child_env: std::collections::HashMap<String, String> = env::vars().collect();
        for (name, value) in &self.values {
            if self.loaded_vars.contains(name) || !child_env.contains_key(name) {
                child_env.insert(name.clone(), value.clone());
            }
        }

        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .env_clear()
            .envs(&child_env)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                Ok(stdout.trim_end_matches(['\r', '\n']).to_string())
            }
            _ => {
                tracing::debug!(command = cmd, "command expansion failed, keeping literal text");
                Ok(format!("$({cmd})"))
            }
        }
    }

    fn peek_word(&self, word: &str) -> bool {
        let mut j = self.cursor;
        for expected in word.chars() {
            if j == self.end || self.chars[j] != expected {
                return false;
            }
            j += 1;
        }
        true
    }

    fn format_error(&self, message: &str) -> DotenvError {
        let mut column = 1;
        let mut k = self.cursor;
        while k > 0 && self.chars[k - 1] != '\n' {
            k -= 1;
            column += 1;
        }
        DotenvError::Format {
            message: message.to_string(),
            path: self.path.to_string(),
            line: self.line,
            column,
        }
    }
}

/// True when `chars[i..]` begins a `$(...)` expression.
fn starts_command(chars: &[char], i: usize) -> bool {
    chars.get(i) == Some(&'$') && chars.get(i + 1) == Some(&'(')
}

/// Whitespace outside balanced `$(...)` spans.
///
/// Command expressions that were kept literal may legitimately contain
/// spaces; only whitespace in the value proper forces quoting.
fn has_bare_whitespace(raw: &str) -> bool {
    let mut depth = 0usize;
    let mut prev_dollar = false;
    for c in raw.chars() {
        match c {
            '(' if prev_dollar || depth > 0 => depth += 1,
            ')' if depth > 0 => depth -= 1,
            c if c.is_whitespace() && depth == 0 => return true,
            _ => {}
        }
        prev_dollar = c == '$';
    }
    false
}

/// Apply the double-quote escapes `\"`, `\r`, and `\n`.
///
/// `\\` is intentionally left intact here; it collapses only after variable
/// and command resolution, so resolved text is never re-escaped.
fn unescape_double_quoted(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            match chars[i + 1] {
                '"' => {
                    out.push('"');
                    i += 2;
                    continue;
                }
                'r' => {
                    out.push('\r');
                    i += 2;
                    continue;
                }
                'n' => {
                    out.push('\n');
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn parse_one(data: &str) -> Result<IndexMap<String, String>, DotenvError> {
        parse(data, ".env", false)
    }

    fn value_of(data: &str, key: &str) -> String {
        parse_one(data).unwrap().get(key).cloned().unwrap_or_default()
    }

    fn format_message(data: &str) -> String {
        match parse_one(data).unwrap_err() {
            DotenvError::Format { message, .. } => message,
            other => panic!("expected a format error, got {other}"),
        }
    }

    #[test]
    fn parses_simple_assignments_in_order() {
        let values = parse_one("FOO=bar\nBAR=baz\n").unwrap();
        let pairs: Vec<_> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("FOO", "bar"), ("BAR", "baz")]);
    }

    #[test]
    fn accepts_export_prefix_and_underscored_names() {
        let values = parse_one("export FOO=bar\n_BAZ=qux").unwrap();
        assert_eq!(values.get("FOO").unwrap(), "bar");
        assert_eq!(values.get("_BAZ").unwrap(), "qux");
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let values = parse_one("\n# leading comment\n\nFOO=bar # trailing\n   \n# tail\n").unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("FOO").unwrap(), "bar");
    }

    #[test]
    fn empty_values_are_allowed() {
        assert_eq!(value_of("FOO=\nBAR=1", "FOO"), "");
        assert_eq!(value_of("FOO=   # only a comment", "FOO"), "");
        assert_eq!(value_of("FOO=", "FOO"), "");
    }

    #[test]
    fn concatenates_quoted_and_bare_segments() {
        assert_eq!(value_of("FOO=ab'cd'\"ef\"", "FOO"), "abcdef");
        assert_eq!(value_of("FOO='single quoted with spaces'", "FOO"), "single quoted with spaces");
    }

    #[test]
    fn single_quotes_are_literal() {
        assert_eq!(value_of("FOO='$BAR ${BAZ} \\n'", "FOO"), "$BAR ${BAZ} \\n");
    }

    #[test]
    fn double_quote_escapes() {
        assert_eq!(value_of(r#"FOO="a\"b""#, "FOO"), "a\"b");
        assert_eq!(value_of(r#"FOO="line\nbreak""#, "FOO"), "line\nbreak");
        assert_eq!(value_of(r#"FOO="cr\rhere""#, "FOO"), "cr\rhere");
        assert_eq!(value_of(r#"FOO="back\\slash""#, "FOO"), "back\\slash");
    }

    #[test]
    fn escaped_quotes_in_bare_values() {
        assert_eq!(value_of(r#"FOO=\'quoted\'"#, "FOO"), "'quoted'");
        assert_eq!(value_of(r#"FOO=\"quoted\""#, "FOO"), "\"quoted\"");
    }

    #[test]
    fn multiline_quoted_values_track_lines() {
        let values = parse_one("FOO=\"first\nsecond\"\nBAR=1").unwrap();
        assert_eq!(values.get("FOO").unwrap(), "first\nsecond");
        assert_eq!(values.get("BAR").unwrap(), "1");
    }

    #[test]
    #[serial]
    fn interpolates_earlier_values() {
        let _lock = crate::test_util::global_test_lock().lock().unwrap();
        temp_env::with_vars_unset(["LEXER_A", "LEXER_B", VARS_SENTINEL], || {
            let values = parse_one("LEXER_A=hello\nLEXER_B=\"$LEXER_A world\"").unwrap();
            assert_eq!(values.get("LEXER_B").unwrap(), "hello world");
        });
    }

    #[test]
    #[serial]
    fn process_env_beats_in_parse_values_for_unloaded_names() {
        let _lock = crate::test_util::global_test_lock().lock().unwrap();
        temp_env::with_vars([("LEXER_HOST", Some("from-host"))], || {
            temp_env::with_vars_unset([VARS_SENTINEL], || {
                let values = parse_one("LEXER_HOST=from-file\nREF=${LEXER_HOST}").unwrap();
                assert_eq!(values.get("REF").unwrap(), "from-host");
            });
        });
    }

    #[test]
    #[serial]
    fn loaded_names_prefer_the_current_parse() {
        let _lock = crate::test_util::global_test_lock().lock().unwrap();
        temp_env::with_vars(
            [("LEXER_HOST", Some("from-host")), (VARS_SENTINEL, Some("LEXER_HOST"))],
            || {
                let values = parse_one("LEXER_HOST=from-file\nREF=${LEXER_HOST}").unwrap();
                assert_eq!(values.get("REF").unwrap(), "from-file");
            },
        );
    }

    #[test]
    #[serial]
    fn default_substitution_and_assignment() {
        temp_env::with_vars_unset(["LEXER_MISSING", VARS_SENTINEL], || {
            assert_eq!(value_of("FOO=${LEXER_MISSING:-fallback}", "FOO"), "fallback");

            // `:-` does not store the default.
            let values = parse_one("FOO=${LEXER_MISSING:-fallback}").unwrap();
            assert!(!values.contains_key("LEXER_MISSING"));

            // `:=` stores it for later references.
            let values = parse_one("FOO=${LEXER_MISSING:=fallback}\nBAR=$LEXER_MISSING").unwrap();
            assert_eq!(values.get("LEXER_MISSING").unwrap(), "fallback");
            assert_eq!(values.get("BAR").unwrap(), "fallback");
        });
    }

    #[test]
    #[serial]
    fn escaped_dollar_is_literal() {
        temp_env::with_vars([("LEXER_VAL", Some("x"))], || {
            temp_env::with_vars_unset([VARS_SENTINEL], || {
                assert_eq!(value_of(r#"FOO="\$LEXER_VAL""#, "FOO"), "$LEXER_VAL");
                assert_eq!(value_of(r#"FOO="\\$LEXER_VAL""#, "FOO"), "\\x");
                // An escaped dollar never parses the token behind it, so an
                // unclosed brace is fine here.
                assert_eq!(value_of(r#"FOO="\${LEXER_VAL""#, "FOO"), "${LEXER_VAL");
            });
        });
    }

    #[test]
    fn isolated_dollar_is_literal() {
        assert_eq!(value_of("FOO=a$", "FOO"), "a$");
        assert_eq!(value_of("FOO=\"1$ 2\"", "FOO"), "1$ 2");
    }

    #[test]
    fn format_error_messages() {
        assert_eq!(
            format_message("FOO=BAR BAZ"),
            "A value containing spaces must be surrounded by quotes"
        );
        assert_eq!(
            format_message("FOO BAR=BAR"),
            "Whitespace characters are not supported after the variable name"
        );
        assert_eq!(format_message("FOO"), "Missing = in the environment variable declaration");
        assert_eq!(format_message("FOO=\"foo"), "Missing quote to end the value");
        assert_eq!(format_message("FOO='foo"), "Missing quote to end the value");
        assert_eq!(format_message("FOO=${FOO"), "Unclosed braces on variable expansion");
        assert_eq!(format_message("export FOO"), "Unable to unset an environment variable");
        assert_eq!(format_message("FOO= bar"), "Whitespace characters are not supported before the value");
        assert_eq!(format_message("FOO =bar"), "Whitespace characters are not supported after the variable name");
        assert_eq!(format_message("1FOO=bar"), "Invalid character in variable name");
        // The quote ends the bare segment, leaving the braces unclosed.
        assert_eq!(format_message("FOO=${BAR:-a'b}"), "Unclosed braces on variable expansion");
    }

    #[test]
    fn default_values_reject_unsupported_characters_when_applied() {
        assert_eq!(
            format_message(r#"FOO="${LEXER_SURELY_UNSET:-a'b}""#),
            "Unsupported character \"'\" found in the default value of variable \"$LEXER_SURELY_UNSET\""
        );
        assert_eq!(
            format_message(r#"FOO="${LEXER_SURELY_UNSET:-$OTHER}""#),
            "Unsupported character \"$\" found in the default value of variable \"$LEXER_SURELY_UNSET\""
        );
    }

    #[test]
    fn format_errors_carry_positions() {
        let err = parse_one("A=1\nFOO BAR=BAR").unwrap_err();
        match err {
            DotenvError::Format { line, column, path, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 4);
                assert_eq!(path, ".env");
            }
            other => panic!("expected a format error, got {other}"),
        }
    }

    #[test]
    fn bom_is_rejected() {
        let err = parse("\u{feff}FOO=bar", ".env", false).unwrap_err();
        match err {
            DotenvError::Format { message, line, column, .. } => {
                assert!(message.contains("byte-order-mark"));
                assert_eq!((line, column), (1, 1));
            }
            other => panic!("expected a format error, got {other}"),
        }
    }

    #[test]
    fn commands_stay_literal_when_disabled() {
        assert_eq!(value_of("FOO=$(echo hi)", "FOO"), "$(echo hi)");
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn commands_expand_when_enabled_by_flag() {
        temp_env::with_vars_unset([VARS_SENTINEL], || {
            let values = parse("FOO=$(echo hi)", ".env", true).unwrap();
            assert_eq!(values.get("FOO").unwrap(), "hi");
        });
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn commands_expand_when_enabled_by_directive() {
        temp_env::with_vars_unset([VARS_SENTINEL], || {
            let values =
                parse("# @dotenv-expand-commands\nFOO=$(printf 'a b')", ".env", false).unwrap();
            assert_eq!(values.get("FOO").unwrap(), "a b");
        });
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn failing_commands_keep_literal_text() {
        temp_env::with_vars_unset([VARS_SENTINEL], || {
            let values = parse("FOO=$(false)", ".env", true).unwrap();
            assert_eq!(values.get("FOO").unwrap(), "$(false)");
        });
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn commands_see_parse_time_values() {
        temp_env::with_vars_unset(["LEXER_CMD_IN", VARS_SENTINEL], || {
            let values =
                parse("LEXER_CMD_IN=seen\nFOO=$(printf \"%s\" \"$LEXER_CMD_IN\")", ".env", true)
                    .unwrap();
            assert_eq!(values.get("FOO").unwrap(), "seen");
        });
    }

    #[test]
    fn unclosed_command_is_a_format_error() {
        let err = parse("FOO=$(echo hi", ".env", true).unwrap_err();
        match err {
            DotenvError::Format { message, .. } => {
                assert_eq!(message, "Missing closing parenthesis in command expansion");
            }
            other => panic!("expected a format error, got {other}"),
        }
    }

    #[test]
    fn nested_command_parentheses_balance() {
        // Kept literal because expansion is disabled; the lexer still has to
        // scan the nested parens without ending the value early.
        assert_eq!(value_of("FOO=$(echo $(date))", "FOO"), "$(echo $(date))");
    }

    #[test]
    fn crlf_is_normalized() {
        let values = parse_one("FOO=bar\r\nBAR=baz\r\n").unwrap();
        assert_eq!(values.get("FOO").unwrap(), "bar");
        assert_eq!(values.get("BAR").unwrap(), "baz");
    }

    #[test]
    fn trailing_comment_is_stripped_from_bare_values() {
        assert_eq!(value_of("FOO=bar # comment", "FOO"), "bar");
        // Without preceding whitespace the hash belongs to the value.
        assert_eq!(value_of("FOO=bar#not-a-comment", "FOO"), "bar#not-a-comment");
    }
}
