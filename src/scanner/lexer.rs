//! Lexical pre-pass producing logical lines.
//!
//! Physical lines joined by open brackets or backslashes become one logical
//! line. Comments are dropped and string literal bodies are replaced by an
//! empty literal in `code`, so later pattern matching never fires inside
//! text. Literal bodies are kept separately, together with the expressions
//! found in f-string replacement fields.
//!
//! Unterminated strings and unbalanced brackets are tolerated: the scan
//! degrades to best-effort output instead of failing.

const TAB_WIDTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Body without quotes or prefix
    pub text: String,
    /// `f`-prefixed literal
    pub interpolated: bool,
    /// 1-based line of the opening quote
    pub line: usize,
    /// Byte offset in the masked `code` just past the closing placeholder quote
    pub end_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// 1-based line where the statement starts
    pub line: usize,
    /// Indentation width in columns
    pub indent: usize,
    /// Statement text with string bodies masked
    pub code: String,
    pub strings: Vec<StringLiteral>,
    /// Expressions from f-string replacement fields
    pub interpolations: Vec<String>,
}

struct Pending {
    line: usize,
    indent: usize,
    code: String,
    strings: Vec<StringLiteral>,
    interpolations: Vec<String>,
}

impl Pending {
    fn new(line: usize) -> Self {
        Self {
            line,
            indent: 0,
            code: String::new(),
            strings: Vec::new(),
            interpolations: Vec::new(),
        }
    }

    fn finish(self) -> Option<LogicalLine> {
        let trimmed_len = self.code.trim_end().len();
        if self.code.trim().is_empty() {
            return None;
        }
        let mut code = self.code;
        code.truncate(trimmed_len);
        Some(LogicalLine {
            line: self.line,
            indent: self.indent,
            code,
            strings: self.strings,
            interpolations: self.interpolations,
        })
    }
}

/// Split source text into logical lines.
pub fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let chars: Vec<char> = source.chars().collect();
    let mut lines = Vec::new();
    let mut line_no = 1;
    let mut current = Pending::new(line_no);
    let mut depth = 0usize;
    let mut measuring_indent = true;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if measuring_indent {
            match c {
                ' ' => {
                    current.indent += 1;
                    i += 1;
                    continue;
                }
                '\t' => {
                    current.indent += TAB_WIDTH - current.indent % TAB_WIDTH;
                    i += 1;
                    continue;
                }
                '\x0c' | '\r' => {
                    i += 1;
                    continue;
                }
                _ => {
                    measuring_indent = false;
                    current.line = line_no;
                }
            }
        }

        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '\n' => {
                line_no += 1;
                i += 1;
                if depth > 0 {
                    current.code.push(' ');
                } else {
                    let done = std::mem::replace(&mut current, Pending::new(line_no));
                    lines.extend(done.finish());
                    measuring_indent = true;
                }
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                current.code.push(' ');
                line_no += 1;
                i += 2;
            }
            '\\' if chars.get(i + 1) == Some(&'\r') && chars.get(i + 2) == Some(&'\n') => {
                current.code.push(' ');
                line_no += 1;
                i += 3;
            }
            '\r' => i += 1,
            '"' | '\'' => {
                let prefix = string_prefix(&current.code);
                let scanned = read_string(&chars, i, c);
                let interpolated = prefix.contains('f');

                current.code.push(c);
                current.code.push(c);
                if interpolated {
                    current
                        .interpolations
                        .extend(replacement_fields(&scanned.text));
                }
                current.strings.push(StringLiteral {
                    text: scanned.text,
                    interpolated,
                    line: line_no,
                    end_offset: current.code.len(),
                });
                line_no += scanned.newlines;
                i = scanned.end;
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.code.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.code.push(c);
                i += 1;
            }
            _ => {
                current.code.push(c);
                i += 1;
            }
        }
    }

    lines.extend(current.finish());
    lines
}

struct ScannedString {
    text: String,
    end: usize,
    newlines: usize,
}

fn read_string(chars: &[char], start: usize, quote: char) -> ScannedString {
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut j = start + if triple { 3 } else { 1 };
    let mut text = String::new();
    let mut newlines = 0;

    while j < chars.len() {
        let c = chars[j];
        if c == '\\' {
            text.push(c);
            if let Some(&next) = chars.get(j + 1) {
                if next == '\n' {
                    newlines += 1;
                }
                text.push(next);
            }
            j += 2;
            continue;
        }
        if triple {
            if c == quote && chars.get(j + 1) == Some(&quote) && chars.get(j + 2) == Some(&quote) {
                return ScannedString {
                    text,
                    end: j + 3,
                    newlines,
                };
            }
        } else if c == quote {
            return ScannedString {
                text,
                end: j + 1,
                newlines,
            };
        } else if c == '\n' {
            // Unterminated single-quoted string ends at the newline
            return ScannedString {
                text,
                end: j,
                newlines,
            };
        }
        if c == '\n' {
            newlines += 1;
        }
        text.push(c);
        j += 1;
    }

    ScannedString {
        text,
        end: chars.len(),
        newlines,
    }
}

/// Lowercased literal prefix (`f`, `rb`, ...) already emitted at the end of `code`.
fn string_prefix(code: &str) -> String {
    let tail: String = code
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if tail.is_empty() || tail.len() > 2 {
        return String::new();
    }
    let before = code[..code.len() - tail.len()].chars().next_back();
    if before.is_some_and(|c| c.is_alphanumeric() || c == '_') {
        return String::new();
    }
    let lower = tail.to_ascii_lowercase();
    match lower.as_str() {
        "f" | "r" | "b" | "u" | "rf" | "fr" | "br" | "rb" => lower,
        _ => String::new(),
    }
}

/// Expressions inside `{...}` of an f-string body, skipping `{{` escapes and format specs.
fn replacement_fields(body: &str) -> Vec<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut fields = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '{' if chars.get(i + 1) == Some(&'{') => i += 2,
            '{' => {
                let mut depth = 0usize;
                let mut expr = String::new();
                let mut in_spec = false;
                let mut j = i + 1;
                while j < chars.len() {
                    let c = chars[j];
                    match c {
                        '{' | '(' | '[' => depth += 1,
                        ')' | ']' => depth = depth.saturating_sub(1),
                        '}' if depth == 0 => break,
                        '}' => depth -= 1,
                        ':' | '!' if depth == 0 => in_spec = true,
                        _ => {}
                    }
                    if !in_spec {
                        expr.push(c);
                    }
                    j += 1;
                }
                let expr = expr.trim().trim_end_matches('=').trim().to_string();
                if !expr.is_empty() {
                    fields.push(expr);
                }
                i = j + 1;
            }
            _ => i += 1,
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_masks_strings_and_drops_comments() {
        let lines = logical_lines("x = \"# not a comment\"  # real comment\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].code, "x = \"\"");
        assert_eq!(lines[0].strings[0].text, "# not a comment");
    }

    #[test]
    fn test_joins_bracket_continuations() {
        let lines = logical_lines(indoc! {"
            cursor.execute(
                'SELECT 1',
                (a, b),
            )
            y = 2
        "});
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 1);
        assert!(lines[0].code.starts_with("cursor.execute("));
        assert_eq!(lines[1].line, 5);
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let lines = logical_lines(indoc! {r#"
            def f():
                """
                Docstring with datetime.now() inside
                """
                return 1
        "#});
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].code, "\"\"");
        assert!(lines[1].strings[0].text.contains("datetime.now()"));
        assert_eq!(lines[2].line, 5);
        assert_eq!(lines[2].indent, 4);
    }

    #[test]
    fn test_fstring_replacement_fields_are_extracted() {
        let lines = logical_lines("msg = f\"at {datetime.now():%H} {{literal}} {d['k']!r}\"\n");
        let line = &lines[0];
        assert!(line.strings[0].interpolated);
        assert_eq!(line.interpolations, vec!["datetime.now()", "d['k']"]);
    }

    #[test]
    fn test_unterminated_string_is_tolerated() {
        let lines = logical_lines("x = 'oops\ny = 1\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].code, "y = 1");
    }

    #[test]
    fn test_prefix_detection_requires_word_boundary() {
        assert_eq!(string_prefix("x = f"), "f");
        assert_eq!(string_prefix("x = rb"), "rb");
        assert_eq!(string_prefix("elif"), "");
        assert_eq!(string_prefix("x = if"), "");
    }
}
