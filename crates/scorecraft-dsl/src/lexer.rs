//! Token/lexical reader: turns a script into per-line token lists.
//!
//! Mirrors the reference engine's hand-rolled reader: `//` and `#` start an
//! end-of-line comment, tokens are whitespace-delimited, and a token that
//! opens with `"` or `(` is read verbatim up to its matching close with no
//! escape processing and no nesting.

/// One non-blank, comment-stripped line of the script, 1-based.
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Splits a script into its non-blank, comment-stripped lines.
pub fn lines(script: &str) -> Vec<Line<'_>> {
    script
        .lines()
        .enumerate()
        .map(|(i, raw)| Line {
            number: i + 1,
            text: strip_comment(raw).trim(),
        })
        .filter(|l| !l.text.is_empty())
        .collect()
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            return &line[..i];
        }
        if bytes[i] == b'#' {
            return &line[..i];
        }
        i += 1;
    }
    line
}

/// Splits a single line into tokens, honoring quoted/parenthesized groups.
///
/// A token beginning with `"` runs to the next `"` (exclusive of both
/// quotes); a token beginning with `(` runs to the next `)` (exclusive of
/// both parens, and the enclosed text is returned with its internal
/// whitespace intact). Neither form supports escapes or nesting.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        if chars[i] == '"' {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != '"' {
                j += 1;
            }
            tokens.push(chars[start..j].iter().collect());
            i = if j < chars.len() { j + 1 } else { j };
        } else if chars[i] == '(' {
            let start = i + 1;
            let mut j = start;
            while j < chars.len() && chars[j] != ')' {
                j += 1;
            }
            tokens.push(chars[start..j].iter().collect());
            i = if j < chars.len() { j + 1 } else { j };
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_hash_comments() {
        let ls = lines("tempo 120 // set tempo\nroot C4 # root note\n\n");
        assert_eq!(ls.len(), 2);
        assert_eq!(ls[0].text, "tempo 120");
        assert_eq!(ls[1].text, "root C4");
    }

    #[test]
    fn tokenizes_whitespace_separated_words() {
        assert_eq!(tokenize("play p s rev"), vec!["play", "p", "s", "rev"]);
    }

    #[test]
    fn tokenizes_parenthesized_group_as_one_token() {
        let toks = tokenize("pattern p (60 . 67 .)");
        assert_eq!(toks, vec!["pattern", "p", "60 . 67 ."]);
    }

    #[test]
    fn tokenizes_quoted_group_as_one_token() {
        let toks = tokenize(r#"foo "hello world" bar"#);
        assert_eq!(toks, vec!["foo", "hello world", "bar"]);
    }
}
