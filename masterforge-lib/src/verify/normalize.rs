/// Reduces Rust source to the lines that carry meaning for comparison.
///
/// Line, block and doc comments are removed (string and char literals are
/// respected), runs of whitespace collapse to one space, lines are trimmed and
/// empty lines dropped.
#[must_use]
pub fn normalize_source(source: &str) -> Vec<String> {
    strip_comments(source)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                // block comments nest in Rust
                let mut depth = 0;
                while i < chars.len() {
                    if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
                        depth += 1;
                        i += 2;
                    } else if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        depth -= 1;
                        i += 2;
                        if depth == 0 {
                            break;
                        }
                    } else {
                        if chars[i] == '\n' {
                            out.push('\n');
                        }
                        i += 1;
                    }
                }
            }
            'r' if matches!(next, Some('"' | '#')) && is_raw_string_start(&chars, i) => {
                i = copy_raw_string(&chars, i, &mut out);
            }
            '"' => {
                i = copy_string(&chars, i, &mut out);
            }
            '\'' => {
                i = copy_char_or_lifetime(&chars, i, &mut out);
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn is_raw_string_start(chars: &[char], start: usize) -> bool {
    if start > 0 && (chars[start - 1].is_alphanumeric() || chars[start - 1] == '_') {
        return false;
    }
    let mut i = start + 1;
    while chars.get(i) == Some(&'#') {
        i += 1;
    }
    chars.get(i) == Some(&'"')
}

fn copy_raw_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut i = start + 1;
    let mut hashes = 0;
    while chars.get(i) == Some(&'#') {
        hashes += 1;
        i += 1;
    }
    // opening quote
    i += 1;

    while i < chars.len() {
        if chars[i] == '"' && (1..=hashes).all(|h| chars.get(i + h) == Some(&'#')) {
            i += 1 + hashes;
            break;
        }
        i += 1;
    }

    let end = i.min(chars.len());
    out.extend(&chars[start..end]);
    end
}

fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '"' => {
                i += 1;
                break;
            }
            _ => i += 1,
        }
    }

    let end = i.min(chars.len());
    out.extend(&chars[start..end]);
    end
}

fn copy_char_or_lifetime(chars: &[char], start: usize, out: &mut String) -> usize {
    let end = if chars.get(start + 1) == Some(&'\\') {
        // escaped char literal: skip the escaped char, then find the closing quote
        let mut i = start + 3;
        while i < chars.len() && chars[i] != '\'' {
            i += 1;
        }
        i + 1
    } else if chars.get(start + 2) == Some(&'\'') {
        start + 3
    } else {
        // lifetime or label
        start + 1
    };

    let end = end.min(chars.len());
    out.extend(&chars[start..end]);
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_and_blank_lines_go_away() {
        let source = "//! Module doc\n\n/// Item doc\npub struct Item {   // trailing\n    pub id:    i32, /* inline */\n}\n";
        assert_eq!(normalize_source(source), ["pub struct Item {", "pub id: i32,", "}"]);
    }

    #[test]
    fn test_comment_markers_inside_literals_survive() {
        let source = "let url = \"http://example\";\nlet raw = r#\"/* not a comment */\"#;\nlet slash = '/'; // gone\n";
        assert_eq!(
            normalize_source(source),
            ["let url = \"http://example\";", "let raw = r#\"/* not a comment */\"#;", "let slash = '/';"]
        );
    }

    #[test]
    fn test_nested_block_comment() {
        let source = "a /* outer /* inner */ still outer */ b\n";
        assert_eq!(normalize_source(source), ["a b"]);
    }

    #[test]
    fn test_lifetimes_and_escapes() {
        let source = "fn f<'a>(s: &'a str) -> char { '\\'' } // x\n";
        assert_eq!(normalize_source(source), ["fn f<'a>(s: &'a str) -> char { '\\'' }"]);
    }

    #[test]
    fn test_whitespace_differences_do_not_matter() {
        assert_eq!(normalize_source("a  b\t\tc\r\n"), normalize_source("a b c\n"));
    }
}
