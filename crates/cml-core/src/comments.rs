use crate::types::SourceLine;

/// Split CML content into lines, dropping a trailing `\r` from each.
pub fn split_lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}

/// Remove `//` and `/* ... */` comments, keeping one output line per input
/// line so line numbers stay valid.
///
/// Block comments do not nest: a `/*` seen inside a block is plain comment
/// text, and the first `*/` closes the block. Text after the close is
/// scanned normally, so a `//` following `*/` still truncates the line.
pub fn strip_comments(lines: &[&str]) -> Vec<SourceLine> {
    let mut in_block = false;
    let mut stripped = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let (text, still_open) = strip_line(line, in_block);
        in_block = still_open;
        stripped.push(SourceLine {
            number: idx + 1,
            text,
        });
    }

    stripped
}

/// Strip one line given whether a block comment is open on entry.
/// Returns the kept text and whether a block comment is open on exit.
fn strip_line(line: &str, mut in_block: bool) -> (String, bool) {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    loop {
        if in_block {
            match rest.find("*/") {
                Some(pos) => {
                    rest = &rest[pos + 2..];
                    in_block = false;
                }
                None => return (out, true),
            }
        }

        let line_comment = rest.find("//");
        let block_open = rest.find("/*");
        match (line_comment, block_open) {
            (Some(lc), Some(bo)) if lc < bo => {
                out.push_str(&rest[..lc]);
                return (out, false);
            }
            (_, Some(bo)) => {
                out.push_str(&rest[..bo]);
                rest = &rest[bo + 2..];
                in_block = true;
            }
            (Some(lc), None) => {
                out.push_str(&rest[..lc]);
                return (out, false);
            }
            (None, None) => {
                out.push_str(rest);
                return (out, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<String> {
        strip_comments(&split_lines(input))
            .into_iter()
            .map(|l| l.text)
            .collect()
    }

    #[test]
    fn no_comments_unchanged() {
        let input = "type A {\n    int x = 1;\n}";
        assert_eq!(texts(input), vec!["type A {", "    int x = 1;", "}"]);
    }

    #[test]
    fn line_comment_truncates() {
        assert_eq!(texts("type A; // abstract"), vec!["type A; "]);
    }

    #[test]
    fn inline_block_comment_removed() {
        assert_eq!(texts("type /* x */ A;"), vec!["type  A;"]);
    }

    #[test]
    fn multi_line_block_keeps_numbering() {
        let out = strip_comments(&split_lines("a\n/* one\ntwo\nthree */ b\nc"));
        let pairs: Vec<(usize, &str)> = out.iter().map(|l| (l.number, l.text.as_str())).collect();
        assert_eq!(pairs, vec![(1, "a"), (2, ""), (3, ""), (4, " b"), (5, "c")]);
    }

    #[test]
    fn line_comment_after_block_close() {
        assert_eq!(texts("/*\n*/ type A; // trailing"), vec!["", " type A; "]);
    }

    #[test]
    fn nested_open_is_not_counted() {
        // The inner `/*` is ignored; the first `*/` closes the block.
        assert_eq!(texts("a /* b /* c */ d */ e"), vec!["a  d */ e"]);
    }

    #[test]
    fn line_comment_hides_block_open() {
        assert_eq!(texts("a // b /* c\nd"), vec!["a ", "d"]);
    }

    #[test]
    fn crlf_is_dropped() {
        assert_eq!(texts("type A;\r\ntype B;\r\n"), vec!["type A;", "type B;"]);
    }

    #[test]
    fn unterminated_block_blanks_rest_of_file() {
        assert_eq!(texts("x /* open\ny\nz"), vec!["x ", "", ""]);
    }
}
