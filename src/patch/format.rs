//! Canonical layout for rewritten sources.
//!
//! Trailing whitespace is trimmed, leading blank lines are dropped, runs of
//! blank lines collapse to one and the file ends with exactly one newline.
//! Multi-line raw strings and block comments are copied verbatim.

use tree_sitter::Tree;

use crate::source::Span;

/// Multi-line nodes whose bytes must not be touched
pub fn protected_spans(tree: &Tree, source: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "raw_string_literal" | "comment" | "interpreted_string_literal" => {
                let span = Span::of(&node);
                if source
                    .get(span.start..span.end)
                    .is_some_and(|t| t.contains('\n'))
                {
                    spans.push(span);
                }
            }
            _ => {
                let mut cursor = node.walk();
                stack.extend(node.children(&mut cursor));
            }
        }
    }

    spans.sort();
    spans
}

pub fn canonicalize(source: &str, protected: &[Span]) -> String {
    let mut out = String::with_capacity(source.len() + 1);
    let mut pending_blank = false;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let body = line.strip_suffix('\n').unwrap_or(line);

        let (keep, verbatim) = kept_len(start, body, protected);
        if keep == 0 && !verbatim {
            pending_blank = !out.is_empty();
            continue;
        }

        if pending_blank {
            out.push('\n');
            pending_blank = false;
        }
        out.push_str(&body[..keep]);
        out.push('\n');
    }

    out
}

/// Bytes of `body` to keep and whether the line ends inside a protected span.
fn kept_len(start: usize, body: &str, protected: &[Span]) -> (usize, bool) {
    let newline = start + body.len();
    let mut keep = body.trim_end().len();

    for span in protected {
        if span.start >= newline || span.end <= start {
            continue;
        }
        if span.end > newline {
            return (body.len(), true);
        }
        keep = keep.max(span.end - start);
    }

    (keep, false)
}
