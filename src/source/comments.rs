use super::unit::CommentGroup;

impl CommentGroup {
    /// Text of the group with comment markers removed.
    ///
    /// `//` markers drop one following space, `/* */` markers are stripped,
    /// compiler directives such as `//go:generate` are omitted, trailing
    /// whitespace is removed, runs of blank lines collapse to one and
    /// leading and trailing blank lines are dropped.
    pub fn text(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();

        for comment in &self.comments {
            if let Some(body) = comment.strip_prefix("//") {
                if body.is_empty() {
                    lines.push("");
                    continue;
                }
                if let Some(body) = body.strip_prefix(' ') {
                    lines.push(body);
                    continue;
                }
                if is_directive(body) {
                    continue;
                }
                lines.push(body);
            } else if let Some(body) = comment
                .strip_prefix("/*")
                .and_then(|c| c.strip_suffix("*/"))
            {
                lines.extend(body.split('\n'));
            } else {
                lines.extend(comment.split('\n'));
            }
        }

        let mut out: Vec<&str> = Vec::with_capacity(lines.len());
        for line in lines {
            let line = line.trim_end();
            if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
                continue;
            }
            out.push(line);
        }
        while out.last().is_some_and(|l| l.is_empty()) {
            out.pop();
        }

        if out.is_empty() {
            return String::new();
        }
        let mut text = out.join("\n");
        text.push('\n');
        text
    }
}

fn is_directive(body: &str) -> bool {
    if body.starts_with("line ") || body.starts_with("extern ") || body.starts_with("export ") {
        return true;
    }
    match body.split_once(':') {
        Some((head, rest)) => {
            !head.is_empty()
                && head
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                && rest.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        }
        None => false,
    }
}
