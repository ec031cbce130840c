use context_graph::normalize_path;

/// Source file a retrieved text belongs to, read from its first non-empty
/// line: a `File: <path>` / `Path: <path>` label, or a code fence whose next
/// line is a comment naming a file (`// src/a.ts`, `# a.py`, `-- q.sql`,
/// `/* a.ts */`).
pub fn extract_file_path(text: &str) -> Option<String> {
    let mut lines = text.lines().map(str::trim).skip_while(|l| l.is_empty());
    let first = lines.next()?;

    if let Some(path) = labeled_path(first) {
        return Some(normalize_path(path));
    }

    if first.starts_with("```") {
        let comment = lines.next()?;
        let body = comment_body(comment)?;
        let path = labeled_path(body).or_else(|| first_path_token(body))?;
        return Some(normalize_path(path));
    }

    None
}

fn labeled_path(line: &str) -> Option<&str> {
    let (label, rest) = line.split_once(':')?;
    let label = label.trim();
    if !(label.eq_ignore_ascii_case("file") || label.eq_ignore_ascii_case("path")) {
        return None;
    }
    let path = rest.trim();
    (!path.is_empty()).then_some(path)
}

fn comment_body(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("/*") {
        return Some(rest.trim_end().trim_end_matches("*/").trim());
    }
    ["//", "--", "#"]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim)
}

fn first_path_token(body: &str) -> Option<&str> {
    let token = body.split_whitespace().next()?;
    has_extension(token).then_some(token)
}

fn has_extension(token: &str) -> bool {
    let name = token.rsplit('/').next().unwrap_or(token);
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}
