/// Candidates tried, in order, for a relative import specifier
pub const IMPORT_PROBE_SUFFIXES: [&str; 6] = [".ts", ".tsx", ".js", ".jsx", "/index.ts", "/index.tsx"];

/// Lexically normalize a project path: `/` separators, no `.` segments,
/// `..` folded into the parent, no leading `./`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Resolve a relative import from `importer` to a known file path.
/// Bare specifiers (packages, aliases) are never resolved.
pub fn resolve_import(importer: &str, specifier: &str, is_known: impl Fn(&str) -> bool) -> Option<String> {
    if !specifier.starts_with('.') {
        return None;
    }

    let dir = importer.rsplit_once('/').map_or("", |(dir, _)| dir);
    let base = if dir.is_empty() {
        normalize_path(specifier)
    } else {
        normalize_path(&format!("{dir}/{specifier}"))
    };

    IMPORT_PROBE_SUFFIXES
        .iter()
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| is_known(candidate))
}
