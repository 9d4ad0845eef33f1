/// Same-file type name resolution.
///
/// Maps a type token as written in source to a best-guess qualified name
/// using only the file's imports and the types it declares itself. This is
/// not a symbol table: nothing outside the file is consulted and wildcard
/// imports never resolve.
#[derive(Debug, Default, Clone)]
pub struct TypeResolver {
    source_file: String,
    imports: Vec<String>,
    local_types: Vec<String>,
}

/// `java.util.List`, `org.x.Y<Z>`: a lowercase-led segment directly followed
/// by a dot.
fn looks_qualified(raw: &str) -> bool {
    let mut chars = raw.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    for c in chars {
        if c == '.' {
            return true;
        }
        if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return false;
        }
    }
    false
}

/// Entries whose last dotted segment is `base`.
fn suffix_matches<'a>(entries: &'a [String], base: &str) -> Vec<&'a str> {
    let mut found: Vec<&str> = entries
        .iter()
        .map(String::as_str)
        .filter(|entry| {
            *entry == base
                || entry
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .collect();
    found.sort_unstable();
    found.dedup();
    found
}

impl TypeResolver {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Default::default()
        }
    }

    pub fn add_import(&mut self, import: impl Into<String>) {
        self.imports.push(import.into());
    }

    pub fn add_local_type(&mut self, qualified: impl Into<String>) {
        self.local_types.push(qualified.into());
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn local_types(&self) -> &[String] {
        &self.local_types
    }

    pub fn resolve(&self, raw: &str) -> String {
        let (base, generics) = match raw.find('<') {
            Some(idx) => raw.split_at(idx),
            None => (raw, ""),
        };

        if looks_qualified(raw) {
            return raw.to_string();
        }

        match suffix_matches(&self.local_types, base).as_slice() {
            [only] => return format!("{only}{generics}"),
            [] => {}
            many => tracing::info!(
                file = %self.source_file,
                token = raw,
                candidates = many.len(),
                "ambiguous local type"
            ),
        }

        match suffix_matches(&self.imports, base).as_slice() {
            [only] => return format!("{only}{generics}"),
            [] => {}
            many => tracing::info!(
                file = %self.source_file,
                token = raw,
                candidates = many.len(),
                "ambiguous import"
            ),
        }

        tracing::debug!(file = %self.source_file, token = raw, "type left unresolved");
        raw.to_string()
    }
}
