//! Folder-name normalization and stored-path helpers for uploaded PDFs.
//!
//! Stored paths look like `uploads/{user}/{group}/{file}` where `{user}` and
//! `{group}` are normalized names and `{group}` is optional.

use regex::Regex;
use std::sync::LazyLock;

/// Prefix carried by every stored document path
pub const UPLOADS_PREFIX: &str = "uploads/";

static NON_ALNUM_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid static pattern"));

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Normalize a display name into a folder-safe segment.
///
/// Lowercases, folds Latin accents, collapses every run of characters outside
/// `[a-z0-9]` into one `_` and trims leading/trailing `_`.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name.to_lowercase().chars().map(fold_accent).collect();
    NON_ALNUM_RUNS
        .replace_all(&folded, "_")
        .trim_matches('_')
        .to_string()
}

/// Build the stored relative path for an uploaded file.
pub fn upload_relative_path(user_name: &str, group: Option<&str>, file_name: &str) -> String {
    let user = normalize_name(user_name);
    match group.map(normalize_name).filter(|g| !g.is_empty()) {
        Some(group) => format!("{}{}/{}/{}", UPLOADS_PREFIX, user, group, file_name),
        None => format!("{}{}/{}", UPLOADS_PREFIX, user, file_name),
    }
}

/// Strip the `uploads/` prefix to get a key relative to the upload root.
pub fn strip_uploads_prefix(file_path: &str) -> &str {
    file_path.strip_prefix(UPLOADS_PREFIX).unwrap_or(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_accents_and_spaces() {
        assert_eq!(normalize_name("José Pérez"), "jose_perez");
        assert_eq!(normalize_name("  María  Núñez!! "), "maria_nunez");
        assert_eq!(normalize_name("Contrato 2024 / Q1"), "contrato_2024_q1");
    }

    #[test]
    fn normalizes_to_empty() {
        assert_eq!(normalize_name("***"), "");
    }

    #[test]
    fn builds_paths_with_and_without_group() {
        assert_eq!(
            upload_relative_path("Ana Gómez", None, "a-1.pdf"),
            "uploads/ana_gomez/a-1.pdf"
        );
        assert_eq!(
            upload_relative_path("Ana Gómez", Some("Contratos 2024"), "a-1.pdf"),
            "uploads/ana_gomez/contratos_2024/a-1.pdf"
        );
        assert_eq!(
            upload_relative_path("Ana", Some("  "), "a.pdf"),
            "uploads/ana/a.pdf"
        );
    }

    #[test]
    fn strips_prefix_once() {
        assert_eq!(strip_uploads_prefix("uploads/ana/a.pdf"), "ana/a.pdf");
        assert_eq!(strip_uploads_prefix("ana/a.pdf"), "ana/a.pdf");
    }
}
