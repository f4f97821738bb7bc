//! Wiring and output helpers for the `signflow` binary.

pub mod setup;

use anyhow::Context;
use serde::Serialize;
use signflow_core::models::{SignatureStatus, SignerStatus};

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Content type guessed from the file extension
pub fn content_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// One line per roster entry: position, name, status and resolution time
pub fn roster_table(roster: &[SignerStatus]) -> String {
    let mut lines = Vec::with_capacity(roster.len() + 1);
    lines.push(format!("{:<4} {:<30} {:<10} {}", "#", "SIGNER", "STATUS", "AT"));
    for entry in roster {
        let at = match entry.status {
            SignatureStatus::Signed => entry.signed_at,
            SignatureStatus::Rejected => entry.rejected_at,
            SignatureStatus::Pending => None,
        };
        lines.push(format!(
            "{:<4} {:<30} {:<10} {}",
            entry.order_position,
            truncate_string(&entry.name, 30),
            entry.status.as_str(),
            at.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string())
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("Ñoño Núñez", 7), "Ñoño...");
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(
            content_type_for(std::path::Path::new("a/Contract.PDF")),
            "application/pdf"
        );
        assert_eq!(
            content_type_for(std::path::Path::new("notes.txt")),
            "application/octet-stream"
        );
    }

    #[test]
    fn roster_table_lists_each_signer() {
        let roster = vec![
            SignerStatus {
                user_id: Uuid::new_v4(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                order_position: 1,
                status: SignatureStatus::Signed,
                signed_at: Some(chrono::Utc::now()),
                rejected_at: None,
            },
            SignerStatus {
                user_id: Uuid::new_v4(),
                name: "Bea".to_string(),
                email: "bea@example.com".to_string(),
                order_position: 2,
                status: SignatureStatus::Pending,
                signed_at: None,
                rejected_at: None,
            },
        ];
        let table = roster_table(&roster);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("signed"));
        assert!(lines[2].trim_end().ends_with('-'));
    }
}
