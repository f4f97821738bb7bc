//! Document upload
//!
//! Validates incoming PDFs, stores them under the uploader's folder and creates
//! the `pending` document row. Several files can be merged into one document.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use serde_json::json;
use signflow_core::{
    models::{ActingUser, AuditAction, AuditEntry, Document, NewDocument, User},
    validation::{normalize_name, upload_relative_path},
    AppError, AuditSink,
};
use signflow_db::{DocumentStore, UserDirectory};
use signflow_processing::{merge_pdfs, page_count, PdfValidator};
use signflow_storage::{storage_key, Storage};
use validator::Validate;

use crate::engine::require_user;

const PDF_MIME_TYPE: &str = "application/pdf";
const MERGED_FILE_STEM: &str = "merged";
const MERGED_DEFAULT_TITLE: &str = "Merged document";
const FALLBACK_STEM: &str = "document";
pub const MAX_MERGE_FILES: usize = 20;

/// File received from the caller
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn pdf(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: PDF_MIME_TYPE.to_string(),
            data,
        }
    }

    fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// Optional metadata supplied with an upload
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Sub-folder label; defaults to the title
    pub group: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `{stem}-{millis}-{random}.pdf`
fn unique_file_name(stem: &str) -> String {
    let stem = match normalize_name(stem) {
        s if s.is_empty() => FALLBACK_STEM.to_string(),
        s => s,
    };
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    format!(
        "{}-{}-{}.pdf",
        stem,
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

pub struct UploadService {
    documents: Arc<dyn DocumentStore>,
    users: Arc<dyn UserDirectory>,
    storage: Arc<dyn Storage>,
    audit: Arc<dyn AuditSink>,
    validator: PdfValidator,
}

impl UploadService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        users: Arc<dyn UserDirectory>,
        storage: Arc<dyn Storage>,
        audit: Arc<dyn AuditSink>,
        max_file_size: usize,
    ) -> Self {
        Self {
            documents,
            users,
            storage,
            audit,
            validator: PdfValidator::new(max_file_size),
        }
    }

    async fn uploader(&self, acting: Option<ActingUser>) -> Result<User, AppError> {
        let acting = require_user(acting)?;
        self.users
            .get_user(acting.id)
            .await?
            .ok_or(AppError::NotAuthenticated)
    }

    /// Folder label for the uploader; the id when the name normalizes to nothing.
    fn folder_label(user: &User) -> String {
        if normalize_name(&user.name).is_empty() {
            user.id.to_string()
        } else {
            user.name.clone()
        }
    }

    /// Upload a single PDF as a new `pending` document.
    #[tracing::instrument(skip(self, acting, file, options), fields(file_name = %file.file_name, size_bytes = file.data.len()))]
    pub async fn upload(
        &self,
        acting: Option<ActingUser>,
        file: UploadedFile,
        options: UploadOptions,
    ) -> Result<Document, AppError> {
        let user = self.uploader(acting).await?;
        self.validator
            .validate(&file.file_name, &file.content_type, &file.data)?;

        let title = non_blank(options.title.as_deref()).unwrap_or_else(|| file.stem().to_string());
        let group = non_blank(options.group.as_deref()).or_else(|| non_blank(options.title.as_deref()));
        let stored_name = unique_file_name(file.stem());
        let file_path = upload_relative_path(&Self::folder_label(&user), group.as_deref(), &stored_name);

        let new = NewDocument {
            title: title.clone(),
            description: non_blank(options.description.as_deref()),
            file_name: stored_name.clone(),
            file_path,
            file_size: file.data.len() as i64,
            mime_type: PDF_MIME_TYPE.to_string(),
            uploaded_by: user.id,
        };
        let document = self.store_and_create(new, file.data).await?;

        self.record_audit(
            AuditEntry::document(user.id, AuditAction::Upload, document.id)
                .with_details(json!({ "title": title, "file_name": stored_name })),
        )
        .await;

        tracing::info!(
            document_id = %document.id,
            file_path = %document.file_path,
            "Document uploaded"
        );
        Ok(document)
    }

    /// Merge several PDFs, in the given order, into one new document.
    #[tracing::instrument(skip(self, acting, files, options), fields(files = files.len()))]
    pub async fn upload_merged(
        &self,
        acting: Option<ActingUser>,
        files: Vec<UploadedFile>,
        options: UploadOptions,
    ) -> Result<Document, AppError> {
        let user = self.uploader(acting).await?;
        if files.len() < 2 {
            return Err(AppError::InvalidInput(
                "At least two files are required to merge".to_string(),
            ));
        }
        if files.len() > MAX_MERGE_FILES {
            return Err(AppError::InvalidInput(format!(
                "At most {} files can be merged",
                MAX_MERGE_FILES
            )));
        }

        let mut invalid = Vec::new();
        for file in &files {
            if let Err(e) = self
                .validator
                .validate(&file.file_name, &file.content_type, &file.data)
            {
                invalid.push(format!("{}: {}", file.file_name, e));
            }
        }
        if !invalid.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "One or more files are not valid PDFs ({})",
                invalid.join("; ")
            )));
        }

        let source_files: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
        let inputs: Vec<Vec<u8>> = files.into_iter().map(|f| f.data).collect();
        let file_count = inputs.len();
        let (merged, total_pages) = tokio::task::spawn_blocking(move || {
            let merged = merge_pdfs(&inputs)?;
            let pages = page_count(&merged)?;
            Ok::<_, AppError>((merged, pages))
        })
        .await
        .map_err(|e| AppError::Internal(format!("PDF merge task failed: {}", e)))??;

        if merged.len() > self.validator.max_file_size() {
            return Err(AppError::PayloadTooLarge(format!(
                "Merged document is {} bytes (max: {} bytes)",
                merged.len(),
                self.validator.max_file_size()
            )));
        }

        let title = non_blank(options.title.as_deref())
            .unwrap_or_else(|| MERGED_DEFAULT_TITLE.to_string());
        let description = non_blank(options.description.as_deref())
            .unwrap_or_else(|| format!("Merged from {} files", file_count));
        let stored_name = unique_file_name(MERGED_FILE_STEM);
        let group = non_blank(options.group.as_deref());
        let file_path = upload_relative_path(&Self::folder_label(&user), group.as_deref(), &stored_name);

        let new = NewDocument {
            title: title.clone(),
            description: Some(description),
            file_name: stored_name.clone(),
            file_path,
            file_size: merged.len() as i64,
            mime_type: PDF_MIME_TYPE.to_string(),
            uploaded_by: user.id,
        };
        let document = self.store_and_create(new, merged).await?;

        self.record_audit(
            AuditEntry::document(user.id, AuditAction::Upload, document.id).with_details(json!({
                "title": title,
                "file_name": stored_name,
                "files_merged": file_count,
                "total_pages": total_pages,
                "source_files": source_files,
            })),
        )
        .await;

        tracing::info!(
            document_id = %document.id,
            files_merged = file_count,
            total_pages,
            "Merged document uploaded"
        );
        Ok(document)
    }

    /// Write the file, then insert the row. The file is removed if the insert fails.
    async fn store_and_create(&self, new: NewDocument, data: Vec<u8>) -> Result<Document, AppError> {
        new.validate()?;
        let key = storage_key(&new.file_path).to_string();
        self.storage.upload(&key, data).await?;

        match self.documents.create(new).await {
            Ok(document) => Ok(document),
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&key).await {
                    tracing::warn!(
                        error = %cleanup,
                        key = %key,
                        "Failed to remove stored file after insert failure"
                    );
                }
                Err(e)
            }
        }
    }

    async fn record_audit(&self, entry: AuditEntry) {
        if let Err(e) = self.audit.record(entry).await {
            tracing::warn!(error = %e, "Failed to write upload audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_name_uses_normalized_stem() {
        let name = unique_file_name("Contrato Ñandú");
        assert!(name.starts_with("contrato_nandu-"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.split('-').count(), 3);
    }

    #[test]
    fn unique_name_falls_back_for_empty_stem() {
        assert!(unique_file_name("***").starts_with("document-"));
    }

    #[test]
    fn stem_strips_extension() {
        let file = UploadedFile::pdf("Annual report.pdf", Vec::new());
        assert_eq!(file.stem(), "Annual report");
    }

    #[test]
    fn blank_values_are_dropped() {
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some(" Q1 ")), Some("Q1".to_string()));
        assert_eq!(non_blank(None), None);
    }
}
