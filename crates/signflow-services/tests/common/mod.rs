#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use signflow_core::{
    models::{AuditEntry, Document, NewDocument, SignerPageDocument, SignerStatus, User, UserRole},
    AppError, AuditSink, SignerPageSync,
};
use signflow_db::{DocumentStore, InMemoryStore, UserDirectory};
use signflow_services::{LocalStorage, Storage, WorkflowEngine};
use tempfile::TempDir;

/// Signer page stub that remembers every roster it was handed
#[derive(Default)]
pub struct RecordingSync {
    pub calls: Mutex<Vec<(String, Vec<SignerStatus>)>>,
    pub fail: bool,
}

impl RecordingSync {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_roster(&self) -> Vec<SignerStatus> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, roster)| roster.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SignerPageSync for RecordingSync {
    async fn sync(
        &self,
        file_path: &str,
        signers: &[SignerStatus],
        _document: &SignerPageDocument,
    ) -> Result<(), AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((file_path.to_string(), signers.to_vec()));
        if self.fail {
            return Err(AppError::Pdf("stub failure".to_string()));
        }
        Ok(())
    }
}

/// Audit sink that always fails
pub struct BrokenAudit;

#[async_trait]
impl AuditSink for BrokenAudit {
    async fn record(&self, _entry: AuditEntry) -> Result<(), AppError> {
        Err(AppError::Internal("audit store offline".to_string()))
    }
}

pub struct Harness {
    pub store: InMemoryStore,
    pub storage: Arc<LocalStorage>,
    pub sync: Arc<RecordingSync>,
    pub engine: Arc<WorkflowEngine>,
    pub owner: User,
    pub admin: User,
    pub signers: Vec<User>,
    pub document: Document,
    _dir: TempDir,
}

pub async fn harness(signers: usize) -> Harness {
    build(signers, RecordingSync::default(), None).await
}

pub async fn harness_with(
    signers: usize,
    sync: RecordingSync,
    audit: Option<Arc<dyn AuditSink>>,
) -> Harness {
    build(signers, sync, audit).await
}

async fn build(signers: usize, sync: RecordingSync, audit: Option<Arc<dyn AuditSink>>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
    let store = InMemoryStore::new();
    let sync = Arc::new(sync);

    let owner = store
        .create_user("Olga Owner", "owner@example.com", UserRole::User)
        .await
        .unwrap();
    let admin = store
        .create_user("Ada Admin", "admin@example.com", UserRole::Admin)
        .await
        .unwrap();
    let mut users = Vec::new();
    for i in 0..signers {
        users.push(
            store
                .create_user(
                    &format!("Signer {}", i + 1),
                    &format!("signer{}@example.com", i + 1),
                    UserRole::User,
                )
                .await
                .unwrap(),
        );
    }

    let file_path = "uploads/olga_owner/contract.pdf".to_string();
    storage
        .upload("olga_owner/contract.pdf", sample_pdf(1))
        .await
        .unwrap();
    let document = store
        .create(NewDocument {
            title: "Supply contract".to_string(),
            description: None,
            file_name: "contract.pdf".to_string(),
            file_path,
            file_size: 1024,
            mime_type: "application/pdf".to_string(),
            uploaded_by: owner.id,
        })
        .await
        .unwrap();

    let shared = Arc::new(store.clone());
    let audit: Arc<dyn AuditSink> = audit.unwrap_or_else(|| shared.clone() as Arc<dyn AuditSink>);
    let engine = Arc::new(WorkflowEngine::new(
        shared.clone(),
        shared,
        storage.clone(),
        sync.clone(),
        audit,
    ));

    Harness {
        store,
        storage,
        sync,
        engine,
        owner,
        admin,
        signers: users,
        document,
        _dir: dir,
    }
}

impl Harness {
    pub fn signer_ids(&self) -> Vec<uuid::Uuid> {
        self.signers.iter().map(|u| u.id).collect()
    }

    pub async fn assign_all(&self) {
        self.engine
            .assign_signers(self.document.id, &self.signer_ids(), Some(self.owner.acting()))
            .await
            .unwrap();
    }

    pub async fn document(&self) -> Document {
        self.store.get(self.document.id).await.unwrap().unwrap()
    }

    pub async fn stored_file_exists(&self) -> bool {
        self.storage.exists("olga_owner/contract.pdf").await.unwrap()
    }
}

/// Minimal PDF with `pages` pages
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for i in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {}", i + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
