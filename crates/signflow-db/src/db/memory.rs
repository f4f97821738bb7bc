//! In-memory store
//!
//! Implements every repository trait over one mutex-guarded state so that the
//! roster, ledger and document status stay consistent with each other exactly
//! as they do in Postgres (cascading delete, conflict-free inserts, conditional
//! resolution).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use signflow_core::{
    check_sequence,
    models::{
        AuditEntry, AuditRecord, Document, DocumentStatus, NewDocument, Signature,
        SignatureStatus, SignerPageDocument, SignerRosterEntry, SignerStatus, User, UserRole,
        DEFAULT_SIGNATURE_TYPE,
    },
    AppError, AuditSink, SignatureCounts,
};
use uuid::Uuid;

use super::traits::{DocumentStore, SignatureLedger, UserDirectory};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    documents: HashMap<Uuid, Document>,
    roster: Vec<SignerRosterEntry>,
    signatures: Vec<Signature>,
    audit: Vec<AuditRecord>,
}

impl MemoryState {
    fn roster_for(&self, document_id: Uuid) -> Vec<SignerStatus> {
        let mut entries: Vec<&SignerRosterEntry> = self
            .roster
            .iter()
            .filter(|r| r.document_id == document_id)
            .collect();
        // Stable sort keeps insertion order for equal positions
        entries.sort_by_key(|r| r.order_position);

        entries
            .into_iter()
            .map(|r| {
                let signature = self
                    .signatures
                    .iter()
                    .find(|s| s.document_id == document_id && s.signer_id == r.user_id);
                let user = self.users.get(&r.user_id);
                SignerStatus {
                    user_id: r.user_id,
                    name: user.map(|u| u.name.clone()).unwrap_or_default(),
                    email: user.map(|u| u.email.clone()).unwrap_or_default(),
                    order_position: r.order_position,
                    status: signature
                        .map(|s| s.status)
                        .unwrap_or(SignatureStatus::Pending),
                    signed_at: signature.and_then(|s| s.signed_at),
                    rejected_at: signature.and_then(|s| s.rejected_at),
                }
            })
            .collect()
    }

    fn counts_for(&self, document_id: Uuid) -> SignatureCounts {
        SignatureCounts::from_statuses(
            self.signatures
                .iter()
                .filter(|s| s.document_id == document_id)
                .map(|s| &s.status),
        )
    }

    fn signature_mut(&mut self, document_id: Uuid, signer_id: Uuid) -> Option<&mut Signature> {
        self.signatures
            .iter_mut()
            .find(|s| s.document_id == document_id && s.signer_id == signer_id)
    }

    /// Check that the signer may resolve their entry right now.
    fn guard(&self, document_id: Uuid, signer_id: Uuid) -> Result<(), AppError> {
        if !self.documents.contains_key(&document_id) {
            return Err(AppError::not_found("Document", document_id));
        }

        let roster = self.roster_for(document_id);
        let check = check_sequence(&roster, signer_id)?;

        if let Some(entry) = roster.iter().find(|s| s.user_id == signer_id) {
            if entry.status.is_terminal() {
                return Err(AppError::Conflict(format!(
                    "Signature already {}",
                    entry.status.as_str()
                )));
            }
        }

        check.into_result().map(|_| ())
    }
}

/// Store backed by process memory
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Audit records in insertion order
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.state().audit.clone()
    }

    /// Number of roster entries across all documents
    pub fn roster_len(&self) -> usize {
        self.state().roster.len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create(&self, new: NewDocument) -> Result<Document, AppError> {
        let mut state = self.state();
        if !state.users.contains_key(&new.uploaded_by) {
            return Err(AppError::not_found("User", new.uploaded_by));
        }

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            file_name: new.file_name,
            file_path: new.file_path,
            file_size: new.file_size,
            mime_type: new.mime_type,
            status: DocumentStatus::Pending,
            uploaded_by: new.uploaded_by,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        state.documents.insert(document.id, document.clone());

        Ok(document)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        Ok(self.state().documents.get(&id).cloned())
    }

    async fn signer_page_info(&self, id: Uuid) -> Result<Option<SignerPageDocument>, AppError> {
        let state = self.state();
        Ok(state.documents.get(&id).map(|d| SignerPageDocument {
            title: d.title.clone(),
            created_at: d.created_at,
            uploaded_by_name: state.users.get(&d.uploaded_by).map(|u| u.name.clone()),
        }))
    }

    async fn archive(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        match state.documents.get_mut(&id) {
            Some(document) => {
                document.status = DocumentStatus::Archived;
                document.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        if state.documents.remove(&id).is_none() {
            return Ok(false);
        }
        state.roster.retain(|r| r.document_id != id);
        state.signatures.retain(|s| s.document_id != id);
        Ok(true)
    }
}

#[async_trait]
impl SignatureLedger for InMemoryStore {
    async fn assign(&self, document_id: Uuid, user_ids: &[Uuid]) -> Result<usize, AppError> {
        let mut state = self.state();
        if !state.documents.contains_key(&document_id) {
            return Err(AppError::not_found("Document", document_id));
        }
        if let Some(missing) = user_ids.iter().find(|id| !state.users.contains_key(id)) {
            return Err(AppError::not_found("User", missing));
        }

        let now = Utc::now();
        let mut added = 0;
        for (index, user_id) in user_ids.iter().enumerate() {
            let on_roster = state
                .roster
                .iter()
                .any(|r| r.document_id == document_id && r.user_id == *user_id);
            if !on_roster {
                state.roster.push(SignerRosterEntry {
                    id: Uuid::new_v4(),
                    document_id,
                    user_id: *user_id,
                    order_position: index as i32 + 1,
                    is_required: true,
                    notified_at: None,
                    created_at: now,
                });
                added += 1;
            }

            if state.signature_mut(document_id, *user_id).is_none() {
                state.signatures.push(Signature {
                    id: Uuid::new_v4(),
                    document_id,
                    signer_id: *user_id,
                    signature_data: None,
                    signature_type: DEFAULT_SIGNATURE_TYPE.to_string(),
                    status: SignatureStatus::Pending,
                    signed_at: None,
                    rejection_reason: None,
                    rejected_at: None,
                    created_at: now,
                    updated_at: now,
                });
            }
        }

        Ok(added)
    }

    async fn roster(&self, document_id: Uuid) -> Result<Vec<SignerStatus>, AppError> {
        Ok(self.state().roster_for(document_id))
    }

    async fn counts(&self, document_id: Uuid) -> Result<SignatureCounts, AppError> {
        Ok(self.state().counts_for(document_id))
    }

    async fn get_signature(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
    ) -> Result<Option<Signature>, AppError> {
        Ok(self
            .state()
            .signatures
            .iter()
            .find(|s| s.document_id == document_id && s.signer_id == signer_id)
            .cloned())
    }

    async fn record_signature(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
        signature_data: &str,
    ) -> Result<Signature, AppError> {
        let mut state = self.state();
        state.guard(document_id, signer_id)?;

        let now = Utc::now();
        let signature = state
            .signature_mut(document_id, signer_id)
            .ok_or(AppError::NotAssigned)?;
        signature.status = SignatureStatus::Signed;
        signature.signature_data = Some(signature_data.to_string());
        signature.signed_at = Some(now);
        signature.updated_at = now;

        Ok(signature.clone())
    }

    async fn record_rejection(
        &self,
        document_id: Uuid,
        signer_id: Uuid,
        reason: &str,
    ) -> Result<Signature, AppError> {
        let mut state = self.state();
        state.guard(document_id, signer_id)?;

        let now = Utc::now();
        let signature = state
            .signature_mut(document_id, signer_id)
            .ok_or(AppError::NotAssigned)?;
        signature.status = SignatureStatus::Rejected;
        signature.rejection_reason = Some(reason.to_string());
        signature.rejected_at = Some(now);
        signature.signed_at = Some(now);
        signature.updated_at = now;

        Ok(signature.clone())
    }

    async fn recompute_status(&self, document_id: Uuid) -> Result<Option<DocumentStatus>, AppError> {
        let mut state = self.state();
        let counts = state.counts_for(document_id);

        let document = match state.documents.get_mut(&document_id) {
            Some(document) => document,
            None => return Ok(None),
        };
        if document.status == DocumentStatus::Archived {
            return Ok(Some(document.status));
        }

        let now = Utc::now();
        let status = counts.status();
        document.status = status;
        document.updated_at = now;
        if status == DocumentStatus::Completed && document.completed_at.is_none() {
            document.completed_at = Some(now);
        }

        Ok(Some(status))
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.state().users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn create_user(&self, name: &str, email: &str, role: UserRole) -> Result<User, AppError> {
        let mut state = self.state();
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email))
        {
            return Err(AppError::Conflict(format!(
                "User with email {} already exists",
                email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            ad_username: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn available_signers(&self, acting_user_id: Uuid) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self
            .state()
            .users
            .values()
            .filter(|u| u.is_active)
            .cloned()
            .collect();
        users.sort_by(|a, b| {
            (a.id != acting_user_id)
                .cmp(&(b.id != acting_user_id))
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(users)
    }
}

#[async_trait]
impl AuditSink for InMemoryStore {
    async fn record(&self, entry: AuditEntry) -> Result<(), AppError> {
        self.state().audit.push(AuditRecord {
            id: Uuid::new_v4(),
            user_id: entry.user_id,
            action: entry.action.as_str().to_string(),
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            details: entry.details,
            ip_address: None,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(signers: usize) -> (InMemoryStore, Document, Vec<User>) {
        let store = InMemoryStore::new();
        let owner = store
            .create_user("Owner", "owner@example.com", UserRole::User)
            .await
            .unwrap();
        let document = store
            .create(NewDocument {
                title: "Contract".to_string(),
                description: None,
                file_name: "contract.pdf".to_string(),
                file_path: "uploads/owner/contract.pdf".to_string(),
                file_size: 1024,
                mime_type: "application/pdf".to_string(),
                uploaded_by: owner.id,
            })
            .await
            .unwrap();

        let mut users = Vec::new();
        for i in 0..signers {
            users.push(
                store
                    .create_user(&format!("Signer {}", i + 1), &format!("s{}@example.com", i + 1), UserRole::User)
                    .await
                    .unwrap(),
            );
        }
        (store, document, users)
    }

    #[tokio::test]
    async fn assign_is_idempotent_per_pair() {
        let (store, doc, users) = seeded(2).await;
        let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();

        assert_eq!(store.assign(doc.id, &ids).await.unwrap(), 2);
        assert_eq!(store.assign(doc.id, &ids).await.unwrap(), 0);
        assert_eq!(store.roster_len(), 2);

        let roster = store.roster(doc.id).await.unwrap();
        assert_eq!(roster[0].order_position, 1);
        assert_eq!(roster[1].order_position, 2);
        assert_eq!(roster[1].name, "Signer 2");
    }

    #[tokio::test]
    async fn second_signer_waits_for_first() {
        let (store, doc, users) = seeded(2).await;
        store.assign(doc.id, &[users[0].id, users[1].id]).await.unwrap();

        let err = store
            .record_signature(doc.id, users[1].id, "sig")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OutOfOrder { order_position: 1, .. }));

        store.record_signature(doc.id, users[0].id, "sig").await.unwrap();
        store.record_signature(doc.id, users[1].id, "sig").await.unwrap();

        let status = store.recompute_status(doc.id).await.unwrap();
        assert_eq!(status, Some(DocumentStatus::Completed));
        let doc = store.get(doc.id).await.unwrap().unwrap();
        assert!(doc.completed_at.is_some());
    }

    #[tokio::test]
    async fn resolved_entry_cannot_change() {
        let (store, doc, users) = seeded(1).await;
        store.assign(doc.id, &[users[0].id]).await.unwrap();
        store
            .record_rejection(doc.id, users[0].id, "wrong amounts in annex")
            .await
            .unwrap();

        let err = store
            .record_signature(doc.id, users[0].id, "sig")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let sig = store.get_signature(doc.id, users[0].id).await.unwrap().unwrap();
        assert_eq!(sig.status, SignatureStatus::Rejected);
        assert_eq!(sig.signed_at, sig.rejected_at);
    }

    #[tokio::test]
    async fn archived_status_is_not_recomputed() {
        let (store, doc, users) = seeded(1).await;
        store.assign(doc.id, &[users[0].id]).await.unwrap();
        store.archive(doc.id).await.unwrap();
        store.record_signature(doc.id, users[0].id, "sig").await.unwrap();

        let status = store.recompute_status(doc.id).await.unwrap();
        assert_eq!(status, Some(DocumentStatus::Archived));
    }

    #[tokio::test]
    async fn delete_cascades_to_roster_and_ledger() {
        let (store, doc, users) = seeded(2).await;
        store.assign(doc.id, &[users[0].id, users[1].id]).await.unwrap();

        assert!(store.delete(doc.id).await.unwrap());
        assert_eq!(store.roster_len(), 0);
        assert_eq!(store.counts(doc.id).await.unwrap(), SignatureCounts::default());
        assert!(!store.delete(doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn available_signers_puts_acting_user_first() {
        let (store, _doc, users) = seeded(3).await;
        let signers = store.available_signers(users[2].id).await.unwrap();
        assert_eq!(signers[0].id, users[2].id);
        assert_eq!(signers[1].name, "Owner");
        assert_eq!(signers[2].name, "Signer 1");
    }
}
