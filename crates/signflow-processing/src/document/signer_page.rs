//! Trailing signer summary page
//!
//! Every PDF under signature carries one extra page at the end listing the
//! roster and each signer's state. The page is tagged with a private key in its
//! page dictionary so it can be found and replaced on the next sync without
//! ever touching the document's own pages.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use signflow_core::{
    models::{SignatureStatus, SignerPageDocument, SignerStatus},
    AppError, SignerPageSync,
};
use signflow_storage::{storage_key, Storage};

use crate::{pdf_error, pdf_write_error};
use crate::text::{truncate_chars, win_ansi_bytes};

/// Page dictionary key that marks the summary page
pub const SIGNER_PAGE_MARKER: &str = "SignflowSignerPage";

// A4 in points
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 50.0;
const ROW_HEIGHT: f32 = 45.0;
const OVERFLOW_Y: f32 = 100.0;
const FOOTER_Y: f32 = 60.0;

const MAX_TITLE_CHARS: usize = 60;
const MAX_NAME_CHARS: usize = 40;
const MAX_EMAIL_CHARS: usize = 45;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";
const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

type Rgb = (f32, f32, f32);

const ACCENT: Rgb = (0.4, 0.42, 0.95);
const WHITE: Rgb = (1.0, 1.0, 1.0);
const BLACK: Rgb = (0.0, 0.0, 0.0);
const HEADING: Rgb = (0.2, 0.2, 0.2);
const LABEL: Rgb = (0.3, 0.3, 0.3);
const MUTED: Rgb = (0.4, 0.4, 0.4);
const FAINT: Rgb = (0.5, 0.5, 0.5);
const RULE: Rgb = (0.7, 0.7, 0.7);
const PENDING: Rgb = (0.8, 0.6, 0.0);
const SIGNED: Rgb = (0.13, 0.55, 0.13);
const REJECTED: Rgb = (0.86, 0.15, 0.15);

/// Content operations of a rendered summary page
#[derive(Debug)]
pub struct SignerPageLayout {
    pub operations: Vec<Operation>,
    pub rows_drawn: usize,
    pub overflowed: bool,
}

#[derive(Default)]
struct Painter {
    ops: Vec<Operation>,
}

impl Painter {
    fn fill_color(&mut self, (r, g, b): Rgb) {
        self.ops
            .push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
    }

    fn text(&mut self, font: &str, size: f32, color: Rgb, x: f32, y: f32, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.fill_color(color);
        self.ops
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::String(win_ansi_bytes(text), StringFormat::Literal)],
        ));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn rect(&mut self, color: Rgb, x: f32, y: f32, width: f32, height: f32) {
        self.fill_color(color);
        self.ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        self.ops.push(Operation::new("f", vec![]));
    }

    fn line(&mut self, (r, g, b): Rgb, width: f32, from: (f32, f32), to: (f32, f32)) {
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops
            .push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
        self.ops
            .push(Operation::new("m", vec![from.0.into(), from.1.into()]));
        self.ops
            .push(Operation::new("l", vec![to.0.into(), to.1.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    /// Filled circle from four cubic Bezier arcs
    fn circle(&mut self, color: Rgb, cx: f32, cy: f32, r: f32) {
        let k = 0.552_284_8 * r;
        self.fill_color(color);
        self.ops
            .push(Operation::new("m", vec![(cx + r).into(), cy.into()]));
        let arcs = [
            [cx + r, cy + k, cx + k, cy + r, cx, cy + r],
            [cx - k, cy + r, cx - r, cy + k, cx - r, cy],
            [cx - r, cy - k, cx - k, cy - r, cx, cy - r],
            [cx + k, cy - r, cx + r, cy - k, cx + r, cy],
        ];
        for arc in arcs {
            self.ops.push(Operation::new(
                "c",
                arc.iter().map(|v| Object::Real(*v)).collect(),
            ));
        }
        self.ops.push(Operation::new("f", vec![]));
    }
}

fn format_timestamp(at: DateTime<Utc>, timezone: Tz) -> String {
    at.with_timezone(&timezone).format(DATE_FORMAT).to_string()
}

fn status_label(signer: &SignerStatus) -> (&'static str, Rgb, Option<DateTime<Utc>>) {
    match signer.status {
        SignatureStatus::Pending => ("[ PENDING ]", PENDING, None),
        SignatureStatus::Signed => ("[ SIGNED ]", SIGNED, signer.signed_at),
        SignatureStatus::Rejected => ("[ REJECTED ]", REJECTED, signer.rejected_at),
    }
}

/// Render the summary page for `signers`.
///
/// Signers are listed by position. When the list runs past the bottom margin a
/// single overflow line replaces the remaining rows.
pub fn layout_signer_page(
    signers: &[SignerStatus],
    document: &SignerPageDocument,
    timezone: Tz,
    generated_at: DateTime<Utc>,
) -> SignerPageLayout {
    let mut p = Painter::default();

    // Header band
    p.rect(ACCENT, 0.0, PAGE_HEIGHT - 80.0, PAGE_WIDTH, 80.0);
    p.text(FONT_BOLD, 20.0, WHITE, MARGIN, PAGE_HEIGHT - 45.0, "DIGITAL SIGNATURE SYSTEM");
    p.text(FONT_REGULAR, 12.0, WHITE, MARGIN, PAGE_HEIGHT - 65.0, "Signer summary");

    let mut y = PAGE_HEIGHT - 120.0;
    p.text(FONT_BOLD, 14.0, HEADING, MARGIN, y, "DOCUMENT INFORMATION");

    y -= 30.0;
    let title = if document.title.is_empty() {
        "Untitled".to_string()
    } else {
        truncate_chars(&document.title, MAX_TITLE_CHARS)
    };
    p.text(FONT_BOLD, 11.0, LABEL, MARGIN, y, "Title:");
    p.text(FONT_REGULAR, 11.0, BLACK, MARGIN + 100.0, y, &title);

    y -= 25.0;
    p.text(FONT_BOLD, 11.0, LABEL, MARGIN, y, "Created:");
    p.text(
        FONT_REGULAR,
        11.0,
        BLACK,
        MARGIN + 100.0,
        y,
        &format_timestamp(document.created_at, timezone),
    );

    y -= 25.0;
    p.text(FONT_BOLD, 11.0, LABEL, MARGIN, y, "Created by:");
    p.text(
        FONT_REGULAR,
        11.0,
        BLACK,
        MARGIN + 100.0,
        y,
        document.uploaded_by_name.as_deref().unwrap_or("System"),
    );

    y -= 40.0;
    p.text(FONT_BOLD, 14.0, HEADING, MARGIN, y, "ASSIGNED SIGNERS");
    y -= 10.0;
    p.line(RULE, 1.0, (MARGIN, y), (PAGE_WIDTH - MARGIN, y));
    y -= 25.0;

    let mut ordered: Vec<&SignerStatus> = signers.iter().collect();
    ordered.sort_by_key(|s| s.order_position);

    let mut rows_drawn = 0;
    let mut overflowed = false;
    for signer in ordered {
        if y < OVERFLOW_Y {
            p.text(
                FONT_REGULAR,
                10.0,
                FAINT,
                MARGIN + 40.0,
                y,
                "...and more signers (see the signature records)",
            );
            overflowed = true;
            break;
        }

        let badge_x = MARGIN + 10.0;
        p.circle(ACCENT, badge_x, y + 5.0, 12.0);
        let badge_offset = if signer.order_position < 10 { 4.0 } else { 7.0 };
        p.text(
            FONT_BOLD,
            12.0,
            WHITE,
            badge_x - badge_offset,
            y + 1.0,
            &signer.order_position.to_string(),
        );

        let name = if signer.name.is_empty() {
            "Unnamed".to_string()
        } else {
            truncate_chars(&signer.name, MAX_NAME_CHARS)
        };
        p.text(FONT_BOLD, 11.0, BLACK, MARGIN + 45.0, y + 8.0, &name);
        p.text(
            FONT_REGULAR,
            9.0,
            MUTED,
            MARGIN + 45.0,
            y - 7.0,
            &truncate_chars(&signer.email, MAX_EMAIL_CHARS),
        );

        let (label, color, resolved_at) = status_label(signer);
        let status_x = PAGE_WIDTH - MARGIN - 85.0;
        p.text(FONT_BOLD, 9.0, color, status_x, y + 8.0, label);
        if let Some(at) = resolved_at {
            p.text(
                FONT_REGULAR,
                7.0,
                FAINT,
                status_x,
                y - 5.0,
                &format_timestamp(at, timezone),
            );
        }

        rows_drawn += 1;
        y -= ROW_HEIGHT;
    }

    // Footer
    p.line(
        RULE,
        0.5,
        (MARGIN, FOOTER_Y + 20.0),
        (PAGE_WIDTH - MARGIN, FOOTER_Y + 20.0),
    );
    p.text(
        FONT_BOLD,
        9.0,
        (0.8, 0.3, 0.3),
        MARGIN,
        FOOTER_Y,
        "IMPORTANT: This document requires sequential signing.",
    );
    p.text(
        FONT_REGULAR,
        8.0,
        MUTED,
        MARGIN,
        FOOTER_Y - 12.0,
        "Each signer must wait for the previous signer to complete their signature.",
    );
    p.text(
        FONT_REGULAR,
        7.0,
        (0.6, 0.6, 0.6),
        MARGIN,
        FOOTER_Y - 30.0,
        &format!(
            "Page generated automatically on {}",
            format_timestamp(generated_at, timezone)
        ),
    );

    SignerPageLayout {
        operations: p.ops,
        rows_drawn,
        overflowed,
    }
}

fn is_signer_page(doc: &Document, page_id: ObjectId) -> bool {
    doc.get_dictionary(page_id)
        .and_then(|page| page.get(SIGNER_PAGE_MARKER.as_bytes()))
        .and_then(Object::as_bool)
        .unwrap_or(false)
}

/// Drop the last page if it is a summary page. Returns whether one was removed.
fn remove_trailing_signer_page(doc: &mut Document) -> bool {
    let last = doc.get_pages().into_iter().next_back();
    match last {
        Some((number, page_id)) if is_signer_page(doc, page_id) => {
            doc.delete_pages(&[number]);
            doc.prune_objects();
            true
        }
        _ => false,
    }
}

fn root_pages_id(doc: &Document) -> Result<ObjectId, AppError> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|root| doc.get_dictionary(root))
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(pdf_error)
}

fn append_page(doc: &mut Document, operations: Vec<Operation>) -> Result<ObjectId, AppError> {
    let pages_id = root_pages_id(doc)?;

    let content = Content { operations }.encode().map_err(pdf_error)?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(PAGE_WIDTH),
            Object::Real(PAGE_HEIGHT),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! {
                FONT_REGULAR => font_regular,
                FONT_BOLD => font_bold,
            },
        },
        SIGNER_PAGE_MARKER => true,
    });

    let pages = doc
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(pdf_error)?;
    pages
        .get_mut(b"Kids")
        .and_then(Object::as_array_mut)
        .map_err(pdf_error)?
        .push(Object::Reference(page_id));
    let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    pages.set("Count", Object::Integer(count + 1));

    Ok(page_id)
}

/// Replace (or add) the trailing summary page of `pdf` and return the new bytes.
///
/// Only a page carrying the marker is ever removed, so a document without a
/// summary page keeps all its pages and gains one.
pub fn apply_signer_page(
    pdf: &[u8],
    signers: &[SignerStatus],
    document: &SignerPageDocument,
    timezone: Tz,
) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::load_mem(pdf).map_err(pdf_error)?;

    let replaced = remove_trailing_signer_page(&mut doc);
    let layout = layout_signer_page(signers, document, timezone, Utc::now());
    append_page(&mut doc, layout.operations)?;

    if layout.overflowed {
        tracing::warn!(
            signer_count = signers.len(),
            rows_drawn = layout.rows_drawn,
            "Signer page could not list every signer"
        );
    }
    tracing::debug!(replaced, "Signer page rendered");

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(pdf_write_error)?;
    Ok(out)
}

/// Signer page collaborator backed by lopdf and the document storage
pub struct LopdfSignerPageSync {
    storage: Arc<dyn Storage>,
    timezone: Tz,
}

impl LopdfSignerPageSync {
    pub fn new(storage: Arc<dyn Storage>, timezone: Tz) -> Self {
        Self { storage, timezone }
    }
}

#[async_trait]
impl SignerPageSync for LopdfSignerPageSync {
    async fn sync(
        &self,
        file_path: &str,
        signers: &[SignerStatus],
        document: &SignerPageDocument,
    ) -> Result<(), AppError> {
        if signers.is_empty() {
            tracing::debug!(file_path = %file_path, "No signers assigned, signer page skipped");
            return Ok(());
        }

        let start = Instant::now();
        let key = storage_key(file_path);
        let data = self.storage.download(key).await?;

        let signers_owned = signers.to_vec();
        let document = document.clone();
        let timezone = self.timezone;
        let updated = tokio::task::spawn_blocking(move || {
            apply_signer_page(&data, &signers_owned, &document, timezone)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Signer page task failed: {}", e)))??;

        self.storage.upload(key, updated).await?;

        tracing::info!(
            file_path = %file_path,
            signer_count = signers.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Signer page synchronized"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::sample_pdf;
    use signflow_storage::LocalStorage;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn signer(pos: i32, status: SignatureStatus) -> SignerStatus {
        SignerStatus {
            user_id: Uuid::new_v4(),
            name: format!("Signer {}", pos),
            email: format!("signer{}@example.com", pos),
            order_position: pos,
            status,
            signed_at: (status == SignatureStatus::Signed).then(Utc::now),
            rejected_at: (status == SignatureStatus::Rejected).then(Utc::now),
        }
    }

    fn info() -> SignerPageDocument {
        SignerPageDocument {
            title: "Master services agreement".to_string(),
            created_at: Utc::now(),
            uploaded_by_name: Some("Ana Gómez".to_string()),
        }
    }

    fn marked_pages(pdf: &[u8]) -> (usize, bool) {
        let doc = Document::load_mem(pdf).unwrap();
        let pages = doc.get_pages();
        let marked = pages
            .values()
            .filter(|id| is_signer_page(&doc, **id))
            .count();
        let last_marked = pages
            .values()
            .next_back()
            .map(|id| is_signer_page(&doc, *id))
            .unwrap_or(false);
        assert!(marked <= 1);
        (pages.len(), last_marked)
    }

    #[test]
    fn first_sync_appends_one_page() {
        let pdf = sample_pdf(2);
        let signers = vec![signer(1, SignatureStatus::Pending)];

        let out = apply_signer_page(&pdf, &signers, &info(), chrono_tz::America::Bogota).unwrap();
        assert_eq!(marked_pages(&out), (3, true));
    }

    #[test]
    fn repeated_sync_replaces_trailing_page() {
        let pdf = sample_pdf(2);
        let tz = chrono_tz::America::Bogota;
        let mut signers = vec![
            signer(1, SignatureStatus::Pending),
            signer(2, SignatureStatus::Pending),
        ];

        let once = apply_signer_page(&pdf, &signers, &info(), tz).unwrap();
        signers[0].status = SignatureStatus::Signed;
        signers[0].signed_at = Some(Utc::now());
        let twice = apply_signer_page(&once, &signers, &info(), tz).unwrap();
        let thrice = apply_signer_page(&twice, &signers, &info(), tz).unwrap();

        assert_eq!(marked_pages(&twice), (3, true));
        assert_eq!(marked_pages(&thrice), (3, true));
    }

    #[test]
    fn single_page_document_keeps_its_page() {
        let pdf = sample_pdf(1);
        let signers = vec![signer(1, SignatureStatus::Rejected)];

        let once = apply_signer_page(&pdf, &signers, &info(), Tz::UTC).unwrap();
        let twice = apply_signer_page(&once, &signers, &info(), Tz::UTC).unwrap();
        assert_eq!(marked_pages(&twice), (2, true));
    }

    #[test]
    fn layout_overflows_long_rosters() {
        let signers: Vec<SignerStatus> = (1..=20)
            .map(|pos| signer(pos, SignatureStatus::Pending))
            .collect();
        let layout = layout_signer_page(&signers, &info(), Tz::UTC, Utc::now());
        assert!(layout.overflowed);
        assert_eq!(layout.rows_drawn, 11);

        let layout = layout_signer_page(&signers[..3], &info(), Tz::UTC, Utc::now());
        assert!(!layout.overflowed);
        assert_eq!(layout.rows_drawn, 3);
    }

    #[test]
    fn timestamps_render_in_configured_zone() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T15:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(at, chrono_tz::America::Bogota), "01/03/2024 10:30");
        assert_eq!(format_timestamp(at, Tz::UTC), "01/03/2024 15:30");
    }

    #[test]
    fn invalid_pdf_is_pdf_error() {
        let err = apply_signer_page(b"not a pdf", &[signer(1, SignatureStatus::Pending)], &info(), Tz::UTC)
            .unwrap_err();
        assert!(matches!(err, AppError::Pdf(_)));
    }

    #[tokio::test]
    async fn sync_rewrites_stored_file() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        storage.upload("ana/contract.pdf", sample_pdf(1)).await.unwrap();

        let sync = LopdfSignerPageSync::new(storage.clone(), Tz::UTC);
        let signers = vec![signer(1, SignatureStatus::Pending)];
        sync.sync("uploads/ana/contract.pdf", &signers, &info())
            .await
            .unwrap();
        sync.sync("uploads/ana/contract.pdf", &signers, &info())
            .await
            .unwrap();

        let stored = storage.download("ana/contract.pdf").await.unwrap();
        assert_eq!(marked_pages(&stored), (2, true));
    }

    #[tokio::test]
    async fn sync_skips_empty_roster() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let sync = LopdfSignerPageSync::new(storage, Tz::UTC);

        // The file does not exist, so any attempt to read it would fail.
        sync.sync("uploads/ana/missing.pdf", &[], &info())
            .await
            .unwrap();
    }
}
