//! Signflow Processing Library
//!
//! PDF handling for uploaded documents: upload validation, merging several
//! uploads into one file and keeping the trailing signer summary page in sync
//! with the signature ledger.

pub mod document;
pub mod text;
pub mod validator;

pub use document::{
    apply_signer_page, layout_signer_page, merge_pdfs, page_count, LopdfSignerPageSync,
    SignerPageLayout, SIGNER_PAGE_MARKER,
};
pub use validator::{PdfValidator, ValidationError};

use signflow_core::AppError;

pub(crate) fn pdf_error(err: lopdf::Error) -> AppError {
    AppError::Pdf(err.to_string())
}

pub(crate) fn pdf_write_error(err: std::io::Error) -> AppError {
    AppError::Pdf(format!("Failed to write PDF: {}", err))
}
