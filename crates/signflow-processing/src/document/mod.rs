//! PDF document operations

pub mod merge;
pub mod signer_page;

#[cfg(test)]
pub(crate) mod fixtures;

pub use merge::{merge_pdfs, page_count};
pub use signer_page::{
    apply_signer_page, layout_signer_page, LopdfSignerPageSync, SignerPageLayout,
    SIGNER_PAGE_MARKER,
};
