//! Merge several uploaded PDFs into one document

use std::collections::BTreeMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use signflow_core::AppError;

use crate::{pdf_error, pdf_write_error};

const MERGED_TITLE: &str = "Merged document";

fn type_of(object: &Object) -> Option<&[u8]> {
    object
        .as_dict()
        .and_then(|dict| dict.get(b"Type"))
        .and_then(Object::as_name)
        .ok()
}

/// Number of pages in a PDF
pub fn page_count(pdf: &[u8]) -> Result<usize, AppError> {
    let doc = Document::load_mem(pdf).map_err(pdf_error)?;
    Ok(doc.get_pages().len())
}

/// Concatenate the pages of `inputs` in order.
///
/// Objects of every input are renumbered into one id space, page dictionaries
/// are re-parented under a single page tree and document outlines are dropped.
pub fn merge_pdfs(inputs: &[Vec<u8>]) -> Result<Vec<u8>, AppError> {
    if inputs.is_empty() {
        return Err(AppError::InvalidInput("No PDF files to merge".to_string()));
    }

    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for bytes in inputs {
        let mut doc = Document::load_mem(bytes).map_err(pdf_error)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for page_id in doc.get_pages().into_values() {
            let page = doc.get_object(page_id).map_err(pdf_error)?.to_owned();
            pages.push((page_id, page));
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut page_tree: Option<(ObjectId, Dictionary)> = None;

    for (id, object) in objects {
        match type_of(&object) {
            Some(b"Catalog") => {
                if catalog.is_none() {
                    if let Ok(dict) = object.as_dict() {
                        catalog = Some((id, dict.clone()));
                    }
                }
            }
            Some(b"Pages") => {
                if let Ok(dict) = object.as_dict() {
                    match page_tree.as_mut() {
                        Some((_, existing)) => existing.extend(dict),
                        None => page_tree = Some((id, dict.clone())),
                    }
                }
            }
            Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(id, object);
            }
        }
    }

    let (catalog_id, mut catalog) =
        catalog.ok_or_else(|| AppError::Pdf("No catalog found in merged input".to_string()))?;
    let (pages_id, mut page_tree) =
        page_tree.ok_or_else(|| AppError::Pdf("No page tree found in merged input".to_string()))?;

    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, page) in pages {
        if let Ok(dict) = page.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(page_id, Object::Dictionary(dict));
            kids.push(Object::Reference(page_id));
        }
    }

    page_tree.set("Count", Object::Integer(kids.len() as i64));
    page_tree.set("Kids", kids);
    page_tree.remove(b"Parent");
    merged
        .objects
        .insert(pages_id, Object::Dictionary(page_tree));

    catalog.set("Pages", pages_id);
    catalog.remove(b"Outlines");
    merged
        .objects
        .insert(catalog_id, Object::Dictionary(catalog));

    merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    let info_id = merged.add_object(dictionary! {
        "Title" => Object::string_literal(MERGED_TITLE),
        "Producer" => Object::string_literal("signflow"),
    });
    merged.trailer.set("Root", catalog_id);
    merged.trailer.set("Info", info_id);

    merged.renumber_objects();
    merged.compress();

    let mut out = Vec::new();
    merged.save_to(&mut out).map_err(pdf_write_error)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::sample_pdf;

    #[test]
    fn merges_pages_in_order() {
        let merged = merge_pdfs(&[sample_pdf(2), sample_pdf(3)]).unwrap();
        assert_eq!(page_count(&merged).unwrap(), 5);
    }

    #[test]
    fn single_input_round_trips() {
        let merged = merge_pdfs(&[sample_pdf(1)]).unwrap();
        assert_eq!(page_count(&merged).unwrap(), 1);
    }

    #[test]
    fn info_dictionary_does_not_replace_copied_objects() {
        let merged = merge_pdfs(&[sample_pdf(1), sample_pdf(1)]).unwrap();
        let doc = Document::load_mem(&merged).unwrap();

        assert_eq!(doc.get_pages().len(), 2);
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert_eq!(
            info.get(b"Title").unwrap().as_str().unwrap(),
            MERGED_TITLE.as_bytes()
        );
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(merge_pdfs(&[]), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn corrupt_input_is_pdf_error() {
        let result = merge_pdfs(&[sample_pdf(1), b"garbage".to_vec()]);
        assert!(matches!(result, Err(AppError::Pdf(_))));
    }
}
