use std::path::Path;

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use super::PdfDocument;

pub(crate) fn sample_document(page_count: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::<Object>::with_capacity(page_count);
    for index in 0..page_count {
        let content = format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", index + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub(crate) fn sample_pdf(page_count: usize) -> PdfDocument {
    PdfDocument::from_document("sample.pdf", sample_document(page_count))
}

pub(crate) fn write_sample_pdf(path: &Path, page_count: usize) {
    let mut doc = sample_document(page_count);
    doc.save(path).expect("write sample pdf");
}

pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

pub(crate) fn page_labels(doc: &Document) -> Vec<String> {
    page_ids(doc)
        .into_iter()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).expect("page content");
            let text = String::from_utf8_lossy(&content);
            let start = text.find('(').expect("text operand start") + 1;
            let end = text.find(')').expect("text operand end");
            text[start..end].to_string()
        })
        .collect()
}
