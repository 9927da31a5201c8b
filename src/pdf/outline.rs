use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat, dictionary};
use tracing::debug;

use super::PdfDocument;
use crate::headings::{OutlineNode, PageRef};

pub fn read_outline(document: &PdfDocument) -> Result<Vec<OutlineNode>> {
    let doc = document.inner();
    let catalog = doc.catalog().context("PDF has no document catalog")?;

    let Some(outlines) = catalog
        .get(b"Outlines")
        .ok()
        .and_then(|object| resolve_dictionary(doc, object))
    else {
        return Ok(Vec::new());
    };

    let named = named_destinations(doc, catalog);
    let first = reference(outlines, b"First");

    let mut stack = vec![OutlineLevel::starting_at(first)];
    let mut visited = HashSet::<ObjectId>::new();

    while let Some(level) = stack.last_mut() {
        let Some(item_id) = level.next.take() else {
            let finished = stack.pop().map(|level| level.nodes).unwrap_or_default();
            match stack.last_mut() {
                Some(parent) if !finished.is_empty() => {
                    parent.nodes.push(OutlineNode::Group(finished))
                }
                Some(_) => {}
                None => return Ok(finished),
            }
            continue;
        };

        if !visited.insert(item_id) {
            debug!(object = ?item_id, "outline item visited twice; stopping this level");
            continue;
        }

        let Ok(item) = doc.get_dictionary(item_id) else {
            debug!(object = ?item_id, "outline item is not a dictionary");
            continue;
        };

        level.next = reference(item, b"Next");
        let title = item
            .get(b"Title")
            .ok()
            .map(|object| deref(doc, object))
            .map(decode_text_string)
            .unwrap_or_default();
        level.nodes.push(OutlineNode::Leaf {
            title,
            target: item_target(doc, item, &named),
        });

        if let Some(child) = reference(item, b"First") {
            stack.push(OutlineLevel::starting_at(Some(child)));
        }
    }

    Ok(Vec::new())
}

struct OutlineLevel {
    nodes: Vec<OutlineNode>,
    next: Option<ObjectId>,
}

impl OutlineLevel {
    fn starting_at(next: Option<ObjectId>) -> Self {
        Self {
            nodes: Vec::new(),
            next,
        }
    }
}

fn deref<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn resolve_dictionary<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    deref(doc, object).as_dict().ok()
}

fn reference(dict: &Dictionary, key: &[u8]) -> Option<ObjectId> {
    dict.get(key).ok().and_then(|object| object.as_reference().ok())
}

fn item_target(doc: &Document, item: &Dictionary, named: &HashMap<Vec<u8>, ObjectId>) -> PageRef {
    if let Ok(dest) = item.get(b"Dest") {
        return destination_target(doc, deref(doc, dest), named);
    }

    let action = item
        .get(b"A")
        .ok()
        .and_then(|object| resolve_dictionary(doc, object));
    let Some(action) = action else {
        return PageRef::Missing;
    };

    let is_goto = action
        .get(b"S")
        .ok()
        .and_then(|object| object.as_name().ok())
        .map(|name| name == b"GoTo")
        .unwrap_or(false);
    if !is_goto {
        return PageRef::Missing;
    }

    match action.get(b"D") {
        Ok(dest) => destination_target(doc, deref(doc, dest), named),
        Err(_) => PageRef::Missing,
    }
}

fn destination_target(
    doc: &Document,
    dest: &Object,
    named: &HashMap<Vec<u8>, ObjectId>,
) -> PageRef {
    let key = match dest {
        Object::Array(items) => {
            return match items.first() {
                Some(Object::Reference((number, generation))) => {
                    PageRef::Object(*number, *generation)
                }
                _ => PageRef::Missing,
            };
        }
        Object::Dictionary(dict) => {
            return match dict.get(b"D") {
                Ok(inner) => destination_target(doc, deref(doc, inner), named),
                Err(_) => PageRef::Missing,
            };
        }
        Object::Name(name) => name.clone(),
        Object::String(bytes, _) => bytes.clone(),
        _ => return PageRef::Missing,
    };

    match named.get(&key) {
        Some((number, generation)) => PageRef::Object(*number, *generation),
        None => PageRef::Named(String::from_utf8_lossy(&key).into_owned()),
    }
}

fn named_destinations(doc: &Document, catalog: &Dictionary) -> HashMap<Vec<u8>, ObjectId> {
    let mut named = HashMap::new();

    if let Some(dests) = catalog
        .get(b"Dests")
        .ok()
        .and_then(|object| resolve_dictionary(doc, object))
    {
        for (key, value) in dests.iter() {
            if let Some(page) = destination_page(doc, deref(doc, value)) {
                named.insert(key.clone(), page);
            }
        }
    }

    let tree_root = catalog
        .get(b"Names")
        .ok()
        .and_then(|object| resolve_dictionary(doc, object))
        .and_then(|names| names.get(b"Dests").ok())
        .and_then(|object| resolve_dictionary(doc, object));

    let mut pending = tree_root.into_iter().collect::<Vec<&Dictionary>>();
    let mut visited_nodes = 0usize;
    while let Some(node) = pending.pop() {
        visited_nodes += 1;
        if visited_nodes > 100_000 {
            break;
        }

        if let Ok(pairs) = node.get(b"Names").and_then(Object::as_array) {
            for pair in pairs.chunks(2) {
                let [key, value] = pair else {
                    continue;
                };
                let Ok(key) = deref(doc, key).as_str() else {
                    continue;
                };
                if let Some(page) = destination_page(doc, deref(doc, value)) {
                    named.insert(key.to_vec(), page);
                }
            }
        }

        if let Ok(kids) = node.get(b"Kids").and_then(Object::as_array) {
            pending.extend(kids.iter().filter_map(|kid| resolve_dictionary(doc, kid)));
        }
    }

    named
}

fn destination_page(doc: &Document, value: &Object) -> Option<ObjectId> {
    match value {
        Object::Array(items) => items.first().and_then(|first| first.as_reference().ok()),
        Object::Dictionary(dict) => dict
            .get(b"D")
            .ok()
            .and_then(|inner| destination_page(doc, deref(doc, inner))),
        _ => None,
    }
}

pub fn decode_text_string(object: &Object) -> String {
    let bytes = match object {
        Object::String(bytes, _) => bytes.as_slice(),
        Object::Name(bytes) => bytes.as_slice(),
        _ => return String::new(),
    };

    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>();
        return String::from_utf16_lossy(&units);
    }

    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }

    bytes.iter().map(|byte| char::from(*byte)).collect()
}

pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

pub fn inject_outline(
    document: &mut PdfDocument,
    entries: &[(String, usize)],
    replace: bool,
) -> Result<usize> {
    let mut ordered = entries
        .iter()
        .filter_map(|(title, page_index)| {
            document
                .page_id(*page_index)
                .map(|page_id| (title.as_str(), *page_index, page_id))
        })
        .collect::<Vec<(&str, usize, ObjectId)>>();
    ordered.sort_by_key(|(_, page_index, _)| *page_index);

    if ordered.is_empty() {
        return Ok(0);
    }

    let doc = document.inner_mut();
    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .context("PDF trailer has no catalog reference")?;

    let existing = if replace {
        None
    } else {
        existing_outline(doc, root_id)
    };

    let outlines_id = existing
        .as_ref()
        .map(|outline| outline.id)
        .unwrap_or_else(|| doc.new_object_id());
    let item_ids = ordered
        .iter()
        .map(|_| doc.new_object_id())
        .collect::<Vec<ObjectId>>();

    for (index, (title, _, page_id)) in ordered.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => encode_text_string(title),
            "Parent" => outlines_id,
            "Dest" => vec![Object::Reference(*page_id), Object::Name(b"Fit".to_vec())],
        };

        let previous = if index == 0 {
            existing.as_ref().and_then(|outline| outline.last)
        } else {
            Some(item_ids[index - 1])
        };
        if let Some(previous) = previous {
            item.set("Prev", previous);
        }
        if let Some(next) = item_ids.get(index + 1) {
            item.set("Next", *next);
        }

        doc.objects.insert(item_ids[index], Object::Dictionary(item));
    }

    let first_new = item_ids[0];
    let last_new = item_ids[item_ids.len() - 1];

    if let Some(previous_last) = existing.as_ref().and_then(|outline| outline.last) {
        if let Ok(last_item) = doc
            .get_object_mut(previous_last)
            .and_then(Object::as_dict_mut)
        {
            last_item.set("Next", first_new);
        }
    }

    let first = existing
        .as_ref()
        .and_then(|outline| outline.first)
        .unwrap_or(first_new);
    let count = existing.as_ref().map(|outline| outline.count).unwrap_or(0) + item_ids.len() as i64;

    let mut outlines = existing
        .as_ref()
        .and_then(|outline| doc.get_dictionary(outline.id).ok().cloned())
        .unwrap_or_default();
    outlines.set("Type", Object::Name(b"Outlines".to_vec()));
    outlines.set("First", first);
    outlines.set("Last", last_new);
    outlines.set("Count", count);
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));

    let catalog = doc
        .get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .context("PDF catalog is not a dictionary")?;
    catalog.set("Outlines", outlines_id);
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

    if replace {
        doc.prune_objects();
    }

    Ok(item_ids.len())
}

struct ExistingOutline {
    id: ObjectId,
    first: Option<ObjectId>,
    last: Option<ObjectId>,
    count: i64,
}

fn existing_outline(doc: &Document, root_id: ObjectId) -> Option<ExistingOutline> {
    let catalog = doc.get_dictionary(root_id).ok()?;
    let id = reference(catalog, b"Outlines")?;
    let outlines = doc.get_dictionary(id).ok()?;

    Some(ExistingOutline {
        id,
        first: reference(outlines, b"First"),
        last: reference(outlines, b"Last"),
        count: outlines
            .get(b"Count")
            .and_then(Object::as_i64)
            .map(i64::abs)
            .unwrap_or(0),
    })
}

pub fn strip_outline(doc: &mut Document) -> Result<()> {
    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .context("PDF trailer has no catalog reference")?;
    let catalog = doc
        .get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .context("PDF catalog is not a dictionary")?;
    catalog.remove(b"Outlines");
    if catalog
        .get(b"PageMode")
        .and_then(Object::as_name)
        .map(|mode| mode == b"UseOutlines")
        .unwrap_or(false)
    {
        catalog.remove(b"PageMode");
    }
    Ok(())
}
