use std::rc::Rc;

use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::domain::error::{AppError, Result};
use crate::domain::image_mapping::ImageMapping;
use crate::domain::template::PREHEADER_REMOVED;
use crate::infrastructure::config::TransformConfig;

const CLOSING_HTML_TAG: &str = "</html>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedDocument {
    pub html: String,
    pub unmatched_images: Vec<String>,
    pub preheader_status: String,
    pub images_rewritten: usize,
    pub rows_removed: usize,
}

/// Structural edits on a parsed template: image sources, preheader rows and
/// the trailing open-counter tag.
pub struct HtmlTransformer {
    config: TransformConfig,
}

impl HtmlTransformer {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn transform(
        &self,
        html: &str,
        mapping: &ImageMapping,
        remove_preheader: bool,
    ) -> Result<TransformedDocument> {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        let mut result = TransformedDocument::default();

        self.rewrite_images(&dom.document, mapping, &mut result);

        if remove_preheader {
            result.rows_removed = self.remove_preheader_rows(&dom.document);
            result.preheader_status = PREHEADER_REMOVED.to_string();
        }

        let serialized = serialize_document(&dom)?;
        result.html = self.inject_tracking_tag(&serialized);

        tracing::info!(
            images_rewritten = result.images_rewritten,
            unmatched = result.unmatched_images.len(),
            rows_removed = result.rows_removed,
            "Template transformed"
        );
        Ok(result)
    }

    fn rewrite_images(&self, root: &Handle, mapping: &ImageMapping, result: &mut TransformedDocument) {
        let mut images = Vec::new();
        collect_elements(root, "img", &mut images);

        for img in images {
            let NodeData::Element { attrs, .. } = &img.data else {
                continue;
            };
            let mut attrs = attrs.borrow_mut();
            let Some(src) = attrs.iter_mut().find(|a| &*a.name.local == "src") else {
                continue;
            };
            if src.value.is_empty() {
                continue;
            }

            let current = src.value.to_string();
            match mapping.resolve(&current, self.config.match_policy) {
                Some(url) => {
                    tracing::debug!(from = %current, to = %url, "Rewriting image source");
                    src.value = StrTendril::from_slice(url);
                    result.images_rewritten += 1;
                }
                None => result.unmatched_images.push(current),
            }
        }
    }

    /// Detaches every token-bearing row inside the marked tables and returns
    /// how many rows went.
    fn remove_preheader_rows(&self, root: &Handle) -> usize {
        let mut tables = Vec::new();
        collect_elements(root, "table", &mut tables);

        let mut removed = 0;
        for table in tables
            .iter()
            .filter(|t| has_all_classes(t, &self.config.preheader_classes))
        {
            let mut rows = Vec::new();
            collect_token_rows(table, &self.config.preheader_token, &mut rows);
            for row in rows {
                detach(&row);
                removed += 1;
            }
        }
        removed
    }

    /// Text-level patch applied after serialization so the tag ends up exactly
    /// where the closing tag was.
    pub fn inject_tracking_tag(&self, serialized: &str) -> String {
        if serialized.contains(CLOSING_HTML_TAG) {
            serialized.replace(CLOSING_HTML_TAG, &self.config.tracking_tag)
        } else {
            serialized.to_string()
        }
    }
}

fn serialize_document(dom: &RcDom) -> Result<String> {
    let mut bytes = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize(&mut bytes, &document, SerializeOpts::default())
        .map_err(|e| AppError::Internal(format!("Failed to serialize HTML: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::ParseError(format!("Serialized HTML is not UTF-8: {}", e)))
}

fn element_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn attr_value(node: &Handle, attr: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == attr)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Pre-order walk with an explicit stack; templates can nest deeper than the
/// thread stack allows.
fn collect_elements(root: &Handle, tag: &str, out: &mut Vec<Handle>) {
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if element_name(&node) == Some(tag) {
            out.push(node.clone());
        }
        push_children(&node, &mut stack);
    }
}

/// Children go on in reverse so they pop in document order.
fn push_children(node: &Handle, stack: &mut Vec<Handle>) {
    stack.extend(node.children.borrow().iter().rev().cloned());
}

fn has_all_classes(node: &Handle, required: &[String]) -> bool {
    let Some(class) = attr_value(node, "class") else {
        return false;
    };
    let present: Vec<&str> = class.split_whitespace().collect();
    required.iter().all(|c| present.contains(&c.as_str()))
}

/// A matching row is taken whole, so rows nested inside it are not visited.
fn collect_token_rows(root: &Handle, token: &str, out: &mut Vec<Handle>) {
    let mut stack = Vec::new();
    push_children(root, &mut stack);
    while let Some(node) = stack.pop() {
        if element_name(&node) == Some("tr") && text_content(&node).contains(token) {
            out.push(node);
            continue;
        }
        push_children(&node, &mut stack);
    }
}

fn text_content(root: &Handle) -> String {
    let mut out = String::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if let NodeData::Text { contents } = &node.data {
            out.push_str(&contents.borrow());
        }
        push_children(&node, &mut stack);
    }
    out
}

fn detach(node: &Handle) {
    let Some(parent) = node.parent.take().and_then(|weak| weak.upgrade()) else {
        return;
    };
    parent
        .children
        .borrow_mut()
        .retain(|child| !Rc::ptr_eq(child, node));
}
