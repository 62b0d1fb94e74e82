// src/tree/node.rs

// --- Imports ---
use crate::tree::bounds::{parse_rect, Rect};
use crate::utils::error::ExtractError;
use serde::Serialize;

/// Class names the map app uses for its scrolling result list and its cards.
pub const LIST_CONTAINER_CLASS: &str = "androidx.recyclerview.widget.RecyclerView";
pub const CARD_GROUP_CLASS: &str = "android.view.ViewGroup";

/// One element of a UI hierarchy snapshot.
///
/// Every element of the dump maps onto this single shape; absent attributes are
/// empty strings, an unparseable `bounds` attribute is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UiNode {
    pub tag: String,
    pub class_name: String,
    pub text: String,
    pub content_desc: String,
    pub resource_id: String,
    pub bounds: Option<Rect>,
    pub clickable: bool,
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// Parses a uiautomator XML dump into an owned tree rooted at the document element.
    pub fn parse_tree(xml: &str) -> Result<UiNode, ExtractError> {
        if xml.trim().is_empty() {
            return Err(ExtractError::EmptyTree);
        }
        let document =
            roxmltree::Document::parse(xml).map_err(|e| ExtractError::TreeParse(e.to_string()))?;
        Ok(Self::from_element(document.root_element()))
    }

    fn from_element(element: roxmltree::Node<'_, '_>) -> UiNode {
        let attr = |name: &str| element.attribute(name).unwrap_or_default().to_string();

        UiNode {
            tag: element.tag_name().name().to_string(),
            class_name: attr("class"),
            text: attr("text"),
            content_desc: attr("content-desc"),
            resource_id: attr("resource-id"),
            bounds: element.attribute("bounds").and_then(parse_rect),
            clickable: element.attribute("clickable") == Some("true"),
            children: element
                .children()
                .filter(|child| child.is_element())
                .map(Self::from_element)
                .collect(),
        }
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Pre-order iterator over descendants only (the node itself excluded).
    pub fn descendants(&self) -> impl Iterator<Item = &UiNode> {
        self.iter().skip(1)
    }

    pub fn is_list_container(&self) -> bool {
        self.class_name == LIST_CONTAINER_CLASS
    }

    /// Clickable card group as laid out inside the result list.
    pub fn is_card_group(&self) -> bool {
        self.class_name == CARD_GROUP_CLASS && self.clickable
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Text or accessibility description contains the keyword.
    pub fn mentions(&self, keyword: &str) -> bool {
        self.text.contains(keyword) || self.content_desc.contains(keyword)
    }

    pub fn text_contains_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.text.contains(k))
    }

    pub fn mentions_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.mentions(k))
    }

    /// Every list container in the tree.
    pub fn list_containers(&self) -> impl Iterator<Item = &UiNode> {
        self.iter().filter(|n| n.is_list_container())
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a UiNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a UiNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push in reverse so the first child is visited next (document order)
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
