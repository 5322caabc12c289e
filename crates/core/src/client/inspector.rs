//! # Element Inspector
//!
//! Lets the user pick one rendered element of the generated component and
//! attach feedback to it. The inspector walks from the element under the
//! pointer up to the nearest ancestor carrying a `data-block-id`, highlights
//! it, and on click anchors a feedback box next to it.
//!
//! The element tree is abstract so any host (a webview bridge, a test
//! double) can drive it.

use crate::swarm::requests::{BlockId, GranularFeedback};
use crate::tools::block_ids::BLOCK_ID_ATTRIBUTE;

/// Id of the button that toggles inspection; clicks on it never select.
pub const ACTIVATION_BUTTON_ID: &str = "activate-button";

/// Offsets of the feedback box from the selected element's top-left corner
const ANCHOR_TOP_OFFSET: f64 = 25.0;
const ANCHOR_LEFT_OFFSET: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Read-only view of the rendered document
pub trait ElementTree {
    type Node: Copy + Eq;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    fn attribute(&self, node: Self::Node, name: &str) -> Option<String>;
    fn bounding_box(&self, node: Self::Node) -> Rect;
}

/// Outline drawn over the hovered block, relative to the preview container
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub block_id: BlockId,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Inspector inactive, or the activation button was clicked
    Ignored,
    Selected {
        block_id: BlockId,
        anchor_top: f64,
        anchor_left: f64,
    },
    /// Clicked outside any tagged element; selection cleared
    Abandoned,
}

#[derive(Debug, Default)]
pub struct Inspector {
    active: bool,
    hovered: Option<Highlight>,
    selected: Option<BlockId>,
}

impl Inspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    pub fn hovered(&self) -> Option<&Highlight> {
        self.hovered.as_ref()
    }

    /// Flip inspection on or off. Turning it off drops any selection.
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        if !self.active {
            self.hovered = None;
            self.selected = None;
        }
        self.active
    }

    fn tagged_ancestor<T: ElementTree>(tree: &T, start: T::Node) -> Option<(T::Node, BlockId)> {
        let mut current = Some(start);
        while let Some(node) = current {
            if let Some(id) = tree.attribute(node, BLOCK_ID_ATTRIBUTE) {
                return Some((node, BlockId::new(id)));
            }
            current = tree.parent(node);
        }
        None
    }

    fn is_activation_button<T: ElementTree>(tree: &T, node: T::Node) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if tree.attribute(n, "id").as_deref() == Some(ACTIVATION_BUTTON_ID) {
                return true;
            }
            current = tree.parent(n);
        }
        false
    }

    /// Track the pointer. Returns the highlight to draw, if any.
    pub fn pointer_move<T: ElementTree>(
        &mut self,
        tree: &T,
        target: T::Node,
        container: Rect,
    ) -> Option<&Highlight> {
        if !self.active {
            return None;
        }
        self.hovered = Self::tagged_ancestor(tree, target).map(|(node, block_id)| {
            let bounds = tree.bounding_box(node);
            Highlight {
                block_id,
                rect: Rect {
                    top: bounds.top - container.top,
                    left: bounds.left - container.left,
                    ..bounds
                },
            }
        });
        self.hovered.as_ref()
    }

    pub fn click<T: ElementTree>(&mut self, tree: &T, target: T::Node) -> ClickOutcome {
        if !self.active || Self::is_activation_button(tree, target) {
            return ClickOutcome::Ignored;
        }
        match Self::tagged_ancestor(tree, target) {
            Some((node, block_id)) => {
                let bounds = tree.bounding_box(node);
                self.selected = Some(block_id.clone());
                ClickOutcome::Selected {
                    block_id,
                    anchor_top: bounds.top + ANCHOR_TOP_OFFSET,
                    anchor_left: bounds.left + ANCHOR_LEFT_OFFSET,
                }
            }
            None => {
                self.selected = None;
                ClickOutcome::Abandoned
            }
        }
    }

    /// Package feedback for the selected block and leave inspection.
    pub fn submit(&mut self, message: &str) -> Option<GranularFeedback> {
        if message.trim().is_empty() {
            return None;
        }
        let data_block_id = self.selected.take()?;
        self.active = false;
        self.hovered = None;
        Some(GranularFeedback {
            message: message.to_string(),
            data_block_id,
        })
    }
}
