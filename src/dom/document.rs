//! Mutable host document built on scraper's html5ever tree
//!
//! The host page is owned by somebody else and changes under us, so every
//! lookup here goes through the live tree and ignores detached nodes.
//!
//! `ego_tree` never frees nodes: a removed subtree stays in the arena for the
//! lifetime of the document, which also keeps stale `NodeId`s from aliasing
//! newer nodes. Re-rendering patches nodes in place when the shape is
//! unchanged, so only real removals grow the arena. `detached_nodes` reports
//! how many nodes have been abandoned so far.

use crate::dom::mutation::{HostChange, MutationRecord};
use crate::error::{AssistError, AssistResult};
use ego_tree::{NodeId, NodeRef, Tree};
use scraper::node::Text;
use scraper::{ElementRef, Html, Node, Selector, StrTendril};

/// Parse a CSS pattern into a selector
pub fn parse_selector(pattern: &str) -> AssistResult<Selector> {
    Selector::parse(pattern).map_err(|e| AssistError::invalid_pattern(pattern, e.to_string()))
}

/// Insertion point for typed text: a child offset inside an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Caret {
    node: NodeId,
    offset: usize,
}

/// The host application's document tree plus its focus/selection state
#[derive(Debug, Clone)]
pub struct HostDocument {
    html: Html,
    focused: Option<NodeId>,
    caret: Option<Caret>,
    detached: usize,
}

impl HostDocument {
    /// Parse a full host page
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            focused: None,
            caret: None,
            detached: 0,
        }
    }

    /// The `<html>` element
    pub fn document_element(&self) -> Option<ElementRef<'_>> {
        self.html.tree.root().children().find_map(ElementRef::wrap)
    }

    /// First attached element in document order matching `selector`
    pub fn query_first(&self, selector: &Selector) -> Option<NodeId> {
        let root = self.document_element()?;
        if selector.matches(&root) {
            return Some(root.id());
        }
        root.select(selector).next().map(|el| el.id())
    }

    /// Every attached element matching `selector`, in document order
    pub fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        let Some(root) = self.document_element() else {
            return Vec::new();
        };
        let mut matches = Vec::new();
        if selector.matches(&root) {
            matches.push(root.id());
        }
        matches.extend(root.select(selector).map(|el| el.id()));
        matches
    }

    /// Resolve an element by id, attached or not
    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    /// Whether the node still hangs off the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.html.tree.root().id();
        match self.html.tree.get(id) {
            Some(node) => node.id() == root || node.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    /// Concatenated text of the element's subtree
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        self.element(id).map(|el| el.text().collect::<String>())
    }

    /// Whether the node is, or contains, an element matching `selector`
    pub fn matches_or_contains(&self, id: NodeId, selector: &Selector) -> bool {
        match self.element(id) {
            Some(el) => selector.matches(&el) || el.select(selector).next().is_some(),
            None => false,
        }
    }

    /// Value of an attribute on an element
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.value().attr(name))
    }

    /// Ids of the element children of `id`
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.element(id)
            .map(|el| el.child_elements().map(|c| c.id()).collect())
            .unwrap_or_default()
    }

    /// Graft the first element of `markup` as `parent`'s first child
    pub fn prepend_markup(&mut self, parent: NodeId, markup: &str) -> Option<NodeId> {
        let fragment = Html::parse_fragment(markup);
        let source = fragment_elements(&fragment).into_iter().next()?;

        let id = {
            let mut parent_node = self.html.tree.get_mut(parent)?;
            parent_node.prepend(source.value().clone()).id()
        };
        copy_children(&mut self.html.tree, id, source);
        Some(id)
    }

    /// Append every top-level node of `markup` to `parent`, returning the new ids
    pub fn append_markup(&mut self, parent: NodeId, markup: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(markup);
        let Some(container) = fragment_container(&fragment) else {
            return Vec::new();
        };

        let mut added = Vec::new();
        for source in container.children() {
            let Some(mut parent_node) = self.html.tree.get_mut(parent) else {
                break;
            };
            let id = parent_node.append(source.value().clone()).id();
            copy_children(&mut self.html.tree, id, source);
            added.push(id);
        }
        added
    }

    /// Replace an element's value and children with the first element of `markup`
    ///
    /// Children of the same kind are overwritten in place; only a change of
    /// shape drops the old subtree.
    pub fn render_markup(&mut self, id: NodeId, markup: &str) -> bool {
        let fragment = Html::parse_fragment(markup);
        let Some(source) = fragment_elements(&fragment).into_iter().next() else {
            return false;
        };

        match self.html.tree.get_mut(id) {
            Some(mut node) => *node.value() = source.value().clone(),
            None => return false,
        }
        self.detached += patch_children(&mut self.html.tree, id, source);
        true
    }

    /// Detach a node and its subtree
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        self.detached += subtree_size(&self.html.tree, id);
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
        if self.focused.is_some_and(|f| !self.is_attached(f)) {
            self.focused = None;
        }
        if self.caret.is_some_and(|c| !self.is_attached(c.node)) {
            self.caret = None;
        }
        true
    }

    /// Apply a host-side structural change and report what it did
    pub fn apply(&mut self, change: &HostChange) -> AssistResult<Vec<MutationRecord>> {
        match change {
            HostChange::Append { parent, markup } => {
                let selector = parse_selector(parent)?;
                let target = self
                    .query_first(&selector)
                    .ok_or_else(|| AssistError::invalid_pattern(parent, "no element matches"))?;
                let added = self.append_markup(target, markup);
                Ok(vec![MutationRecord::added(target, added)])
            }
            HostChange::Remove { target } => {
                let selector = parse_selector(target)?;
                let mut records = Vec::new();
                for id in self.query_all(&selector) {
                    let parent = self.html.tree.get(id).and_then(|n| n.parent()).map(|p| p.id());
                    if self.remove(id) {
                        if let Some(parent) = parent {
                            records.push(MutationRecord::removed(parent, vec![id]));
                        }
                    }
                }
                Ok(records)
            }
        }
    }

    /// Make `id` the active edit target
    pub fn focus(&mut self, id: NodeId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        self.focused = Some(id);
        let caret_inside = self.caret.is_some_and(|c| self.is_within(c.node, id));
        if !caret_inside {
            let offset = self.child_count(id);
            self.caret = Some(Caret { node: id, offset });
        }
        true
    }

    /// Currently focused element
    pub fn focused(&self) -> Option<NodeId> {
        self.focused.filter(|id| self.is_attached(*id))
    }

    /// Place the caret at a child offset inside `node`
    pub fn set_caret(&mut self, node: NodeId, offset: usize) -> bool {
        if !self.is_attached(node) {
            return false;
        }
        let offset = offset.min(self.child_count(node));
        self.caret = Some(Caret { node, offset });
        true
    }

    /// Insert text at the caret inside the focused element, keeping existing content
    pub fn insert_text(&mut self, text: &str) -> bool {
        let Some(focused) = self.focused() else {
            return false;
        };
        let caret = match self.caret {
            Some(c) if self.is_within(c.node, focused) => c,
            _ => Caret {
                node: focused,
                offset: self.child_count(focused),
            },
        };

        let value = Node::Text(Text {
            text: StrTendril::from_slice(text),
        });
        let before = self
            .html
            .tree
            .get(caret.node)
            .and_then(|n| n.children().nth(caret.offset))
            .map(|n| n.id());

        let inserted = match before {
            Some(sibling) => self
                .html
                .tree
                .get_mut(sibling)
                .map(|mut s| s.insert_before(value).id()),
            None => self
                .html
                .tree
                .get_mut(caret.node)
                .map(|mut n| n.append(value).id()),
        };

        if inserted.is_some() {
            self.caret = Some(Caret {
                node: caret.node,
                offset: caret.offset + 1,
            });
        }
        inserted.is_some()
    }

    /// Serialize the current tree
    pub fn html(&self) -> String {
        self.html.html()
    }

    /// Nodes removed from the tree that still occupy the arena
    pub fn detached_nodes(&self) -> usize {
        self.detached
    }

    fn child_count(&self, id: NodeId) -> usize {
        self.html.tree.get(id).map(|n| n.children().count()).unwrap_or(0)
    }

    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        match self.html.tree.get(node) {
            Some(n) => n.id() == ancestor || n.ancestors().any(|a| a.id() == ancestor),
            None => false,
        }
    }
}

/// Wrapper element html5ever puts around parsed fragment content
fn fragment_container(fragment: &Html) -> Option<NodeRef<'_, Node>> {
    fragment
        .tree
        .root()
        .children()
        .find(|n| n.value().is_element())
}

fn fragment_elements(fragment: &Html) -> Vec<NodeRef<'_, Node>> {
    fragment_container(fragment)
        .map(|c| c.children().filter(|n| n.value().is_element()).collect())
        .unwrap_or_default()
}

fn copy_children(tree: &mut Tree<Node>, target: NodeId, source: NodeRef<'_, Node>) {
    for child in source.children() {
        let Some(mut parent) = tree.get_mut(target) else {
            return;
        };
        let id = parent.append(child.value().clone()).id();
        copy_children(tree, id, child);
    }
}

/// Detach every child of `target`, returning how many nodes were dropped
fn clear_children(tree: &mut Tree<Node>, target: NodeId) -> usize {
    let mut dropped = 0;
    loop {
        let Some(child) = tree.get(target).and_then(|n| n.first_child()).map(|c| c.id()) else {
            break;
        };
        dropped += subtree_size(tree, child);
        match tree.get_mut(child) {
            Some(mut node) => node.detach(),
            None => break,
        }
    }
    dropped
}

/// Bring `target`'s children in line with `source`'s, reusing nodes when the shape matches
fn patch_children(tree: &mut Tree<Node>, target: NodeId, source: NodeRef<'_, Node>) -> usize {
    let existing: Vec<NodeId> = tree
        .get(target)
        .map(|n| n.children().map(|c| c.id()).collect())
        .unwrap_or_default();
    let incoming: Vec<NodeRef<'_, Node>> = source.children().collect();

    let same_shape = existing.len() == incoming.len()
        && existing.iter().zip(&incoming).all(|(id, src)| {
            tree.get(*id)
                .is_some_and(|node| same_kind(node.value(), src.value()))
        });
    if !same_shape {
        let dropped = clear_children(tree, target);
        copy_children(tree, target, source);
        return dropped;
    }

    let mut dropped = 0;
    for (id, src) in existing.into_iter().zip(incoming) {
        if let Some(mut node) = tree.get_mut(id) {
            *node.value() = src.value().clone();
        }
        dropped += patch_children(tree, id, src);
    }
    dropped
}

fn same_kind(a: &Node, b: &Node) -> bool {
    match (a, b) {
        (Node::Text(_), Node::Text(_)) | (Node::Comment(_), Node::Comment(_)) => true,
        (Node::Element(x), Node::Element(y)) => x.name() == y.name(),
        _ => false,
    }
}

fn subtree_size(tree: &Tree<Node>, id: NodeId) -> usize {
    tree.get(id).map(|n| n.descendants().count()).unwrap_or(0)
}
