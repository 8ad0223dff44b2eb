//! In-memory document model.
//!
//! [`Page`] is a plain element tree with just enough state for lazy image
//! loading: attributes, classes, text, a laid-out rectangle and a hidden
//! flag. The image loader never touches it directly; it goes through the
//! [`Document`] trait, which [`SharedPage`] implements for a page behind a
//! lock so the loader and the renderers can share one tree.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use inkwell_model::{ElementId, Rect};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

pub mod selector;

pub use selector::{SelectorError, SelectorList};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("element {0} is not in the document")]
    NoSuchElement(ElementId),

    #[error("the document root cannot be removed")]
    RootRemoval,
}

#[derive(Debug, Clone)]
pub struct Element {
    id: ElementId,
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    rect: Option<Rect>,
    hidden: bool,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    /// The paint-visible source (`src`).
    pub fn source(&self) -> Option<&str> {
        self.attribute("src")
    }
}

/// Description of an element to insert.
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    rect: Option<Rect>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        for part in class.split_whitespace() {
            if !self.classes.iter().any(|c| c == part) {
                self.classes.push(part.to_string());
            }
        }
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = Some(rect);
        self
    }
}

/// An element tree rooted at a `body` element.
#[derive(Debug, Clone)]
pub struct Page {
    root: ElementId,
    elements: HashMap<ElementId, Element>,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        let root = ElementId::next();
        let body = Element {
            id: root,
            tag: "body".into(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: None,
            rect: None,
            hidden: false,
            parent: None,
            children: Vec::new(),
        };
        Self {
            root,
            elements: HashMap::from([(root, body)]),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    fn get_mut(&mut self, id: ElementId) -> Result<&mut Element, DomError> {
        self.elements
            .get_mut(&id)
            .ok_or(DomError::NoSuchElement(id))
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(|element| element.parent)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(
        &self,
        id: ElementId,
    ) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.parent(id), move |current| {
            self.parent(*current)
        })
    }

    pub fn append(
        &mut self,
        parent: ElementId,
        spec: ElementSpec,
    ) -> Result<ElementId, DomError> {
        let id = ElementId::next();
        self.get_mut(parent)?.children.push(id);
        self.elements.insert(
            id,
            Element {
                id,
                tag: spec.tag,
                classes: spec.classes,
                attributes: spec.attributes,
                text: spec.text,
                rect: spec.rect,
                hidden: false,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Detach `id` and drop it together with its subtree.
    pub fn remove(&mut self, id: ElementId) -> Result<(), DomError> {
        if id == self.root {
            return Err(DomError::RootRemoval);
        }
        let parent = self.get(id).ok_or(DomError::NoSuchElement(id))?.parent;
        if let Some(parent) = parent
            && let Some(element) = self.elements.get_mut(&parent)
        {
            element.children.retain(|child| *child != id);
        }
        self.drop_subtree(id);
        Ok(())
    }

    pub fn clear_children(&mut self, id: ElementId) -> Result<(), DomError> {
        let children = std::mem::take(&mut self.get_mut(id)?.children);
        for child in children {
            self.drop_subtree(child);
        }
        Ok(())
    }

    fn drop_subtree(&mut self, id: ElementId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(element) = self.elements.remove(&current) {
                stack.extend(element.children);
            }
        }
    }

    /// Move `id` to the end of its parent's children.
    pub fn move_to_end(&mut self, id: ElementId) -> Result<(), DomError> {
        let parent = self
            .parent(id)
            .ok_or(DomError::NoSuchElement(id))?;
        let siblings = &mut self.get_mut(parent)?.children;
        siblings.retain(|child| *child != id);
        siblings.push(id);
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        id: ElementId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        self.get_mut(id)?
            .attributes
            .insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn remove_attribute(
        &mut self,
        id: ElementId,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        Ok(self.get_mut(id)?.attributes.remove(name))
    }

    pub fn add_class(
        &mut self,
        id: ElementId,
        class: &str,
    ) -> Result<(), DomError> {
        let element = self.get_mut(id)?;
        if !element.has_class(class) {
            element.classes.push(class.to_string());
        }
        Ok(())
    }

    pub fn remove_class(
        &mut self,
        id: ElementId,
        class: &str,
    ) -> Result<(), DomError> {
        self.get_mut(id)?.classes.retain(|c| c != class);
        Ok(())
    }

    pub fn set_rect(
        &mut self,
        id: ElementId,
        rect: Option<Rect>,
    ) -> Result<(), DomError> {
        self.get_mut(id)?.rect = rect;
        Ok(())
    }

    pub fn set_hidden(
        &mut self,
        id: ElementId,
        hidden: bool,
    ) -> Result<(), DomError> {
        self.get_mut(id)?.hidden = hidden;
        Ok(())
    }

    /// Concatenated text of an element and its descendants.
    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(element) = self.get(current) else {
                continue;
            };
            if let Some(text) = &element.text {
                out.push_str(text);
            }
            stack.extend(element.children.iter().rev());
        }
        out
    }

    /// Whether the element and all of its ancestors are shown.
    pub fn is_rendered(&self, id: ElementId) -> bool {
        self.get(id).is_some_and(|element| !element.hidden)
            && self
                .ancestors(id)
                .all(|ancestor| self.get(ancestor).is_some_and(|a| !a.hidden))
    }

    /// The element's box if it takes part in layout.
    pub fn layout_rect(&self, id: ElementId) -> Option<Rect> {
        if !self.is_rendered(id) {
            return None;
        }
        self.get(id).and_then(Element::rect)
    }

    /// Elements in document order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = match self.get(id) {
            Some(element) => {
                element.children.iter().rev().copied().collect::<Vec<_>>()
            }
            None => return out,
        };
        while let Some(current) = stack.pop() {
            if let Some(element) = self.get(current) {
                out.push(current);
                stack.extend(element.children.iter().rev());
            }
        }
        out
    }

    pub fn query_selector_all(&self, selectors: &SelectorList) -> Vec<ElementId> {
        self.query_within(self.root, selectors)
    }

    pub fn query_within(
        &self,
        scope: ElementId,
        selectors: &SelectorList,
    ) -> Vec<ElementId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| selectors.matches(self, *id))
            .collect()
    }

    pub fn query_selector(&self, selectors: &SelectorList) -> Option<ElementId> {
        self.query_selector_all(selectors).into_iter().next()
    }

    /// Nearest inclusive ancestor matching `selectors`.
    pub fn closest(
        &self,
        id: ElementId,
        selectors: &SelectorList,
    ) -> Option<ElementId> {
        if !self.contains(id) {
            return None;
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|candidate| selectors.matches(self, *candidate))
    }
}

/// Operations the image loader needs from a document.
///
/// Writes addressed to elements that are no longer in the document are
/// ignored, so late load completions are harmless.
pub trait Document: Send + Sync {
    fn query_all(&self, selectors: &SelectorList) -> Vec<ElementId>;

    fn contains(&self, id: ElementId) -> bool;

    fn attribute(&self, id: ElementId, name: &str) -> Option<String>;

    fn remove_attribute(&self, id: ElementId, name: &str);

    /// Assign the paint-visible source.
    fn set_source(&self, id: ElementId, url: &str);

    fn add_class(&self, id: ElementId, class: &str);

    fn closest(
        &self,
        id: ElementId,
        selectors: &SelectorList,
    ) -> Option<ElementId>;

    fn layout_rect(&self, id: ElementId) -> Option<Rect>;

    /// Human-readable label for log messages.
    fn describe(&self, id: ElementId) -> String {
        self.attribute(id, "alt")
            .filter(|alt| !alt.trim().is_empty())
            .unwrap_or_else(|| "unnamed image".to_string())
    }
}

/// A [`Page`] shared between renderers and the image loader.
#[derive(Debug, Clone, Default)]
pub struct SharedPage {
    inner: Arc<RwLock<Page>>,
}

impl SharedPage {
    pub fn new(page: Page) -> Self {
        Self {
            inner: Arc::new(RwLock::new(page)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Page> {
        self.inner.write()
    }
}

impl Document for SharedPage {
    fn query_all(&self, selectors: &SelectorList) -> Vec<ElementId> {
        self.read().query_selector_all(selectors)
    }

    fn contains(&self, id: ElementId) -> bool {
        self.read().contains(id)
    }

    fn attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.read()
            .get(id)
            .and_then(|element| element.attribute(name))
            .map(str::to_string)
    }

    fn remove_attribute(&self, id: ElementId, name: &str) {
        let _ = self.write().remove_attribute(id, name);
    }

    fn set_source(&self, id: ElementId, url: &str) {
        let _ = self.write().set_attribute(id, "src", url);
    }

    fn add_class(&self, id: ElementId, class: &str) {
        let _ = self.write().add_class(id, class);
    }

    fn closest(
        &self,
        id: ElementId,
        selectors: &SelectorList,
    ) -> Option<ElementId> {
        self.read().closest(id, selectors)
    }

    fn layout_rect(&self, id: ElementId) -> Option<Rect> {
        self.read().layout_rect(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_a_subtree_drops_descendants() {
        let mut page = Page::new();
        let root = page.root();
        let card = page.append(root, ElementSpec::new("article")).unwrap();
        let img = page.append(card, ElementSpec::new("img")).unwrap();

        page.remove(card).unwrap();
        assert!(!page.contains(card));
        assert!(!page.contains(img));
        assert!(page.get(root).unwrap().children().is_empty());
        assert_eq!(page.remove(root), Err(DomError::RootRemoval));
    }

    #[test]
    fn hidden_ancestors_remove_layout() {
        let mut page = Page::new();
        let root = page.root();
        let card = page.append(root, ElementSpec::new("article")).unwrap();
        let img = page
            .append(
                card,
                ElementSpec::new("img").rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
            )
            .unwrap();
        assert!(page.layout_rect(img).is_some());

        page.set_hidden(card, true).unwrap();
        assert!(!page.is_rendered(img));
        assert_eq!(page.layout_rect(img), None);
    }

    #[test]
    fn closest_includes_the_element_itself() {
        let mut page = Page::new();
        let root = page.root();
        let wrapper = page
            .append(root, ElementSpec::new("div").class("article-image"))
            .unwrap();
        let img = page
            .append(wrapper, ElementSpec::new("img").class("article-image"))
            .unwrap();
        let selectors = SelectorList::parse(".article-image").unwrap();
        assert_eq!(page.closest(img, &selectors), Some(img));
        assert_eq!(page.closest(wrapper, &selectors), Some(wrapper));
    }

    #[test]
    fn query_returns_document_order_and_text_content_concatenates() {
        let mut page = Page::new();
        let root = page.root();
        let first = page
            .append(root, ElementSpec::new("span").class("x").text("a"))
            .unwrap();
        let nested = page.append(first, ElementSpec::new("b").text("b")).unwrap();
        let second = page
            .append(root, ElementSpec::new("span").class("x").text("c"))
            .unwrap();
        let selectors = SelectorList::parse(".x, b").unwrap();
        assert_eq!(
            page.query_selector_all(&selectors),
            vec![first, nested, second]
        );
        assert_eq!(page.text_content(root), "abc");
    }

    #[test]
    fn shared_page_ignores_writes_to_removed_elements() {
        let shared = SharedPage::default();
        let img = {
            let mut page = shared.write();
            let root = page.root();
            page.append(root, ElementSpec::new("img").attr("alt", "Cover"))
                .unwrap()
        };
        assert_eq!(shared.describe(img), "Cover");

        shared.write().remove(img).unwrap();
        shared.set_source(img, "https://example.test/x.png");
        shared.add_class(img, "loaded");
        assert!(!shared.contains(img));
        assert_eq!(shared.describe(img), "unnamed image");
    }
}
