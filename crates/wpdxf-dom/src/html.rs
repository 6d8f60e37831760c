//! Parses a cleaned HTML body into a DOM tree, via the standard
//! `html5ever` + `markup5ever_rcdom` combination (the same `html5ever`
//! stack `sws-scraper` builds on, minus its hand-rolled `TreeSink`: the
//! reference repo's own `node.rs`/`tree_sink.rs` counterpart was not part
//! of the retrieved sources, and `RcDom` is the community's standard
//! drop-in `TreeSink` for exactly this shape of tree).

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// A parsed HTML document. DOM handles borrowed from it must not outlive
/// it (spec.md §9): `Handle` is an `Rc`, so this is enforced by ordinary
/// ownership rather than an explicit lifetime parameter.
pub struct Html {
    pub dom: RcDom,
}

impl Html {
    pub fn parse(body: &str) -> Html {
        let dom = parse_document(RcDom::default(), ParseOpts::default())
            .from_utf8()
            .read_from(&mut body.as_bytes())
            .unwrap_or_else(|_| {
                // `read_from` over an in-memory `&[u8]` is infallible in
                // practice; html5ever never rejects malformed markup, it
                // recovers per the HTML5 parsing algorithm.
                parse_document(RcDom::default(), ParseOpts::default())
                    .from_utf8()
                    .one(body.as_bytes())
            });
        Html { dom }
    }

    pub fn root_element(&self) -> Handle {
        self.dom.document.clone()
    }
}

pub fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

pub fn is_element(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Element { .. })
}

pub fn attr(handle: &Handle, name: &str) -> Option<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == name)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// Every attribute name present on `handle`, in source order.
pub fn attr_names(handle: &Handle) -> Vec<String> {
    match &handle.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|a| a.name.local.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn children(handle: &Handle) -> Vec<Handle> {
    handle.children.borrow().iter().cloned().collect()
}

pub fn element_children(handle: &Handle) -> Vec<Handle> {
    children(handle).into_iter().filter(is_element).collect()
}

pub fn parent(handle: &Handle) -> Option<Handle> {
    let weak_opt = handle.parent.take();
    let result = weak_opt.as_ref().and_then(|w| w.upgrade());
    handle.parent.set(weak_opt);
    result
}

/// All descendant elements, in document order, optionally including `handle`
/// itself.
pub fn descendants(handle: &Handle, include_self: bool) -> Vec<Handle> {
    let mut out = Vec::new();
    if include_self && is_element(handle) {
        out.push(handle.clone());
    }
    for child in children(handle) {
        out.extend(descendants(&child, true));
    }
    out
}

/// Element siblings following `handle` under its parent, in document order.
pub fn following_siblings(handle: &Handle) -> Vec<Handle> {
    match parent(handle) {
        None => Vec::new(),
        Some(p) => {
            let siblings = element_children(&p);
            let pos = siblings.iter().position(|h| same_node(h, handle));
            match pos {
                Some(i) => siblings[i + 1..].to_vec(),
                None => Vec::new(),
            }
        }
    }
}

/// Element siblings preceding `handle` under its parent, nearest-first.
pub fn preceding_siblings(handle: &Handle) -> Vec<Handle> {
    match parent(handle) {
        None => Vec::new(),
        Some(p) => {
            let siblings = element_children(&p);
            let pos = siblings.iter().position(|h| same_node(h, handle));
            match pos {
                Some(i) => siblings[..i].iter().rev().cloned().collect(),
                None => Vec::new(),
            }
        }
    }
}

pub fn ancestors(handle: &Handle, include_self: bool) -> Vec<Handle> {
    let mut out = Vec::new();
    let mut cur = if include_self {
        Some(handle.clone())
    } else {
        parent(handle)
    };
    while let Some(node) = cur {
        out.push(node.clone());
        cur = parent(&node);
    }
    out
}

pub fn same_node(a: &Handle, b: &Handle) -> bool {
    std::rc::Rc::ptr_eq(a, b)
}

/// 1-based positional index among same-tag siblings (spec.md §4.5 "step
/// constructor from a DOM element").
pub fn position_among_siblings(handle: &Handle) -> i64 {
    let tag = match tag_name(handle) {
        Some(t) => t,
        None => return 1,
    };
    match parent(handle) {
        None => 1,
        Some(p) => {
            let mut idx = 1i64;
            for sib in element_children(&p) {
                if same_node(&sib, handle) {
                    return idx;
                }
                if tag_name(&sib).as_deref() == Some(tag.as_str()) {
                    idx += 1;
                }
            }
            idx
        }
    }
}

/// Concatenated text content of the subtree rooted at `handle`
/// (`concat(self::*//text())`).
pub fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    collect_text(handle, &mut out);
    out
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in children(handle) {
        collect_text(&child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_document_and_finds_elements() {
        let html = Html::parse("<html><body><div id=\"a\">hello <b>world</b></div></body></html>");
        let root = html.root_element();
        let divs: Vec<Handle> = descendants(&root, false)
            .into_iter()
            .filter(|h| tag_name(h).as_deref() == Some("div"))
            .collect();
        assert_eq!(divs.len(), 1);
        assert_eq!(attr(&divs[0], "id").as_deref(), Some("a"));
        assert_eq!(text_content(&divs[0]).trim(), "hello world");
    }

    #[test]
    fn sibling_position_counts_only_matching_tags() {
        let html = Html::parse("<html><body><p>a</p><div>b</div><p>c</p></body></html>");
        let root = html.root_element();
        let ps: Vec<Handle> = descendants(&root, false)
            .into_iter()
            .filter(|h| tag_name(h).as_deref() == Some("p"))
            .collect();
        assert_eq!(position_among_siblings(&ps[0]), 1);
        assert_eq!(position_among_siblings(&ps[1]), 2);
    }
}
