//! Inducer (C10): the top-level entry point tying the aligner/merger (C8)
//! and enricher (C9) together into a single resource-wide extraction
//! program.
//!
//! Grounded in `original_source/.../nielandt/induce.py`'s
//! `NielandtInduction.induce` (src variant): start path and end path are
//! each independently aligned and merged, then each independently
//! enriched against its own target (`start_node` for the start path,
//! `end_node` for the end path). Expects the caller (the wrap loop, C11)
//! to have already run [`crate::reduce::reduce_ambiguity`] so every
//! example contributes exactly one candidate pair.

use wpdxf_dom::{eval::path_from, subtree_root, Handle, Resource};
use wpdxf_xpath::{RelativeXPath, XPath};

use crate::{align, enrich, merge};

/// Induces the resource's extraction program from its (assumed
/// unambiguous) examples, optionally enriching both paths' predicates.
/// Stores the result on `resource.program` and returns it.
pub fn induce(resource: &mut Resource, enrich_predicates: bool) -> RelativeXPath {
    let examples = resource.examples();

    let mut triples: Vec<(Handle, Handle, Handle)> = Vec::new();
    for cands in examples.values() {
        for (_page_idx, inp, out) in cands {
            match subtree_root(inp, out) {
                Some(root) => triples.push((root, inp.clone(), out.clone())),
                None => log::warn!("skipping example pair with no common ancestor"),
            }
        }
    }

    if triples.is_empty() {
        log::warn!("induce called on {} with no usable examples", resource.identifier);
        let empty = RelativeXPath::new(XPath::empty(), XPath::empty());
        resource.program = Some(empty.clone());
        return empty;
    }
    log::debug!("inducing program for {} from {} examples", resource.identifier, triples.len());

    let start_paths: Vec<XPath> = triples.iter().map(|(root, inp, _)| path_from(root, inp)).collect();
    let end_paths: Vec<XPath> = triples.iter().map(|(root, _, out)| path_from(root, out)).collect();

    let mut start_path = merge::merge(&align::align(start_paths));
    let mut end_path = merge::merge(&align::align(end_paths));

    if enrich_predicates {
        let start_examples: Vec<(Handle, Handle)> = triples
            .iter()
            .map(|(root, inp, _)| (root.clone(), inp.clone()))
            .collect();
        let end_examples: Vec<(Handle, Handle)> = triples
            .iter()
            .map(|(root, _, out)| (root.clone(), out.clone()))
            .collect();

        let start_classes = enrich::preprocess(&start_path, &start_examples, &resource.variables);
        enrich::enrich(&mut start_path, &start_classes, &mut resource.variables);

        let end_classes = enrich::preprocess(&end_path, &end_examples, &resource.variables);
        enrich::enrich(&mut end_path, &end_classes, &mut resource.variables);
    }

    let program = RelativeXPath::new(start_path, end_path);
    resource.program = Some(program.clone());
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpdxf_dom::html::{descendants, tag_name, Html};
    use wpdxf_dom::WebPage;

    fn find_tag(root: &Handle, tag: &str) -> Vec<Handle> {
        descendants(root, false)
            .into_iter()
            .filter(|h| tag_name(h).as_deref() == Some(tag))
            .collect()
    }

    #[test]
    fn induces_nonempty_program_from_consistent_examples() {
        let html = Html::parse(
            "<html><body>\
               <div><span class=\"k\">Name1</span><span class=\"v\">Val1</span></div>\
               <div><span class=\"k\">Name2</span><span class=\"v\">Val2</span></div>\
             </body></html>",
        );
        let root = html.root_element();
        let ks = find_tag(&root, "span");
        let mut page = WebPage::new("http://example.com/a", html);
        // ks: [Name1(k), Val1(v), Name2(k), Val2(v)]
        page.add_example(0, ks[0].clone(), ks[1].clone());
        page.add_example(1, ks[2].clone(), ks[3].clone());

        let mut resource = Resource::new("http://example.com", vec![page]);
        let program = induce(&mut resource, true);

        assert!(!program.end_path.is_empty());
        assert_eq!(resource.program.as_ref().unwrap().end_path.len(), program.end_path.len());
    }

    #[test]
    fn empty_resource_yields_empty_program() {
        let mut resource: Resource = Resource::new("http://example.com", vec![]);
        let program = induce(&mut resource, true);
        assert!(program.start_path.is_empty());
        assert!(program.end_path.is_empty());
    }
}
