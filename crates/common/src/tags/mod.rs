//! Tag inference graph traversal
//!
//! Tags point at the tags they imply through `inferred_tags`. The closure of
//! a set of tags is every tag reachable along those edges, seeds included.
//! Stored data may contain cycles; the traversal tolerates them.

use crate::db::models::{Tag, TagId};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Read access to tags by id
pub trait TagGraph {
    fn tag(&self, id: TagId) -> Option<&Tag>;
}

impl TagGraph for HashMap<TagId, Tag> {
    fn tag(&self, id: TagId) -> Option<&Tag> {
        self.get(&id)
    }
}

impl TagGraph for BTreeMap<TagId, Tag> {
    fn tag(&self, id: TagId) -> Option<&Tag> {
        self.get(&id)
    }
}

impl<G: TagGraph + ?Sized> TagGraph for &G {
    fn tag(&self, id: TagId) -> Option<&Tag> {
        (**self).tag(id)
    }
}

/// Depth-first, pre-order walk over inferred tags.
///
/// Yields each reachable tag once, in the order it is first discovered. The
/// visited set is shared across every seed and branch; meeting a visited tag
/// ends that branch only.
pub struct InferredTags<'g, G: ?Sized> {
    graph: &'g G,
    stack: Vec<TagId>,
    visited: HashSet<TagId>,
}

impl<'g, G: TagGraph + ?Sized> InferredTags<'g, G> {
    fn new(graph: &'g G, seeds: Vec<TagId>) -> Self {
        let mut stack = seeds;
        stack.reverse();
        Self {
            graph,
            stack,
            visited: HashSet::new(),
        }
    }
}

impl<'g, G: TagGraph + ?Sized> Iterator for InferredTags<'g, G> {
    type Item = &'g Tag;

    fn next(&mut self) -> Option<&'g Tag> {
        while let Some(id) = self.stack.pop() {
            if !self.visited.insert(id) {
                continue;
            }

            let Some(tag) = self.graph.tag(id) else {
                debug!(tag_id = %id, "Skipping dangling inferred tag");
                continue;
            };

            // Children go on in reverse so the first edge is explored first.
            self.stack.extend(
                tag.inferred_tags
                    .iter()
                    .rev()
                    .copied()
                    .filter(|child| !self.visited.contains(child)),
            );

            return Some(tag);
        }
        None
    }
}

/// Lazily traverse the inference closure of `seeds`
pub fn traverse_inferred<G, I>(graph: &G, seeds: I) -> InferredTags<'_, G>
where
    G: TagGraph + ?Sized,
    I: IntoIterator<Item = TagId>,
{
    InferredTags::new(graph, seeds.into_iter().collect())
}

/// The inference closure of `seeds`, in discovery order
pub fn closure<G, I>(graph: &G, seeds: I) -> Vec<&Tag>
where
    G: TagGraph + ?Sized,
    I: IntoIterator<Item = TagId>,
{
    let tags: Vec<&Tag> = traverse_inferred(graph, seeds).collect();
    debug!(closure_size = tags.len(), "Computed tag inference closure");
    tags
}
