// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;

use marginalia_core::ObjectId;
use petgraph::Direction;
use petgraph::prelude::DiGraphMap;

use crate::memory::{InnerMemoryStore, MemoryStore, MemoryStoreError};
use crate::tree::TreeStore;
use crate::tree::traits::MAX_TREE_DEPTH;

/// Graph of parent -> child edges over all annotations.
fn parent_graph(store: &InnerMemoryStore) -> DiGraphMap<ObjectId, ()> {
    let mut graph = DiGraphMap::new();
    for annotation in store.annotations.values() {
        graph.add_node(annotation.id);
        if let Some(parent_id) = annotation.parent_id {
            graph.add_edge(parent_id, annotation.id, ());
        }
    }
    graph
}

/// Breadth-first walk from `start` along `direction`, one layer per depth.
fn walk(graph: &DiGraphMap<ObjectId, ()>, start: ObjectId, direction: Direction) -> Vec<ObjectId> {
    let mut visited = HashSet::from([start]);
    let mut result = Vec::new();

    if !graph.contains_node(start) {
        return result;
    }

    let mut layer = vec![start];
    for _ in 0..MAX_TREE_DEPTH {
        let mut next: Vec<ObjectId> = layer
            .iter()
            .flat_map(|node| graph.neighbors_directed(*node, direction))
            .filter(|node| visited.insert(*node))
            .collect();
        if next.is_empty() {
            break;
        }
        next.sort();
        result.extend_from_slice(&next);
        layer = next;
    }

    result
}

impl TreeStore for MemoryStore {
    async fn ancestors(&self, id: &ObjectId) -> Result<Vec<ObjectId>, MemoryStoreError> {
        let graph = parent_graph(&self.read_store());
        Ok(walk(&graph, *id, Direction::Incoming))
    }

    async fn descendants(&self, id: &ObjectId) -> Result<Vec<ObjectId>, MemoryStoreError> {
        let graph = parent_graph(&self.read_store());
        Ok(walk(&graph, *id, Direction::Outgoing))
    }
}
