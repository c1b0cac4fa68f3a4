use petgraph::Direction;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::task::{Relation, TaskId};

/// Task network: one node per task, one edge per relation (predecessor -> successor).
///
/// Edge weights are relation IDs.
pub struct ScheduleDag {
    pub graph: DiGraph<TaskId, u32>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    /// Relations that name an unknown task are skipped.
    pub fn build<'a>(
        tasks: impl IntoIterator<Item = TaskId>,
        relations: impl IntoIterator<Item = &'a Relation>,
    ) -> Self {
        let mut graph: DiGraph<TaskId, u32> = DiGraph::new();
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::new();

        for task in tasks {
            id_to_index
                .entry(task)
                .or_insert_with(|| graph.add_node(task));
        }

        for relation in relations {
            if let (Some(&u), Some(&v)) = (
                id_to_index.get(&relation.predecessor),
                id_to_index.get(&relation.successor),
            ) {
                graph.add_edge(u, v, relation.id);
            }
        }

        Self { graph, id_to_index }
    }

    fn neighbors(&self, task: TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(&index) = self.id_to_index.get(&task) else {
            return Vec::new();
        };
        let mut ids: Vec<TaskId> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|neighbor| self.graph[neighbor])
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn successors(&self, task: TaskId) -> Vec<TaskId> {
        self.neighbors(task, Direction::Outgoing)
    }

    pub fn predecessors(&self, task: TaskId) -> Vec<TaskId> {
        self.neighbors(task, Direction::Incoming)
    }

    /// Whether adding `predecessor -> successor` would close a loop.
    pub fn would_create_cycle(&self, predecessor: TaskId, successor: TaskId) -> bool {
        if predecessor == successor {
            return true;
        }
        match (
            self.id_to_index.get(&successor),
            self.id_to_index.get(&predecessor),
        ) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Tasks ordered so every predecessor precedes its successors; `None` on a cycle.
    pub fn topological_order(&self) -> Option<Vec<TaskId>> {
        toposort(&self.graph, None)
            .ok()
            .map(|order| order.into_iter().map(|index| self.graph[index]).collect())
    }
}
