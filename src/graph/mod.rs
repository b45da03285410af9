//! Task graph and sequencer.
//!
//! A [`TaskGraph`] is a list of task invocations, each naming the earlier
//! invocations it must wait for. [`run_graph`] starts every invocation as
//! soon as its predecessors have finished, so one generic loop covers the
//! strict `build` chain and the `build → (watch ‖ server)` fan-out.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::Result;
use crate::models::{Target, Task};

/// Executes a single task. The sequencer only decides *when*.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: Task) -> Result<()>;
}

/// Index of a node within its graph.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub task: Task,
    pub after: Vec<NodeId>,
}

/// Acyclic by construction: a node can only wait for nodes added before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGraph {
    nodes: Vec<Node>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `task` after the given nodes and return its id.
    ///
    /// # Panics
    /// If a predecessor id does not refer to an already added node.
    pub fn add(&mut self, task: Task, after: &[NodeId]) -> NodeId {
        let id = self.nodes.len();
        assert!(
            after.iter().all(|&p| p < id),
            "predecessor of '{}' must be added first",
            task
        );
        self.nodes.push(Node {
            task,
            after: after.to_vec(),
        });
        id
    }

    /// Add `tasks` as a chain after `after`; returns the last node, or
    /// `after` unchanged when `tasks` is empty.
    pub fn chain(&mut self, tasks: &[Task], after: Option<NodeId>) -> Option<NodeId> {
        tasks.iter().fold(after, |prev, &task| {
            let deps: Vec<NodeId> = prev.into_iter().collect();
            Some(self.add(task, &deps))
        })
    }

    /// The graph a CLI target runs.
    pub fn for_target(target: Target) -> Self {
        let mut graph = Self::new();
        match target {
            Target::Task(task) => {
                graph.add(task, &[]);
            }
            Target::Build => {
                graph.add_build();
            }
            Target::Default => {
                let built = graph.add_build();
                graph.add(Task::Watch, &[built]);
                graph.add(Task::Server, &[built]);
            }
        }
        graph
    }

    fn add_build(&mut self) -> NodeId {
        let clean = self.add(Task::Clean, &[]);
        self.chain(&Task::BUILD_STEPS, Some(clean)).unwrap_or(clean)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Run every node of `graph`, each once all of its predecessors succeeded.
///
/// Ready nodes run concurrently. The first error stops scheduling; nodes still
/// in flight are dropped and the error is returned.
pub async fn run_graph(graph: &TaskGraph, runner: &dyn TaskRunner) -> Result<()> {
    let nodes = graph.nodes();
    let mut done = vec![false; nodes.len()];
    let mut started = vec![false; nodes.len()];
    let mut in_flight = FuturesUnordered::new();

    loop {
        for (id, node) in nodes.iter().enumerate() {
            if !started[id] && node.after.iter().all(|&p| done[p]) {
                started[id] = true;
                tracing::debug!("Starting '{}'", node.task);
                in_flight.push(async move { (id, runner.run(node.task).await) });
            }
        }

        match in_flight.next().await {
            Some((id, Ok(()))) => {
                tracing::debug!("Finished '{}'", nodes[id].task);
                done[id] = true;
            }
            Some((id, Err(e))) => {
                tracing::error!("'{}' failed: {}", nodes[id].task, e);
                return Err(e);
            }
            None => return Ok(()),
        }
    }
}
