/// Node hierarchy exported with a saved workflow
///
/// The executor consuming saved workflows reads a flat list of tasks in canvas
/// order, where a `Fork` task carries the tasks it fans out to. This module
/// derives that list from the graph and lays a graph back out from it.

use crate::catalog::NodeCatalog;
use crate::editor::{GraphError, GraphModel, GraphSnapshot, Node, NodePatch, Position};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Label that marks a fan-out node
pub const FORK_LABEL: &str = "Fork";

const BASE_X: f64 = 500.0;
const START_Y: f64 = 120.0;
const ROW_HEIGHT: f64 = 100.0;
const FORK_OFFSET_X: f64 = 200.0;

/// One task in the exported hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub node_name: String,
    #[serde(default)]
    pub input_parameters: Vec<String>,
    #[serde(default = "default_one")]
    pub retry_count: u64,
    #[serde(default = "default_one")]
    pub retry_delay_seconds: u64,
    #[serde(default = "default_timeout")]
    pub timeout_milliseconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fork_tasks: Vec<TaskSpec>,
}

fn default_one() -> u64 {
    1
}

fn default_timeout() -> u64 {
    1000
}

impl TaskSpec {
    /// Export a node using its effective config (schema defaults applied)
    pub fn from_node(node: &Node, catalog: &NodeCatalog) -> Self {
        let config = catalog
            .get(&node.node_type)
            .map(|entry| entry.resolve(&node.config))
            .unwrap_or_else(|| node.config.clone());
        let number = |name: &str, default: u64| config.get(name).and_then(Value::as_u64).unwrap_or(default);

        Self {
            node_name: node.label.clone(),
            input_parameters: config
                .get("inputParameters")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default(),
            retry_count: number("retryCount", default_one()),
            retry_delay_seconds: number("retryDelaySeconds", default_one()),
            timeout_milliseconds: number("timeoutMilliseconds", default_timeout()),
            url: config
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            headers: config
                .get("headers")
                .and_then(Value::as_object)
                .filter(|headers| !headers.is_empty())
                .cloned(),
            fork_tasks: Vec::new(),
        }
    }

    pub fn is_fork(&self) -> bool {
        is_fork_label(&self.node_name)
    }

    /// Label and config patch recreating this task on a node of the given catalog type
    fn to_patch(&self, catalog: &NodeCatalog, node_type: &str) -> NodePatch {
        let mut patch = NodePatch {
            label: Some(self.node_name.clone()).filter(|name| !name.trim().is_empty()),
            ..NodePatch::default()
        };
        let Some(entry) = catalog.get(node_type) else {
            return patch;
        };

        let mut values = vec![
            ("inputParameters", Value::from(self.input_parameters.clone())),
            ("retryCount", Value::from(self.retry_count)),
            ("retryDelaySeconds", Value::from(self.retry_delay_seconds)),
            ("timeoutMilliseconds", Value::from(self.timeout_milliseconds)),
        ];
        if let Some(url) = &self.url {
            values.push(("url", Value::String(url.clone())));
        }
        if let Some(headers) = &self.headers {
            values.push(("headers", Value::Object(headers.clone())));
        }

        for (name, value) in values {
            if entry.field(name).is_some() {
                patch.config.insert(name.to_string(), value);
            }
        }
        patch
    }
}

/// The exported task list only carries names, so the label alone marks a fork
/// on both export and import.
fn is_fork_label(label: &str) -> bool {
    label == FORK_LABEL
}

/// Flatten a graph into the exported task list
///
/// Nodes appear in canvas order. A fork node lists its direct successors as
/// `forkTasks`, recursively when a successor is itself a fork; nested tasks are
/// not repeated at the top level.
pub fn build_hierarchy(snapshot: &GraphSnapshot, catalog: &NodeCatalog) -> Vec<TaskSpec> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let indices: HashMap<&str, NodeIndex> = snapshot
        .nodes
        .iter()
        .enumerate()
        .map(|(position, node)| (node.id.as_str(), graph.add_node(position)))
        .collect();
    for edge in &snapshot.edges {
        if let (Some(&from), Some(&to)) = (indices.get(edge.source_id.as_str()), indices.get(edge.target_id.as_str())) {
            graph.add_edge(from, to, ());
        }
    }

    // petgraph yields the most recently added edge first; keep edge order instead
    let successors = |node: &Node| -> Vec<usize> {
        let mut found: Vec<usize> = graph
            .neighbors_directed(indices[node.id.as_str()], Direction::Outgoing)
            .map(|index| graph[index])
            .collect();
        found.reverse();
        found
    };

    let mut fork_tasks: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut nested: HashSet<usize> = HashSet::new();
    for (position, node) in snapshot.nodes.iter().enumerate() {
        if is_fork_label(&node.label) {
            let tasks = successors(node);
            nested.extend(tasks.iter().copied());
            fork_tasks.insert(position, tasks);
        }
    }

    let mut path = Vec::new();
    let result: Vec<TaskSpec> = (0..snapshot.nodes.len())
        .filter(|position| !nested.contains(position))
        .map(|position| export_task(snapshot, catalog, &fork_tasks, position, &mut path))
        .collect();

    tracing::debug!("Built hierarchy with {} top-level tasks from {} nodes", result.len(), snapshot.nodes.len());
    result
}

/// Export one node, nesting the successors of forks (including forks inside forks)
fn export_task(
    snapshot: &GraphSnapshot,
    catalog: &NodeCatalog,
    fork_tasks: &HashMap<usize, Vec<usize>>,
    position: usize,
    path: &mut Vec<usize>,
) -> TaskSpec {
    let mut exported = TaskSpec::from_node(&snapshot.nodes[position], catalog);
    if let Some(tasks) = fork_tasks.get(&position) {
        path.push(position);
        for &task in tasks {
            if !path.contains(&task) {
                exported.fork_tasks.push(export_task(snapshot, catalog, fork_tasks, task, path));
            }
        }
        path.pop();
    }
    exported
}

/// Recreate a graph from an exported task list
///
/// Top-level tasks form a vertical column joined by sequential edges. A fork's
/// tasks are placed diagonally to its right, each connected from the fork and
/// merged into the next top-level task. A fork nested in a fork merges through
/// its own tasks.
pub fn layout_hierarchy(catalog: Arc<NodeCatalog>, tasks: &[TaskSpec]) -> Result<GraphSnapshot, GraphError> {
    let mut graph = GraphModel::new(catalog);
    let mut column: Vec<(String, Vec<String>)> = Vec::with_capacity(tasks.len());
    let mut row = 0usize;

    for task in tasks {
        let position = Position::new(BASE_X, START_Y + row as f64 * ROW_HEIGHT);
        let id = place_task(&mut graph, task, position)?;
        let exit_ids = place_fork_tasks(&mut graph, task, &id, position)?;
        row += 1 + rows_below(task);
        column.push((id, exit_ids));
    }

    for (index, pair) in column.windows(2).enumerate() {
        let (current, exit_ids) = &pair[0];
        let (next, _) = &pair[1];
        if tasks[index].is_fork() && !exit_ids.is_empty() {
            for exit in exit_ids {
                graph.add_edge(exit, next)?;
            }
        } else {
            graph.add_edge(current, next)?;
        }
    }

    Ok(graph.snapshot())
}

fn place_task(graph: &mut GraphModel, task: &TaskSpec, position: Position) -> Result<String, GraphError> {
    let node_type = if task.is_fork() && graph.catalog().contains("fork") {
        "fork"
    } else {
        "task"
    };
    let node = graph.add_node(node_type, position)?;
    let patch = task.to_patch(graph.catalog(), node_type);
    graph.update_node_config(&node.id, patch)?;
    Ok(node.id)
}

/// Rows a task's fork tasks occupy beneath it
fn rows_below(task: &TaskSpec) -> usize {
    task.fork_tasks
        .iter()
        .enumerate()
        .map(|(index, child)| index + 1 + rows_below(child))
        .max()
        .unwrap_or(0)
}

/// Place a fork's tasks and return the ids that merge into the next top-level task
fn place_fork_tasks(
    graph: &mut GraphModel,
    task: &TaskSpec,
    parent_id: &str,
    parent_position: Position,
) -> Result<Vec<String>, GraphError> {
    let mut exits = Vec::with_capacity(task.fork_tasks.len());
    for (index, child) in task.fork_tasks.iter().enumerate() {
        let step = (index + 1) as f64;
        let position = parent_position + Position::new(step * FORK_OFFSET_X, step * ROW_HEIGHT);
        let child_id = place_task(graph, child, position)?;
        graph.add_edge(parent_id, &child_id)?;
        let nested = place_fork_tasks(graph, child, &child_id, position)?;
        if child.is_fork() && !nested.is_empty() {
            exits.extend(nested);
        } else {
            exits.push(child_id);
        }
    }
    Ok(exits)
}
