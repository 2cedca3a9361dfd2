//! Bottom, top and precedence levels of the tasks of a workflow.
//!
//! Levels are computed with memoized depth-first traversals. Transfer tasks are jumped
//! over to reach the compute task on their other side and their cost is not taken
//! into account, in either direction. Transfer tasks themselves keep null levels.
use crate::amdahl::estimate_execution_time;
use crate::error::Result;
use crate::graph_extension::{GraphExtension, TaskKind, Workflow};
use log::debug;
use petgraph::graph::NodeIndex;

pub trait LevelAnalyzer {
    fn set_bottom_levels(&mut self, power: f64) -> Result<()>;
    fn set_top_levels(&mut self, power: f64) -> Result<()>;
    fn set_precedence_levels(&mut self) -> Result<()>;
    fn set_levels(&mut self, power: f64) -> Result<()>;
}

impl LevelAnalyzer for Workflow {
    /// The bottom level is the length of the longest path from a task to the end task,
    /// in estimated computation times under the current allocation sizes. It includes
    /// the task's own execution time.
    fn set_bottom_levels(&mut self, power: f64) -> Result<()> {
        let root = self.get_root()?;
        let mut visited = vec![false; self.node_count()];
        bottom_level_recursive_computation(self, root, power, &mut visited);
        Ok(())
    }

    /// The top level is the length of the longest path from the root task to a task,
    /// excluding the task's own execution time.
    fn set_top_levels(&mut self, power: f64) -> Result<()> {
        let end = self.get_end()?;
        let mut visited = vec![false; self.node_count()];
        top_level_recursive_computation(self, end, power, &mut visited);
        Ok(())
    }

    /// The precedence level is the length of the longest path from the root task in
    /// number of ancestors. The root task is at level 0.
    fn set_precedence_levels(&mut self) -> Result<()> {
        let end = self.get_end()?;
        let mut visited = vec![false; self.node_count()];
        precedence_level_recursive_computation(self, end, &mut visited);
        Ok(())
    }

    fn set_levels(&mut self, power: f64) -> Result<()> {
        self.set_bottom_levels(power)?;
        self.set_top_levels(power)?;
        self.set_precedence_levels()
    }
}

fn estimate(dag: &Workflow, node_i: NodeIndex, power: f64) -> f64 {
    let task = &dag[node_i];
    estimate_execution_time(task, task.allocation_size, power)
}

/// Keeps the first candidate, then any candidate strictly above the current maximum.
fn update_max<T: PartialOrd>(max_level: &mut Option<T>, level: T) {
    if max_level.as_ref().map_or(true, |max| level > *max) {
        *max_level = Some(level);
    }
}

fn bottom_level_recursive_computation(
    dag: &mut Workflow,
    node_i: NodeIndex,
    power: f64,
    visited: &mut [bool],
) -> f64 {
    if dag[node_i].kind == TaskKind::End {
        dag[node_i].bottom_level = 0.0;
        visited[node_i.index()] = true;
        return 0.0;
    }

    let mut max_bottom_level = None;
    for child in dag.get_compute_suc_nodes(node_i) {
        let child_bottom_level = if visited[child.index()] {
            dag[child].bottom_level
        } else {
            bottom_level_recursive_computation(dag, child, power, visited)
        };
        update_max(&mut max_bottom_level, child_bottom_level);
    }

    let bottom_level = estimate(dag, node_i, power) + max_bottom_level.unwrap_or(0.0);
    dag[node_i].bottom_level = bottom_level;
    visited[node_i.index()] = true;
    debug!("{}'s bottom level is {}", dag[node_i].name, bottom_level);
    bottom_level
}

fn top_level_recursive_computation(
    dag: &mut Workflow,
    node_i: NodeIndex,
    power: f64,
    visited: &mut [bool],
) -> f64 {
    if dag[node_i].kind == TaskKind::Root {
        dag[node_i].top_level = 0.0;
        visited[node_i.index()] = true;
        return 0.0;
    }

    let mut max_top_level = None;
    for parent in dag.get_compute_pre_nodes(node_i) {
        let parent_top_level = if visited[parent.index()] {
            dag[parent].top_level
        } else {
            top_level_recursive_computation(dag, parent, power, visited)
        };
        update_max(
            &mut max_top_level,
            parent_top_level + estimate(dag, parent, power),
        );
    }

    let top_level = max_top_level.unwrap_or(0.0);
    dag[node_i].top_level = top_level;
    visited[node_i.index()] = true;
    debug!("{}'s top level is {}", dag[node_i].name, top_level);
    top_level
}

fn precedence_level_recursive_computation(
    dag: &mut Workflow,
    node_i: NodeIndex,
    visited: &mut [bool],
) -> i32 {
    if dag[node_i].kind == TaskKind::Root {
        dag[node_i].precedence_level = 0;
        visited[node_i.index()] = true;
        return 0;
    }

    let mut max_precedence_level = None;
    for parent in dag.get_compute_pre_nodes(node_i) {
        let parent_precedence_level = if visited[parent.index()] {
            dag[parent].precedence_level
        } else {
            precedence_level_recursive_computation(dag, parent, visited)
        };
        update_max(&mut max_precedence_level, parent_precedence_level + 1);
    }

    let precedence_level = max_precedence_level.unwrap_or(0);
    dag[node_i].precedence_level = precedence_level;
    visited[node_i.index()] = true;
    debug!(
        "{}'s precedence level is {}",
        dag[node_i].name, precedence_level
    );
    precedence_level
}
