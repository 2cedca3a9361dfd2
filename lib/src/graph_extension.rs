use crate::amdahl::estimate_area;
use crate::error::{Result, SchedError};
use log::warn;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction::{Incoming, Outgoing};
use std::collections::{BTreeMap, HashSet};

/// Kinds of tasks found in a parallel task graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Root,
    End,
    ComputeParallel,
    CommunicationTransfer,
}

/// Edge tag: `Flow` edges come from the workflow description, `Resource` edges are
/// added by the mapping to serialize tasks that share a workstation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Flow,
    Resource,
}

/// custom node data structure for workflow tasks (petgraph)
#[derive(Debug, Clone, PartialEq)]
pub struct TaskData {
    pub id: usize,
    pub name: String,
    pub kind: TaskKind,
    /// total work units (compute tasks)
    pub amount: f64,
    /// sequential fraction of the work (compute tasks)
    pub alpha: f64,
    /// payload in bytes (transfer tasks)
    pub size: f64,
    pub bottom_level: f64,
    pub top_level: f64,
    pub precedence_level: i32,
    pub allocation_size: usize,
    /// allocation size found for each assumed cluster size
    pub iterative_allocations: BTreeMap<usize, usize>,
    /// workstation indices of the concrete allocation
    pub workstations: Vec<usize>,
    pub estimated_finish_time: f64,
}

impl TaskData {
    fn new(name: &str, kind: TaskKind) -> TaskData {
        TaskData {
            id: 0,
            name: name.to_string(),
            kind,
            amount: 0.0,
            alpha: 0.0,
            size: 0.0,
            bottom_level: 0.0,
            top_level: 0.0,
            precedence_level: 0,
            allocation_size: 1,
            iterative_allocations: BTreeMap::new(),
            workstations: Vec::new(),
            estimated_finish_time: 0.0,
        }
    }

    pub fn root() -> TaskData {
        TaskData::new("root", TaskKind::Root)
    }

    pub fn end() -> TaskData {
        TaskData::new("end", TaskKind::End)
    }

    pub fn compute(name: &str, amount: f64, alpha: f64) -> TaskData {
        TaskData {
            amount,
            alpha,
            ..TaskData::new(name, TaskKind::ComputeParallel)
        }
    }

    pub fn transfer(name: &str, size: f64) -> TaskData {
        TaskData {
            size,
            ..TaskData::new(name, TaskKind::CommunicationTransfer)
        }
    }

    pub fn is_compute(&self) -> bool {
        self.kind == TaskKind::ComputeParallel
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TaskKind::CommunicationTransfer
    }
}

pub type Workflow = Graph<TaskData, Dependency>;

pub trait GraphExtension {
    fn add_task(&mut self, task: TaskData) -> NodeIndex;
    fn add_flow_dependency(&mut self, source: NodeIndex, target: NodeIndex) -> EdgeIndex;
    fn add_resource_dependency(&mut self, source: NodeIndex, target: NodeIndex) -> bool;
    fn dependency_exists(&self, source: NodeIndex, target: NodeIndex) -> bool;
    fn remove_resource_dependencies(&mut self) -> usize;
    fn count_resource_dependencies(&self) -> usize;
    fn get_root(&self) -> Result<NodeIndex>;
    fn get_end(&self) -> Result<NodeIndex>;
    fn find_task(&self, name: &str) -> Option<NodeIndex>;
    fn get_pre_nodes(&self, node_i: NodeIndex) -> Option<Vec<NodeIndex>>;
    fn get_suc_nodes(&self, node_i: NodeIndex) -> Option<Vec<NodeIndex>>;
    fn get_compute_pre_links(&self, node_i: NodeIndex) -> Vec<(NodeIndex, Option<NodeIndex>)>;
    fn get_compute_pre_nodes(&self, node_i: NodeIndex) -> Vec<NodeIndex>;
    fn get_compute_suc_nodes(&self, node_i: NodeIndex) -> Vec<NodeIndex>;
    fn get_compute_tasks(&self) -> Vec<NodeIndex>;
    fn set_allocations_from_iteration(&mut self, nworkstations: usize) -> Result<()>;
    fn record_iterative_allocations(&mut self, nworkstations: usize) -> Result<()>;
    fn reset_task_schedules(&mut self);
    fn get_total_area(&self, power: f64) -> f64;
    fn validate_workflow(&self) -> Result<()>;
}

impl GraphExtension for Workflow {
    fn add_task(&mut self, task: TaskData) -> NodeIndex {
        let node_i = self.add_node(task);
        self[node_i].id = node_i.index();
        node_i
    }

    fn add_flow_dependency(&mut self, source: NodeIndex, target: NodeIndex) -> EdgeIndex {
        self.add_edge(source, target, Dependency::Flow)
    }

    /// Returns false when any dependency already links the two tasks.
    fn add_resource_dependency(&mut self, source: NodeIndex, target: NodeIndex) -> bool {
        if source == target || self.dependency_exists(source, target) {
            return false;
        }
        self.add_edge(source, target, Dependency::Resource);
        true
    }

    fn dependency_exists(&self, source: NodeIndex, target: NodeIndex) -> bool {
        self.find_edge(source, target).is_some()
    }

    fn remove_resource_dependencies(&mut self) -> usize {
        let before = self.edge_count();
        self.retain_edges(|dag, edge_i| dag.edge_weight(edge_i) == Some(&Dependency::Flow));
        before - self.edge_count()
    }

    fn count_resource_dependencies(&self) -> usize {
        self.edge_indices()
            .filter(|&edge_i| self[edge_i] == Dependency::Resource)
            .count()
    }

    fn get_root(&self) -> Result<NodeIndex> {
        self.node_indices()
            .find(|&node_i| self[node_i].kind == TaskKind::Root)
            .ok_or_else(|| SchedError::Configuration("The workflow has no root task.".to_string()))
    }

    fn get_end(&self) -> Result<NodeIndex> {
        self.node_indices()
            .find(|&node_i| self[node_i].kind == TaskKind::End)
            .ok_or_else(|| SchedError::Configuration("The workflow has no end task.".to_string()))
    }

    fn find_task(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices().find(|&node_i| self[node_i].name == name)
    }

    fn get_pre_nodes(&self, node_i: NodeIndex) -> Option<Vec<NodeIndex>> {
        // petgraph walks adjacency lists newest first, reverse to get declaration order.
        let mut pre_nodes = self
            .edges_directed(node_i, Incoming)
            .filter(|edge| *edge.weight() == Dependency::Flow)
            .map(|edge| edge.source())
            .collect::<Vec<_>>();
        pre_nodes.reverse();

        if pre_nodes.is_empty() {
            None
        } else {
            Some(pre_nodes)
        }
    }

    fn get_suc_nodes(&self, node_i: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut suc_nodes = self
            .edges_directed(node_i, Outgoing)
            .filter(|edge| *edge.weight() == Dependency::Flow)
            .map(|edge| edge.target())
            .collect::<Vec<_>>();
        suc_nodes.reverse();

        if suc_nodes.is_empty() {
            None
        } else {
            Some(suc_nodes)
        }
    }

    /// Predecessors that carry a cost, each with the transfer task it was reached through.
    fn get_compute_pre_links(&self, node_i: NodeIndex) -> Vec<(NodeIndex, Option<NodeIndex>)> {
        self.get_pre_nodes(node_i)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|pre_node| {
                if self[pre_node].is_transfer() {
                    self.get_pre_nodes(pre_node)
                        .and_then(|grand_parents| grand_parents.first().copied())
                        .map(|grand_parent| (grand_parent, Some(pre_node)))
                } else {
                    Some((pre_node, None))
                }
            })
            .collect()
    }

    fn get_compute_pre_nodes(&self, node_i: NodeIndex) -> Vec<NodeIndex> {
        self.get_compute_pre_links(node_i)
            .into_iter()
            .map(|(pre_node, _)| pre_node)
            .collect()
    }

    fn get_compute_suc_nodes(&self, node_i: NodeIndex) -> Vec<NodeIndex> {
        self.get_suc_nodes(node_i)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|suc_node| {
                if self[suc_node].is_transfer() {
                    self.get_suc_nodes(suc_node)
                        .and_then(|grand_children| grand_children.first().copied())
                } else {
                    Some(suc_node)
                }
            })
            .collect()
    }

    fn get_compute_tasks(&self) -> Vec<NodeIndex> {
        self.node_indices()
            .filter(|&node_i| self[node_i].is_compute())
            .collect()
    }

    fn set_allocations_from_iteration(&mut self, nworkstations: usize) -> Result<()> {
        for node_i in self.get_compute_tasks() {
            let task = &mut self[node_i];
            let allocation_size = *task.iterative_allocations.get(&nworkstations).ok_or_else(|| {
                SchedError::Configuration(format!(
                    "No allocation recorded for task '{}' with {} workstations.",
                    task.name, nworkstations
                ))
            })?;
            task.allocation_size = allocation_size;
        }
        Ok(())
    }

    fn record_iterative_allocations(&mut self, nworkstations: usize) -> Result<()> {
        for node_i in self.get_compute_tasks() {
            let task = &mut self[node_i];
            if task.iterative_allocations.contains_key(&nworkstations) {
                return Err(SchedError::StaleState(format!(
                    "Allocation of task '{}' for {} workstations is already recorded.",
                    task.name, nworkstations
                )));
            }
            task.iterative_allocations
                .insert(nworkstations, task.allocation_size);
        }
        Ok(())
    }

    fn reset_task_schedules(&mut self) {
        for node_i in self.node_indices() {
            self[node_i].workstations.clear();
            self[node_i].estimated_finish_time = 0.0;
        }
    }

    /// Sum of the areas of compute tasks under their concrete allocation.
    fn get_total_area(&self, power: f64) -> f64 {
        self.get_compute_tasks()
            .iter()
            .filter(|&&node_i| !self[node_i].workstations.is_empty())
            .map(|&node_i| estimate_area(&self[node_i], self[node_i].workstations.len(), power))
            .sum()
    }

    fn validate_workflow(&self) -> Result<()> {
        let invalid = |message: String| Err(SchedError::Configuration(message));

        if self.node_count() == 0 {
            return invalid("The workflow is empty.".to_string());
        }
        for (kind, label) in [(TaskKind::Root, "root"), (TaskKind::End, "end")] {
            let count = self
                .node_indices()
                .filter(|&node_i| self[node_i].kind == kind)
                .count();
            if count != 1 {
                return invalid(format!("Expected exactly one {} task, found {}.", label, count));
            }
        }
        if self.get_root()?.index() != 0 {
            return invalid("The root task must be declared first.".to_string());
        }
        if is_cyclic_directed(self) {
            return invalid("The workflow contains a cycle.".to_string());
        }

        let mut names = HashSet::new();
        for node_i in self.node_indices() {
            let task = &self[node_i];
            if !names.insert(task.name.as_str()) {
                return invalid(format!("Task name '{}' is duplicated.", task.name));
            }
            if !(0.0..=1.0).contains(&task.alpha) {
                return invalid(format!(
                    "Task '{}' has alpha {} outside [0, 1].",
                    task.name, task.alpha
                ));
            }
            if !(task.amount >= 0.0 && task.amount.is_finite()) {
                return invalid(format!("Task '{}' has an invalid amount.", task.name));
            }
            if !(task.size >= 0.0 && task.size.is_finite()) {
                return invalid(format!("Task '{}' has an invalid size.", task.name));
            }

            let pre_nodes = self.get_pre_nodes(node_i).unwrap_or_default();
            let suc_nodes = self.get_suc_nodes(node_i).unwrap_or_default();
            match task.kind {
                TaskKind::Root if !pre_nodes.is_empty() => {
                    return invalid("The root task has predecessors.".to_string());
                }
                TaskKind::End if !suc_nodes.is_empty() => {
                    return invalid("The end task has successors.".to_string());
                }
                TaskKind::CommunicationTransfer => {
                    if pre_nodes.len() != 1 || suc_nodes.len() != 1 {
                        return invalid(format!(
                            "Transfer '{}' needs one parent and one child (has {} and {}).",
                            task.name,
                            pre_nodes.len(),
                            suc_nodes.len()
                        ));
                    }
                    if self[pre_nodes[0]].is_transfer() || self[suc_nodes[0]].is_transfer() {
                        return invalid(format!(
                            "Transfer '{}' is connected to another transfer.",
                            task.name
                        ));
                    }
                }
                _ => {}
            }
            if task.kind != TaskKind::End && suc_nodes.is_empty() {
                return invalid(format!("Task '{}' does not lead to the end task.", task.name));
            }
            if task.kind != TaskKind::Root && pre_nodes.is_empty() {
                return invalid(format!(
                    "Task '{}' is not reachable from the root task.",
                    task.name
                ));
            }
            if task.is_compute() && task.amount == 0.0 {
                warn!("Compute task '{}' has no work.", task.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_chain_with_transfer() -> (Workflow, Vec<NodeIndex>) {
        let mut dag = Workflow::new();
        let root = dag.add_task(TaskData::root());
        let a = dag.add_task(TaskData::compute("a", 100.0, 0.1));
        let a_b = dag.add_task(TaskData::transfer("a_b", 1.0e6));
        let b = dag.add_task(TaskData::compute("b", 50.0, 0.5));
        let end = dag.add_task(TaskData::end());
        dag.add_flow_dependency(root, a);
        dag.add_flow_dependency(a, a_b);
        dag.add_flow_dependency(a_b, b);
        dag.add_flow_dependency(b, end);
        (dag, vec![root, a, a_b, b, end])
    }

    #[test]
    fn test_add_task_id_consistency() {
        let (dag, nodes) = create_chain_with_transfer();
        for node_i in nodes {
            assert_eq!(dag[node_i].id, node_i.index());
        }
    }

    #[test]
    fn test_get_compute_suc_nodes_skip_transfer() {
        let (dag, nodes) = create_chain_with_transfer();
        assert_eq!(dag.get_compute_suc_nodes(nodes[1]), vec![nodes[3]]);
        assert_eq!(dag.get_compute_suc_nodes(nodes[0]), vec![nodes[1]]);
        assert!(dag.get_compute_suc_nodes(nodes[4]).is_empty());
    }

    #[test]
    fn test_get_compute_pre_links_skip_transfer() {
        let (dag, nodes) = create_chain_with_transfer();
        assert_eq!(
            dag.get_compute_pre_links(nodes[3]),
            vec![(nodes[1], Some(nodes[2]))]
        );
        assert_eq!(dag.get_compute_pre_links(nodes[1]), vec![(nodes[0], None)]);
    }

    #[test]
    fn test_get_suc_nodes_declaration_order() {
        let mut dag = Workflow::new();
        let root = dag.add_task(TaskData::root());
        let a = dag.add_task(TaskData::compute("a", 1.0, 0.0));
        let b = dag.add_task(TaskData::compute("b", 1.0, 0.0));
        let c = dag.add_task(TaskData::compute("c", 1.0, 0.0));
        dag.add_flow_dependency(root, a);
        dag.add_flow_dependency(root, b);
        dag.add_flow_dependency(root, c);
        assert_eq!(dag.get_suc_nodes(root).unwrap(), vec![a, b, c]);
        assert_eq!(dag.get_pre_nodes(root), None);
    }

    #[test]
    fn test_resource_dependency_add_and_remove() {
        let (mut dag, nodes) = create_chain_with_transfer();
        let flow_edges = dag.edge_count();

        assert!(!dag.add_resource_dependency(nodes[0], nodes[1]));
        assert!(dag.add_resource_dependency(nodes[1], nodes[3]));
        assert!(!dag.add_resource_dependency(nodes[1], nodes[3]));
        assert_eq!(dag.count_resource_dependencies(), 1);
        // Resource edges are not part of the workflow structure.
        assert_eq!(dag.get_suc_nodes(nodes[1]).unwrap(), vec![nodes[2]]);

        assert_eq!(dag.remove_resource_dependencies(), 1);
        assert_eq!(dag.edge_count(), flow_edges);
        assert_eq!(dag.remove_resource_dependencies(), 0);
    }

    #[test]
    fn test_iterative_allocations_record_and_restore() {
        let (mut dag, nodes) = create_chain_with_transfer();
        dag[nodes[1]].allocation_size = 2;
        dag.record_iterative_allocations(2).unwrap();
        dag[nodes[1]].allocation_size = 3;
        dag.record_iterative_allocations(3).unwrap();

        dag.set_allocations_from_iteration(2).unwrap();
        assert_eq!(dag[nodes[1]].allocation_size, 2);
        assert_eq!(dag[nodes[3]].allocation_size, 1);
        assert!(dag.set_allocations_from_iteration(4).is_err());
        assert!(matches!(
            dag.record_iterative_allocations(2),
            Err(SchedError::StaleState(_))
        ));
    }

    #[test]
    fn test_get_total_area_mapped_tasks_only() {
        let (mut dag, nodes) = create_chain_with_transfer();
        dag[nodes[1]].workstations = vec![0, 1];
        // (0.1 + 0.9 / 2) * 100 * 2
        assert!((dag.get_total_area(1.0) - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_workflow_normal() {
        let (dag, _) = create_chain_with_transfer();
        assert!(dag.validate_workflow().is_ok());
    }

    #[test]
    fn test_validate_workflow_empty() {
        let dag = Workflow::new();
        assert!(matches!(
            dag.validate_workflow(),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_workflow_missing_end() {
        let mut dag = Workflow::new();
        let root = dag.add_task(TaskData::root());
        let a = dag.add_task(TaskData::compute("a", 1.0, 0.0));
        dag.add_flow_dependency(root, a);
        assert!(dag.validate_workflow().is_err());
        assert!(dag.get_end().is_err());
    }

    #[test]
    fn test_validate_workflow_transfer_with_two_children() {
        let (mut dag, nodes) = create_chain_with_transfer();
        let c = dag.add_task(TaskData::compute("c", 1.0, 0.0));
        dag.add_flow_dependency(nodes[2], c);
        dag.add_flow_dependency(c, nodes[4]);
        assert!(matches!(
            dag.validate_workflow(),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_workflow_bad_alpha() {
        let (mut dag, nodes) = create_chain_with_transfer();
        dag[nodes[1]].alpha = 1.5;
        assert!(dag.validate_workflow().is_err());
    }

    #[test]
    fn test_validate_workflow_root_not_first() {
        let mut dag = Workflow::new();
        let a = dag.add_task(TaskData::compute("a", 1.0, 0.0));
        let root = dag.add_task(TaskData::root());
        let end = dag.add_task(TaskData::end());
        dag.add_flow_dependency(root, a);
        dag.add_flow_dependency(a, end);
        assert!(matches!(
            dag.validate_workflow(),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_workflow_dangling_task() {
        let (mut dag, nodes) = create_chain_with_transfer();
        let c = dag.add_task(TaskData::compute("c", 1.0, 0.0));
        dag.add_flow_dependency(nodes[0], c);
        assert!(dag.validate_workflow().is_err());
    }
}
