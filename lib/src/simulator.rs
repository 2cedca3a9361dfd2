//! Evaluation of a mapped schedule.
//!
//! The replay simulator walks the workflow in a topological order of its flow and
//! resource dependencies and propagates finish dates, so that a task starts as soon as
//! all its predecessors (including the previous task on each of its workstations) are
//! done.
use crate::amdahl::estimate_execution_time;
use crate::error::{Result, SchedError};
use crate::graph_extension::{GraphExtension, TaskKind, Workflow};
use crate::homogeneous::HomogeneousCluster;
use log::debug;
use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use petgraph::Direction::Incoming;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationReport {
    pub makespan: f64,
    /// number of distinct workstations used by the schedule
    pub peak_allocation: usize,
}

pub trait Simulator {
    fn evaluate(&mut self, dag: &Workflow, cluster: &HomogeneousCluster)
        -> Result<SimulationReport>;
    fn estimate_transfer_time(
        &self,
        cluster: &HomogeneousCluster,
        src: &[usize],
        dst: &[usize],
        bytes: f64,
    ) -> f64;
    fn reset_execution_state(&mut self);
}

#[derive(Debug, Clone, Default)]
pub struct ReplaySimulator {
    with_communications: bool,
    finish_times: Vec<f64>,
}

impl ReplaySimulator {
    pub fn new(with_communications: bool) -> Self {
        Self {
            with_communications,
            finish_times: Vec::new(),
        }
    }

    fn transfer_time(
        &self,
        dag: &Workflow,
        cluster: &HomogeneousCluster,
        node_i: NodeIndex,
    ) -> f64 {
        if !self.with_communications {
            return 0.0;
        }
        let parent = dag.get_pre_nodes(node_i).and_then(|nodes| nodes.first().copied());
        let child = dag.get_suc_nodes(node_i).and_then(|nodes| nodes.first().copied());
        match (parent, child) {
            (Some(parent), Some(child)) => self.estimate_transfer_time(
                cluster,
                &dag[parent].workstations,
                &dag[child].workstations,
                dag[node_i].size,
            ),
            _ => 0.0,
        }
    }
}

impl Simulator for ReplaySimulator {
    fn evaluate(
        &mut self,
        dag: &Workflow,
        cluster: &HomogeneousCluster,
    ) -> Result<SimulationReport> {
        if !self.finish_times.is_empty() {
            return Err(SchedError::StaleState(
                "The simulator was not reset since its last evaluation.".to_string(),
            ));
        }
        let order = toposort(dag, None).map_err(|cycle| {
            SchedError::StaleState(format!(
                "The mapped schedule has a cycle through task '{}'.",
                dag[cycle.node_id()].name
            ))
        })?;

        let mut finish_times = vec![0.0; dag.node_count()];
        let mut used_workstations = BTreeSet::new();
        for node_i in order {
            let ready = dag
                .neighbors_directed(node_i, Incoming)
                .map(|pre_node| finish_times[pre_node.index()])
                .fold(0.0, f64::max);
            let task = &dag[node_i];
            let duration = match task.kind {
                TaskKind::Root | TaskKind::End => 0.0,
                TaskKind::CommunicationTransfer => self.transfer_time(dag, cluster, node_i),
                TaskKind::ComputeParallel => {
                    if task.workstations.is_empty() {
                        return Err(SchedError::StaleState(format!(
                            "Task '{}' has not been mapped.",
                            task.name
                        )));
                    }
                    used_workstations.extend(task.workstations.iter().copied());
                    estimate_execution_time(task, task.workstations.len(), cluster.power)
                }
            };
            finish_times[node_i.index()] = ready + duration;
            debug!(
                "{} replayed from {} to {}",
                task.name,
                ready,
                ready + duration
            );
        }

        let makespan = finish_times[dag.get_end()?.index()];
        self.finish_times = finish_times;
        Ok(SimulationReport {
            makespan,
            peak_allocation: used_workstations.len(),
        })
    }

    /// Time to move `bytes` from the `src` workstations to the `dst` ones.
    ///
    /// Data staying on the very same set of workstations costs nothing. Otherwise the
    /// payload is spread over as many parallel links as the smaller side offers.
    fn estimate_transfer_time(
        &self,
        cluster: &HomogeneousCluster,
        src: &[usize],
        dst: &[usize],
        bytes: f64,
    ) -> f64 {
        if bytes <= 0.0 {
            return 0.0;
        }
        let src_set = src.iter().collect::<BTreeSet<_>>();
        let dst_set = dst.iter().collect::<BTreeSet<_>>();
        if src_set == dst_set {
            return 0.0;
        }
        let links = src_set.len().min(dst_set.len()).max(1);
        cluster.latency + bytes / (cluster.bandwidth * links as f64)
    }

    fn reset_execution_state(&mut self) {
        self.finish_times.clear();
    }
}
