//! Bi-criteria allocation procedure.
//!
//! For every assumed cluster size k from 1 to N, allocations are grown along the critical
//! path until the critical path length no longer exceeds the average area. The average
//! area is divided by k instead of N, so that small values of k favour a low work and
//! k = N reproduces the classic CPA allocation.
use lib::amdahl::{estimate_area, estimate_execution_time};
use lib::error::{Result, SchedError};
use lib::graph_extension::{GraphExtension, TaskKind, Workflow};
use lib::level_analyzer::LevelAnalyzer;
use log::{debug, info};
use petgraph::graph::NodeIndex;

/// Sum of the sequential execution times of all compute tasks, i.e. the average area on
/// a cluster made of a single workstation.
pub fn initialize_average_area(dag: &Workflow, power: f64) -> f64 {
    dag.get_compute_tasks()
        .iter()
        .map(|&node_i| estimate_execution_time(&dag[node_i], 1, power))
        .sum()
}

/// Compute tasks met when following, from the root task, the successor with the largest
/// bottom level until the end task is reached.
pub fn get_critical_path(dag: &Workflow) -> Result<Vec<NodeIndex>> {
    let mut critical_path = Vec::new();
    let mut node_i = dag.get_root()?;

    while dag[node_i].kind != TaskKind::End {
        let mut max_child: Option<NodeIndex> = None;
        for child in dag.get_compute_suc_nodes(node_i) {
            if max_child.map_or(true, |max_i| dag[child].bottom_level > dag[max_i].bottom_level)
            {
                max_child = Some(child);
            }
        }
        node_i = max_child.ok_or_else(|| {
            SchedError::Configuration(format!(
                "Task '{}' does not lead to the end task.",
                dag[node_i].name
            ))
        })?;
        if dag[node_i].is_compute() {
            critical_path.push(node_i);
        }
    }
    Ok(critical_path)
}

/// Reduction of the per-workstation execution time brought by one more workstation.
fn compute_gain(dag: &Workflow, node_i: NodeIndex, nworkstations: usize, power: f64) -> f64 {
    let task = &dag[node_i];
    let n = task.allocation_size;
    if n < nworkstations {
        estimate_execution_time(task, n, power) / n as f64
            - estimate_execution_time(task, n + 1, power) / (n + 1) as f64
    } else {
        0.0
    }
}

/// Fills the iterative allocations of every compute task for assumed cluster sizes
/// 1 to `nworkstations`.
pub fn set_multiple_allocations(
    dag: &mut Workflow,
    nworkstations: usize,
    power: f64,
) -> Result<()> {
    if nworkstations == 0 {
        return Err(SchedError::Configuration(
            "The cluster has no workstation.".to_string(),
        ));
    }

    let compute_tasks = dag.get_compute_tasks();
    for &node_i in compute_tasks.iter() {
        dag[node_i].allocation_size = 1;
    }
    let root = dag.get_root()?;
    dag.set_bottom_levels(power)?;

    let mut average_area = initialize_average_area(dag, power);
    let mut critical_path_length = dag[root].bottom_level;
    info!(
        "Initial values for TA and TCP are ({:.3}, {:.3})",
        average_area, critical_path_length
    );

    for current_nworkstations in 1..=nworkstations {
        debug!(
            "Assume the cluster comprises {} workstations",
            current_nworkstations
        );
        let iteration_cap = compute_tasks.len() * current_nworkstations + 1;
        let mut iterations = 0;
        let mut saturated = false;

        while critical_path_length > average_area && !saturated {
            if iterations == iteration_cap {
                return Err(SchedError::ConvergenceAnomaly {
                    nworkstations: current_nworkstations,
                    iterations,
                });
            }
            iterations += 1;
            debug!(
                "[{}] TA = {:.3}, TCP = {:.3}",
                iterations, average_area, critical_path_length
            );

            let mut selected_task = None;
            let mut maximum_gain = 0.0;
            for node_i in get_critical_path(dag)? {
                let gain = compute_gain(dag, node_i, current_nworkstations, power);
                if gain > maximum_gain {
                    maximum_gain = gain;
                    selected_task = Some(node_i);
                }
            }

            match selected_task {
                None => saturated = true,
                Some(node_i) => {
                    dag[node_i].allocation_size += 1;
                    let allocation_size = dag[node_i].allocation_size;
                    debug!(
                        "Allocation of task '{}' raised to {} (gain {:.3})",
                        dag[node_i].name, allocation_size, maximum_gain
                    );
                    average_area += (estimate_area(&dag[node_i], allocation_size, power)
                        - estimate_area(&dag[node_i], allocation_size - 1, power))
                        / current_nworkstations as f64;
                    dag.set_bottom_levels(power)?;
                    critical_path_length = dag[root].bottom_level;
                }
            }
        }

        dag.record_iterative_allocations(current_nworkstations)?;
        info!(
            "Allocations for {} workstations found (TA = {:.3}, TCP = {:.3})",
            current_nworkstations, average_area, critical_path_length
        );

        average_area =
            average_area * current_nworkstations as f64 / (current_nworkstations + 1) as f64;
    }
    Ok(())
}
