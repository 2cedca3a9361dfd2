//! Amdahl's law performance model for moldable compute tasks on a homogeneous cluster.
use crate::graph_extension::{TaskData, TaskKind};

/// Estimated execution time of `task` on `nworkstations` workstations of the given power.
///
/// Only compute tasks carry a cost: root, end and transfer tasks estimate to zero.
/// `nworkstations` must be at least 1.
pub fn estimate_execution_time(task: &TaskData, nworkstations: usize, power: f64) -> f64 {
    match task.kind {
        TaskKind::ComputeParallel => {
            (task.alpha + (1.0 - task.alpha) / nworkstations as f64) * (task.amount / power)
        }
        _ => 0.0,
    }
}

/// Resource-time consumed by `task`: execution time multiplied by the allocation size.
pub fn estimate_area(task: &TaskData, nworkstations: usize, power: f64) -> f64 {
    estimate_execution_time(task, nworkstations, power) * nworkstations as f64
}
