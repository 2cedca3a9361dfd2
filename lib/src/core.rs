//! This module contains the definition of the workstation, a single compute node of the cluster
use petgraph::graph::NodeIndex;

#[derive(Debug, Clone, PartialEq)]
pub struct Workstation {
    pub id: usize,
    /// Earliest time at which the workstation is ready to execute a task
    pub available_at: f64,
    /// Most recent task mapped on the workstation, used to chain resource dependencies
    pub last_scheduled_task: Option<NodeIndex>,
}

impl Workstation {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            available_at: 0.0,
            last_scheduled_task: None,
        }
    }

    pub fn reset(&mut self) {
        self.available_at = 0.0;
        self.last_scheduled_task = None;
    }

    /// A workstation that became busy at some point of the schedule.
    pub fn is_used(&self) -> bool {
        self.available_at > 0.0
    }

    /// Books the workstation for `task` until `finish_time`.
    ///
    /// Returns the task previously scheduled here, if it differs from `task`.
    pub fn allocate(&mut self, task: NodeIndex, finish_time: f64) -> Option<NodeIndex> {
        let previous = self.last_scheduled_task.filter(|&last| last != task);
        self.available_at = finish_time;
        self.last_scheduled_task = Some(task);
        previous
    }
}
