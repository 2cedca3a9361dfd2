use lib::error::Result;
use lib::graph_extension::{GraphExtension, Workflow};
use lib::homogeneous::HomogeneousCluster;
use lib::level_analyzer::LevelAnalyzer;
use lib::simulator::Simulator;
use log::debug;

/// Undoes everything a mapping and its evaluation left behind so that the next
/// allocation column starts from a fresh schedule.
pub fn reset_simulation<S: Simulator>(
    dag: &mut Workflow,
    cluster: &mut HomogeneousCluster,
    simulator: &mut S,
) -> Result<()> {
    let removed = dag.remove_resource_dependencies();
    debug!("Removed {} resource dependencies", removed);
    cluster.reset_workstation_attributes();
    dag.reset_task_schedules();
    simulator.reset_execution_state();
    dag.set_levels(cluster.power)
}
