//! List-scheduling of one allocation column onto the cluster.
use lib::amdahl::estimate_execution_time;
use lib::error::{Result, SchedError};
use lib::graph_extension::{GraphExtension, Workflow};
use lib::homogeneous::HomogeneousCluster;
use lib::level_analyzer::LevelAnalyzer;
use lib::simulator::Simulator;
use log::debug;
use petgraph::graph::NodeIndex;

/// Tasks by decreasing bottom level, then increasing precedence level, then node index.
pub fn get_mapping_order(dag: &Workflow) -> Vec<NodeIndex> {
    let mut order = dag.node_indices().collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        dag[b]
            .bottom_level
            .total_cmp(&dag[a].bottom_level)
            .then(dag[a].precedence_level.cmp(&dag[b].precedence_level))
            .then(a.index().cmp(&b.index()))
    });
    order
}

fn check_fresh_state(dag: &Workflow, cluster: &HomogeneousCluster) -> Result<()> {
    let resource_dependencies = dag.count_resource_dependencies();
    if resource_dependencies > 0 {
        return Err(SchedError::StaleState(format!(
            "{} resource dependencies are left from a previous round.",
            resource_dependencies
        )));
    }
    cluster.check_availability()
}

fn map_task<S: Simulator>(
    dag: &mut Workflow,
    cluster: &mut HomogeneousCluster,
    simulator: &S,
    with_communications: bool,
    node_i: NodeIndex,
) -> Result<()> {
    let allocation_size = dag[node_i].allocation_size;
    if allocation_size == 0 || allocation_size > cluster.get_number_of_workstations() {
        return Err(SchedError::Configuration(format!(
            "Task '{}' cannot be allocated on {} workstations.",
            dag[node_i].name, allocation_size
        )));
    }

    let pre_links = dag.get_compute_pre_links(node_i);
    let ready_time = pre_links
        .iter()
        .map(|&(pre_node, _)| dag[pre_node].estimated_finish_time)
        .fold(0.0, f64::max);

    let workstations = cluster
        .get_best_workstation_set(ready_time)
        .into_iter()
        .take(allocation_size)
        .collect::<Vec<_>>();

    let data_arrival = pre_links
        .iter()
        .map(|&(pre_node, transfer)| {
            let transfer_time = match transfer {
                Some(transfer) if with_communications => simulator.estimate_transfer_time(
                    cluster,
                    &dag[pre_node].workstations,
                    &workstations,
                    dag[transfer].size,
                ),
                _ => 0.0,
            };
            dag[pre_node].estimated_finish_time + transfer_time
        })
        .fold(0.0, f64::max);
    let last_available = workstations
        .iter()
        .map(|&workstation| cluster.workstations[workstation].available_at)
        .fold(0.0, f64::max);

    let finish_time = data_arrival.max(last_available)
        + estimate_execution_time(&dag[node_i], allocation_size, cluster.power);
    debug!(
        "{} mapped on {:?}, ready at {:.3}, finishes at {:.3}",
        dag[node_i].name, workstations, ready_time, finish_time
    );

    for &workstation in workstations.iter() {
        if let Some(previous_task) = cluster.workstations[workstation].allocate(node_i, finish_time)
        {
            if dag.add_resource_dependency(previous_task, node_i) {
                debug!(
                    "Resource dependency {} -> {} on workstation {}",
                    dag[previous_task].name, dag[node_i].name, workstation
                );
            }
        }
    }
    dag[node_i].workstations = workstations;
    dag[node_i].estimated_finish_time = finish_time;
    Ok(())
}

/// Maps every compute task with its current allocation size and records the estimated
/// finish dates. Tasks sharing a workstation are chained with resource dependencies.
pub fn map_allocations<S: Simulator>(
    dag: &mut Workflow,
    cluster: &mut HomogeneousCluster,
    simulator: &S,
    with_communications: bool,
) -> Result<()> {
    check_fresh_state(dag, cluster)?;

    let root = dag.get_root()?;
    dag[root].workstations = (0..cluster.get_number_of_workstations()).collect();
    dag[root].estimated_finish_time = 0.0;

    dag.set_levels(cluster.power)?;
    for node_i in get_mapping_order(dag) {
        if dag[node_i].is_compute() {
            map_task(dag, cluster, simulator, with_communications, node_i)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib::dag_creator::create_workflow_from_yaml;
    use lib::graph_extension::TaskData;
    use lib::simulator::ReplaySimulator;
    use petgraph::visit::EdgeRef;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn create_chain_dag(allocation_size: usize) -> (Workflow, NodeIndex, NodeIndex) {
        let mut dag = Workflow::new();
        let root = dag.add_task(TaskData::root());
        let a = dag.add_task(TaskData::compute("a", 100.0, 0.1));
        let b = dag.add_task(TaskData::compute("b", 50.0, 0.5));
        let end = dag.add_task(TaskData::end());
        dag.add_flow_dependency(root, a);
        dag.add_flow_dependency(a, b);
        dag.add_flow_dependency(b, end);
        dag[a].allocation_size = allocation_size;
        dag[b].allocation_size = allocation_size;
        (dag, a, b)
    }

    /// root -> a -> end, root -> b -> end
    fn create_fork_dag() -> (Workflow, NodeIndex, NodeIndex) {
        let mut dag = Workflow::new();
        let root = dag.add_task(TaskData::root());
        let a = dag.add_task(TaskData::compute("a", 10.0, 0.0));
        let b = dag.add_task(TaskData::compute("b", 5.0, 0.0));
        let end = dag.add_task(TaskData::end());
        dag.add_flow_dependency(root, a);
        dag.add_flow_dependency(root, b);
        dag.add_flow_dependency(a, end);
        dag.add_flow_dependency(b, end);
        (dag, a, b)
    }

    #[test]
    fn test_map_allocations_chain() {
        let (mut dag, a, b) = create_chain_dag(4);
        let mut cluster = HomogeneousCluster::new(4, 1.0);
        let simulator = ReplaySimulator::new(false);
        map_allocations(&mut dag, &mut cluster, &simulator, false).unwrap();

        assert_eq!(dag[a].workstations, vec![0, 1, 2, 3]);
        assert_close(dag[a].estimated_finish_time, 32.5);
        assert_eq!(dag[b].workstations.len(), 4);
        assert_close(dag[b].estimated_finish_time, 63.75);
        // b already depends on a through the workflow.
        assert_eq!(dag.count_resource_dependencies(), 0);
        assert_eq!(cluster.compute_peak_resource_usage(), 4);
        assert_eq!(dag[dag.get_root().unwrap()].workstations.len(), 4);
    }

    #[test]
    fn test_map_allocations_serializes_shared_workstation() {
        let (mut dag, a, b) = create_fork_dag();
        let mut cluster = HomogeneousCluster::new(1, 1.0);
        let simulator = ReplaySimulator::new(false);
        map_allocations(&mut dag, &mut cluster, &simulator, false).unwrap();

        assert_close(dag[a].estimated_finish_time, 10.0);
        assert_close(dag[b].estimated_finish_time, 15.0);
        assert_eq!(dag.count_resource_dependencies(), 1);
        let resource_edge = dag
            .edge_references()
            .find(|edge| *edge.weight() == lib::graph_extension::Dependency::Resource)
            .unwrap();
        assert_eq!((resource_edge.source(), resource_edge.target()), (a, b));
    }

    #[test]
    fn test_map_allocations_with_communications() {
        let mut dag = Workflow::new();
        let root = dag.add_task(TaskData::root());
        let a = dag.add_task(TaskData::compute("a", 10.0, 0.0));
        let a_b = dag.add_task(TaskData::transfer("a_b", 1.0e6));
        let b = dag.add_task(TaskData::compute("b", 10.0, 0.0));
        let end = dag.add_task(TaskData::end());
        dag.add_flow_dependency(root, a);
        dag.add_flow_dependency(a, a_b);
        dag.add_flow_dependency(a_b, b);
        dag.add_flow_dependency(b, end);
        dag[b].allocation_size = 2;

        let mut cluster = HomogeneousCluster::with_network(2, 1.0, 1.0e6, 0.5);
        let simulator = ReplaySimulator::new(true);
        map_allocations(&mut dag, &mut cluster, &simulator, true).unwrap();
        assert_eq!(dag[a].workstations, vec![0]);
        assert_eq!(dag[b].workstations, vec![0, 1]);
        // 10 + (0.5 + 1e6 / 1e6) + 10 / 2
        assert_close(dag[b].estimated_finish_time, 16.5);

        let mut cluster = HomogeneousCluster::with_network(2, 1.0, 1.0e6, 0.5);
        dag.remove_resource_dependencies();
        dag.reset_task_schedules();
        map_allocations(&mut dag, &mut cluster, &simulator, false).unwrap();
        assert_close(dag[b].estimated_finish_time, 15.0);
    }

    #[test]
    fn test_map_allocations_stale_resource_dependency() {
        let (mut dag, a, b) = create_fork_dag();
        dag.add_resource_dependency(a, b);
        let mut cluster = HomogeneousCluster::new(2, 1.0);
        assert!(matches!(
            map_allocations(&mut dag, &mut cluster, &ReplaySimulator::new(false), false),
            Err(SchedError::StaleState(_))
        ));
    }

    #[test]
    fn test_map_allocations_negative_availability() {
        let (mut dag, _, _) = create_fork_dag();
        let mut cluster = HomogeneousCluster::new(2, 1.0);
        cluster.workstations[1].available_at = -1.0;
        assert!(matches!(
            map_allocations(&mut dag, &mut cluster, &ReplaySimulator::new(false), false),
            Err(SchedError::StaleState(_))
        ));
    }

    #[test]
    fn test_map_allocations_oversized_allocation() {
        let (mut dag, _, _) = create_chain_dag(3);
        let mut cluster = HomogeneousCluster::new(2, 1.0);
        assert!(matches!(
            map_allocations(&mut dag, &mut cluster, &ReplaySimulator::new(false), false),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_get_mapping_order_respects_dependencies() {
        let mut dag =
            create_workflow_from_yaml("../lib/tests/sample_dags/fork_join_transfers.yaml").unwrap();
        dag.set_levels(1.0).unwrap();
        let order = get_mapping_order(&dag);
        let position = |node_i: NodeIndex| order.iter().position(|&n| n == node_i).unwrap();
        for node_i in dag.get_compute_tasks() {
            for pre_node in dag.get_compute_pre_nodes(node_i) {
                assert!(position(pre_node) < position(node_i));
            }
        }
        assert_eq!(order[0], dag.get_root().unwrap());
    }

    #[test]
    fn test_get_mapping_order_zero_amount_parent() {
        // b is declared before its zero-amount parent a, so both share a bottom level and
        // only the precedence level keeps a first.
        let mut dag = Workflow::new();
        let root = dag.add_task(TaskData::root());
        let b = dag.add_task(TaskData::compute("b", 50.0, 0.5));
        let a = dag.add_task(TaskData::compute("a", 0.0, 0.0));
        let end = dag.add_task(TaskData::end());
        dag.add_flow_dependency(root, a);
        dag.add_flow_dependency(a, b);
        dag.add_flow_dependency(b, end);
        dag.set_levels(1.0).unwrap();
        assert_eq!(dag[a].bottom_level, dag[b].bottom_level);

        let order = get_mapping_order(&dag);
        assert_eq!(order, vec![root, a, b, end]);

        let mut cluster = HomogeneousCluster::new(2, 1.0);
        map_allocations(&mut dag, &mut cluster, &ReplaySimulator::new(false), false).unwrap();
        assert_close(dag[a].estimated_finish_time, 0.0);
        assert_close(dag[b].estimated_finish_time, 50.0);
    }
}
