use log::info;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;

use crate::error::Result;
use crate::graph_extension::{GraphExtension, Workflow};
use crate::homogeneous::HomogeneousCluster;

#[derive(Serialize, Deserialize)]
struct WorkflowInfo {
    number_of_tasks: usize,
    number_of_compute_tasks: usize,
    critical_path_length: f64,
    each_task_info: Vec<TaskInfo>,
}

#[derive(Serialize, Deserialize)]
struct TaskInfo {
    name: String,
    bottom_level: f64,
    top_level: f64,
    precedence_level: i32,
    iterative_allocations: BTreeMap<usize, usize>,
}

#[derive(Serialize, Deserialize)]
struct ClusterInfo {
    number_of_workstations: usize,
    power: f64,
    bandwidth: f64,
    latency: f64,
}

pub fn create_yaml_file(folder_path: &str, file_name: &str) -> Result<String> {
    if fs::metadata(folder_path).is_err() {
        fs::create_dir_all(folder_path)?;
        info!("Created folder: {}", folder_path);
    }
    let file_path = format!("{}/{}.yaml", folder_path, file_name);
    fs::File::create(&file_path)?;
    Ok(file_path)
}

pub fn append_info_to_yaml(file_path: &str, info: &str) -> Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(file_path)?;
    file.write_all(info.as_bytes())?;
    Ok(())
}

pub fn dump_cluster_info_to_yaml(file_path: &str, cluster: &HomogeneousCluster) -> Result<()> {
    let cluster_info = ClusterInfo {
        number_of_workstations: cluster.get_number_of_workstations(),
        power: cluster.power,
        bandwidth: cluster.bandwidth,
        latency: cluster.latency,
    };
    let yaml = serde_yaml::to_string(&cluster_info)?;
    append_info_to_yaml(file_path, &yaml)
}

/// Levels as last computed and the allocation found for every assumed cluster size.
pub fn dump_workflow_info_to_yaml(file_path: &str, dag: &Workflow) -> Result<()> {
    let critical_path_length = dag[dag.get_root()?].bottom_level;
    let each_task_info = dag
        .get_compute_tasks()
        .into_iter()
        .map(|node_i| {
            let task = &dag[node_i];
            TaskInfo {
                name: task.name.clone(),
                bottom_level: task.bottom_level,
                top_level: task.top_level,
                precedence_level: task.precedence_level,
                iterative_allocations: task.iterative_allocations.clone(),
            }
        })
        .collect::<Vec<_>>();

    let workflow_info = WorkflowInfo {
        number_of_tasks: dag.node_count(),
        number_of_compute_tasks: each_task_info.len(),
        critical_path_length,
        each_task_info,
    };
    let yaml = serde_yaml::to_string(&workflow_info)?;
    append_info_to_yaml(file_path, &yaml)
}
