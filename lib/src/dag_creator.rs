//! Generate a workflow (petgraph) from a yaml file
use crate::error::{Result, SchedError};
use crate::graph_extension::{GraphExtension, TaskData, Workflow};
use crate::util::load_yaml;

use log::{info, warn};
use yaml_rust::Yaml;

fn get_real_param(task: &Yaml, key: &str, name: &str) -> Result<f64> {
    match &task[key] {
        Yaml::Integer(value) => Ok(*value as f64),
        Yaml::Real(_) => task[key].as_f64().ok_or_else(|| {
            SchedError::Configuration(format!("Task '{}' has a malformed {}.", name, key))
        }),
        Yaml::BadValue => Err(SchedError::Configuration(format!(
            "Task '{}' is missing its {}.",
            name, key
        ))),
        _ => Err(SchedError::Configuration(format!(
            "Task '{}' has a non numeric {}.",
            name, key
        ))),
    }
}

fn get_str_param<'a>(yaml: &'a Yaml, key: &str) -> Result<&'a str> {
    yaml[key]
        .as_str()
        .ok_or_else(|| SchedError::Configuration(format!("Missing '{}' field.", key)))
}

fn create_task(task: &Yaml) -> Result<TaskData> {
    let name = get_str_param(task, "name")?;
    let task_data = match get_str_param(task, "kind")? {
        "root" => TaskData {
            name: name.to_string(),
            ..TaskData::root()
        },
        "end" => TaskData {
            name: name.to_string(),
            ..TaskData::end()
        },
        "compute" => TaskData::compute(
            name,
            get_real_param(task, "amount", name)?,
            get_real_param(task, "alpha", name)?,
        ),
        "transfer" => TaskData::transfer(name, get_real_param(task, "size", name)?),
        unknown => {
            return Err(SchedError::Configuration(format!(
                "Task '{}' has an unknown kind '{}'.",
                name, unknown
            )))
        }
    };
    Ok(task_data)
}

/// load yaml file and return a validated workflow (petgraph)
///
/// # Arguments
///
/// *  `file_path` - yaml file path
///
/// # Returns
///
/// *  `dag` - workflow whose tasks are indexed in declaration order
///
/// # Example
///
/// ```
/// use lib::dag_creator::create_workflow_from_yaml;
///
/// let dag = create_workflow_from_yaml("tests/sample_dags/chain.yaml").unwrap();
/// let task_num = dag.node_count();
/// let dependency_num = dag.edge_count();
/// ```
pub fn create_workflow_from_yaml(file_path: &str) -> Result<Workflow> {
    let yaml_docs = load_yaml(file_path)?;
    let yaml_doc = yaml_docs.first().ok_or_else(|| {
        SchedError::Configuration(format!("{} is an empty YAML file.", file_path))
    })?;

    // Check if tasks and dependencies fields exist
    let (Some(tasks), Some(dependencies)) =
        (yaml_doc["tasks"].as_vec(), yaml_doc["dependencies"].as_vec())
    else {
        return Err(SchedError::Configuration(format!(
            "{} does not describe a workflow.",
            file_path
        )));
    };

    let mut dag = Workflow::new();
    for task in tasks {
        let task_data = create_task(task)?;
        if dag.find_task(&task_data.name).is_some() {
            return Err(SchedError::Configuration(format!(
                "Task name '{}' is duplicated.",
                task_data.name
            )));
        }
        dag.add_task(task_data);
    }

    for dependency in dependencies {
        let source = get_str_param(dependency, "source")?;
        let target = get_str_param(dependency, "target")?;
        match (dag.find_task(source), dag.find_task(target)) {
            (Some(source_i), Some(target_i)) => {
                if dag.dependency_exists(source_i, target_i) {
                    warn!("Dependency {} -> {} is declared twice.", source, target);
                    continue;
                }
                dag.add_flow_dependency(source_i, target_i);
            }
            _ => {
                return Err(SchedError::Configuration(format!(
                    "Dependency {} -> {} refers to an unknown task.",
                    source, target
                )))
            }
        }
    }

    dag.validate_workflow()?;
    info!(
        "Loaded workflow {} with {} tasks ({} compute) and {} dependencies",
        file_path,
        dag.node_count(),
        dag.get_compute_tasks().len(),
        dag.edge_count()
    );
    Ok(dag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_extension::TaskKind;

    #[test]
    fn test_create_workflow_from_yaml_chain() {
        let dag = create_workflow_from_yaml("tests/sample_dags/chain.yaml").unwrap();
        assert_eq!(dag.node_count(), 4, "number of tasks is expected to be 4");
        assert_eq!(dag.edge_count(), 3, "number of edges is expected to be 3");

        let a = dag.find_task("a").unwrap();
        assert_eq!(dag[a].kind, TaskKind::ComputeParallel);
        assert_eq!(dag[a].amount, 100.0);
        assert_eq!(dag[a].alpha, 0.1);
        assert_eq!(dag[a].allocation_size, 1);

        let b = dag.find_task("b").unwrap();
        assert_eq!(dag[b].amount, 50.0, "integer amounts are read as reals");
        assert_eq!(dag[b].alpha, 0.5);
        assert_eq!(dag[dag.get_root().unwrap()].name, "root");
        assert_eq!(dag[dag.get_end().unwrap()].name, "end");
    }

    #[test]
    fn test_create_workflow_from_yaml_with_transfers() {
        let dag = create_workflow_from_yaml("tests/sample_dags/fork_join_transfers.yaml").unwrap();
        assert_eq!(dag.node_count(), 9);
        assert_eq!(dag.get_compute_tasks().len(), 4);

        let transfer = dag.find_task("split_left").unwrap();
        assert_eq!(dag[transfer].kind, TaskKind::CommunicationTransfer);
        assert_eq!(dag[transfer].size, 2.5e8);

        let join = dag.find_task("join").unwrap();
        let left = dag.find_task("left").unwrap();
        let right = dag.find_task("right").unwrap();
        assert_eq!(dag.get_compute_pre_nodes(join), vec![left, right]);
    }

    #[test]
    fn test_create_workflow_from_yaml_transfer_two_children() {
        assert!(matches!(
            create_workflow_from_yaml("tests/sample_dags/transfer_two_children.yaml"),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_workflow_from_yaml_missing_end() {
        assert!(matches!(
            create_workflow_from_yaml("tests/sample_dags/missing_end.yaml"),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_workflow_from_yaml_unknown_task() {
        assert!(matches!(
            create_workflow_from_yaml("tests/sample_dags/unknown_dependency.yaml"),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_workflow_from_yaml_missing_amount() {
        assert!(matches!(
            create_workflow_from_yaml("tests/sample_dags/missing_amount.yaml"),
            Err(SchedError::Configuration(message)) if message.contains("amount")
        ));
    }

    #[test]
    fn test_create_workflow_from_yaml_missing_transfer_size() {
        assert!(matches!(
            create_workflow_from_yaml("tests/sample_dags/missing_transfer_size.yaml"),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_workflow_from_yaml_not_workflow() {
        assert!(matches!(
            create_workflow_from_yaml("tests/sample_platforms/cluster_4.yaml"),
            Err(SchedError::Configuration(_))
        ));
    }

    #[test]
    fn test_create_workflow_from_yaml_no_file() {
        assert!(matches!(
            create_workflow_from_yaml("tests/sample_dags/no_file.yaml"),
            Err(SchedError::Io(_))
        ));
    }
}
