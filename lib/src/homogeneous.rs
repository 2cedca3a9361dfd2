use crate::core::Workstation;
use crate::error::{Result, SchedError};
use log::info;
use serde_derive::{Deserialize, Serialize};
use std::fs;

const DEFAULT_BANDWIDTH: f64 = 1.25e8;
const DEFAULT_LATENCY: f64 = 1.0e-4;

/// Platform description as found in a platform YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub number_of_workstations: usize,
    pub power: f64,
    #[serde(default = "default_bandwidth")]
    pub bandwidth: f64,
    #[serde(default = "default_latency")]
    pub latency: f64,
}

fn default_bandwidth() -> f64 {
    DEFAULT_BANDWIDTH
}

fn default_latency() -> f64 {
    DEFAULT_LATENCY
}

#[derive(Debug, Clone)]
pub struct HomogeneousCluster {
    pub workstations: Vec<Workstation>,
    /// compute rate shared by every workstation
    pub power: f64,
    /// bytes per second of a single link
    pub bandwidth: f64,
    pub latency: f64,
}

impl HomogeneousCluster {
    pub fn new(number_of_workstations: usize, power: f64) -> Self {
        Self::with_network(
            number_of_workstations,
            power,
            DEFAULT_BANDWIDTH,
            DEFAULT_LATENCY,
        )
    }

    pub fn with_network(
        number_of_workstations: usize,
        power: f64,
        bandwidth: f64,
        latency: f64,
    ) -> Self {
        let workstations = (0..number_of_workstations)
            .map(Workstation::new)
            .collect::<Vec<Workstation>>();
        Self {
            workstations,
            power,
            bandwidth,
            latency,
        }
    }

    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        if config.number_of_workstations == 0 {
            return Err(SchedError::Configuration(
                "The cluster has no workstation.".to_string(),
            ));
        }
        if !(config.power > 0.0 && config.power.is_finite()) {
            return Err(SchedError::Configuration(format!(
                "Workstation power must be positive, got {}.",
                config.power
            )));
        }
        if !(config.bandwidth > 0.0) || config.latency < 0.0 {
            return Err(SchedError::Configuration(
                "Network bandwidth must be positive and latency non-negative.".to_string(),
            ));
        }
        Ok(Self::with_network(
            config.number_of_workstations,
            config.power,
            config.bandwidth,
            config.latency,
        ))
    }

    pub fn get_number_of_workstations(&self) -> usize {
        self.workstations.len()
    }

    /// Sets every workstation back to a fresh state for a new round.
    pub fn reset_workstation_attributes(&mut self) {
        for workstation in self.workstations.iter_mut() {
            workstation.reset();
        }
    }

    /// Orders all workstations for a task that cannot start before `time`.
    ///
    /// Workstations available at or before `time` come first, latest available first, so
    /// that idle periods are kept short. The ones available after `time` follow, earliest
    /// available first. Equal dates keep the workstation order.
    pub fn get_best_workstation_set(&self, time: f64) -> Vec<usize> {
        let (mut available, mut busy): (Vec<&Workstation>, Vec<&Workstation>) = self
            .workstations
            .iter()
            .partition(|workstation| workstation.available_at <= time);

        available.sort_by(|a, b| b.available_at.total_cmp(&a.available_at));
        busy.sort_by(|a, b| a.available_at.total_cmp(&b.available_at));

        available
            .into_iter()
            .chain(busy)
            .map(|workstation| workstation.id)
            .collect()
    }

    /// Number of distinct workstations used by the current schedule.
    pub fn compute_peak_resource_usage(&self) -> usize {
        self.workstations
            .iter()
            .filter(|workstation| workstation.is_used())
            .count()
    }

    pub fn check_availability(&self) -> Result<()> {
        match self
            .workstations
            .iter()
            .find(|workstation| workstation.available_at < 0.0)
        {
            Some(workstation) => Err(SchedError::StaleState(format!(
                "Workstation {} is available at a negative date ({}).",
                workstation.id, workstation.available_at
            ))),
            None => Ok(()),
        }
    }
}

/// load a platform yaml file and return the cluster it describes
///
/// # Example
///
/// ```
/// use lib::homogeneous::create_cluster_from_yaml;
///
/// let cluster = create_cluster_from_yaml("tests/sample_platforms/cluster_4.yaml").unwrap();
/// assert_eq!(cluster.get_number_of_workstations(), 4);
/// ```
pub fn create_cluster_from_yaml(file_path: &str) -> Result<HomogeneousCluster> {
    let file_content = fs::read_to_string(file_path)?;
    let config: PlatformConfig = serde_yaml::from_str(&file_content)?;
    let cluster = HomogeneousCluster::from_config(&config)?;
    info!(
        "Loaded platform {} with {} workstations of power {}",
        file_path,
        cluster.get_number_of_workstations(),
        cluster.power
    );
    Ok(cluster)
}
