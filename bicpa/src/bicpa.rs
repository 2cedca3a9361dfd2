//! Runs the allocation search, evaluates every cluster size and picks the reported schedules.
use crate::allocation::set_multiple_allocations;
use crate::mapping::map_allocations;
use crate::round::reset_simulation;
use crate::selector::{select_schedules, ScheduleResult, Selection};
use lib::error::Result;
use lib::graph_extension::{GraphExtension, TaskKind, Workflow};
use lib::homogeneous::HomogeneousCluster;
use lib::level_analyzer::LevelAnalyzer;
use lib::simulator::Simulator;
use log::{debug, info};
use std::time::Instant;

/// Reported schedules, printed in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    PerfectEquity,
    BestMakespan,
    BestWork,
    MinSum,
    Cpa,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::PerfectEquity,
        Variant::BestMakespan,
        Variant::BestWork,
        Variant::MinSum,
        Variant::Cpa,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Variant::PerfectEquity => "E",
            Variant::BestMakespan => "M",
            Variant::BestWork => "W",
            Variant::MinSum => "S",
            Variant::Cpa => "CPA",
        }
    }

    fn pick(&self, selection: &Selection) -> usize {
        let result = match self {
            Variant::PerfectEquity => selection.perfect_equity,
            Variant::BestMakespan => selection.best_makespan,
            Variant::BestWork => selection.best_work,
            Variant::MinSum => selection.min_sum,
            Variant::Cpa => selection.baseline,
        };
        result.nworkstations
    }
}

#[derive(Debug, Clone)]
pub struct BiCpaOutcome {
    /// seconds spent building the allocations
    pub alloc_time: f64,
    /// seconds spent mapping and evaluating every allocation column
    pub mapping_time: f64,
    pub results: Vec<ScheduleResult>,
    pub selection: Selection,
    pub variants: Vec<(Variant, ScheduleResult)>,
}

impl BiCpaOutcome {
    pub fn format_report_line(
        &self,
        variant: Variant,
        result: &ScheduleResult,
        platform: &str,
        dag: &str,
    ) -> String {
        format!(
            "{:.6}:{:.6}:biCPA-{}:{}:{}:{:.3}:{:.3}:{}",
            self.alloc_time,
            self.mapping_time,
            variant.tag(),
            platform,
            dag,
            result.makespan,
            result.work,
            result.peak_allocation
        )
    }
}

pub struct BiCpaScheduler<S: Simulator> {
    pub dag: Workflow,
    pub cluster: HomogeneousCluster,
    simulator: S,
    with_communications: bool,
}

impl<S: Simulator> BiCpaScheduler<S> {
    pub fn new(
        dag: Workflow,
        cluster: HomogeneousCluster,
        simulator: S,
        with_communications: bool,
    ) -> Self {
        Self {
            dag,
            cluster,
            simulator,
            with_communications,
        }
    }

    fn compute_work(&self, makespan: f64, peak_allocation: usize) -> f64 {
        if self.with_communications {
            makespan * peak_allocation as f64
        } else {
            self.dag.get_total_area(self.cluster.power)
        }
    }

    /// Maps and simulates the allocations computed for `nworkstations`, then resets the
    /// round.
    pub fn evaluate_allocation(&mut self, nworkstations: usize) -> Result<ScheduleResult> {
        self.dag.set_allocations_from_iteration(nworkstations)?;
        map_allocations(
            &mut self.dag,
            &mut self.cluster,
            &self.simulator,
            self.with_communications,
        )?;
        let report = self.simulator.evaluate(&self.dag, &self.cluster)?;

        let peak_allocation = self.cluster.compute_peak_resource_usage();
        if peak_allocation != report.peak_allocation {
            debug!(
                "Simulated peak usage is {} while {} workstations have been booked",
                report.peak_allocation, peak_allocation
            );
        }
        let result = ScheduleResult {
            nworkstations,
            makespan: report.makespan,
            work: self.compute_work(report.makespan, peak_allocation),
            peak_allocation,
        };
        info!(
            "[{}] makespan = {:.3}, work = {:.3}, peak_alloc = {}",
            result.nworkstations, result.makespan, result.work, result.peak_allocation
        );

        reset_simulation(&mut self.dag, &mut self.cluster, &mut self.simulator)?;
        Ok(result)
    }

    pub fn schedule(&mut self) -> Result<BiCpaOutcome> {
        let nworkstations = self.cluster.get_number_of_workstations();
        self.dag.set_levels(self.cluster.power)?;
        for node_i in self.dag.node_indices() {
            let task = &self.dag[node_i];
            if task.kind != TaskKind::CommunicationTransfer {
                debug!("{}: bl={:.3}", task.name, task.bottom_level);
            }
        }

        let alloc_start = Instant::now();
        set_multiple_allocations(&mut self.dag, nworkstations, self.cluster.power)?;
        let alloc_time = alloc_start.elapsed().as_secs_f64();
        info!("Allocations built in {:.6} seconds", alloc_time);
        for node_i in self.dag.get_compute_tasks() {
            debug!(
                "Intermediate allocations of task '{}' are {:?}",
                self.dag[node_i].name, self.dag[node_i].iterative_allocations
            );
        }

        let mapping_start = Instant::now();
        let results = (1..=nworkstations)
            .map(|k| self.evaluate_allocation(k))
            .collect::<Result<Vec<_>>>()?;
        let selection = select_schedules(&results)?;
        let mapping_time = mapping_start.elapsed().as_secs_f64();

        let variants = Variant::ALL
            .iter()
            .map(|&variant| {
                self.evaluate_allocation(variant.pick(&selection))
                    .map(|result| (variant, result))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BiCpaOutcome {
            alloc_time,
            mapping_time,
            results,
            selection,
            variants,
        })
    }
}
