//! Choice of the assumed cluster sizes worth reporting among all evaluated schedules.
use lib::error::{Result, SchedError};
use log::debug;
use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// assumed cluster size the allocation was computed for
    pub nworkstations: usize,
    pub makespan: f64,
    pub work: f64,
    pub peak_allocation: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tradeoff {
    /// normalized work and makespan as close to each other as possible
    PerfectEquity,
    /// smallest sum of normalized work and makespan
    MinSum,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub baseline: ScheduleResult,
    pub non_dominated: Vec<ScheduleResult>,
    pub best_makespan: ScheduleResult,
    pub best_work: ScheduleResult,
    pub perfect_equity: ScheduleResult,
    pub min_sum: ScheduleResult,
}

fn sort_by_makespan(results: &[ScheduleResult]) -> Vec<ScheduleResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| a.makespan.total_cmp(&b.makespan));
    sorted
}

/// Results by increasing makespan whose work does not exceed the work of the previously
/// kept result.
pub fn get_non_dominated_schedules(results: &[ScheduleResult]) -> Vec<ScheduleResult> {
    let mut non_dominated: Vec<ScheduleResult> = Vec::new();
    for result in sort_by_makespan(results) {
        if non_dominated
            .last()
            .map_or(true, |last| result.work <= last.work)
        {
            non_dominated.push(result);
        }
    }
    non_dominated
}

/// Shortest schedule that does not consume more than `baseline_work`.
pub fn get_best_makespan(
    results: &[ScheduleResult],
    baseline_work: f64,
) -> Option<ScheduleResult> {
    sort_by_makespan(results)
        .into_iter()
        .find(|result| result.work <= baseline_work)
}

/// Cheapest schedule that is not longer than `baseline_makespan`.
pub fn get_best_work(
    results: &[ScheduleResult],
    baseline_makespan: f64,
) -> Option<ScheduleResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| a.work.total_cmp(&b.work));
    sorted
        .into_iter()
        .find(|result| result.makespan <= baseline_makespan)
}

pub fn get_tradeoff_score(
    result: &ScheduleResult,
    baseline: &ScheduleResult,
    tradeoff: Tradeoff,
) -> f64 {
    let normalized_makespan = result.makespan / baseline.makespan;
    let normalized_work = result.work / baseline.work;
    match tradeoff {
        Tradeoff::PerfectEquity => (1.0 - normalized_work / normalized_makespan).abs(),
        Tradeoff::MinSum => normalized_work + normalized_makespan,
    }
}

/// Result of `candidates` with the lowest score, the first one on ties.
pub fn get_bicriteria_tradeoff(
    candidates: &[ScheduleResult],
    baseline: &ScheduleResult,
    tradeoff: Tradeoff,
) -> Option<ScheduleResult> {
    let mut best: Option<(ScheduleResult, f64)> = None;
    for candidate in candidates {
        let score = get_tradeoff_score(candidate, baseline, tradeoff);
        debug!(
            "{} : score {:.5} ({:.5} {:.5})",
            candidate.nworkstations,
            score,
            candidate.makespan / baseline.makespan,
            candidate.work / baseline.work
        );
        if best.map_or(true, |(_, best_score)| score < best_score) {
            best = Some((*candidate, score));
        }
    }
    best.map(|(result, _)| result)
}

/// Picks the reported schedules, the baseline being the one computed for the full cluster.
pub fn select_schedules(results: &[ScheduleResult]) -> Result<Selection> {
    let no_result = || SchedError::Configuration("No schedule to select from.".to_string());
    let baseline = *results
        .iter()
        .max_by_key(|result| result.nworkstations)
        .ok_or_else(no_result)?;

    let non_dominated = get_non_dominated_schedules(results);
    for result in non_dominated.iter() {
        debug!(
            "non dominated: {:.5} {:.5} {}",
            result.makespan / baseline.makespan,
            result.work / baseline.work,
            result.nworkstations
        );
    }

    let selection = Selection {
        best_makespan: get_best_makespan(results, baseline.work).ok_or_else(no_result)?,
        best_work: get_best_work(results, baseline.makespan).ok_or_else(no_result)?,
        perfect_equity: get_bicriteria_tradeoff(
            &non_dominated,
            &baseline,
            Tradeoff::PerfectEquity,
        )
        .ok_or_else(no_result)?,
        min_sum: get_bicriteria_tradeoff(&non_dominated, &baseline, Tradeoff::MinSum)
            .ok_or_else(no_result)?,
        baseline,
        non_dominated,
    };
    debug!(
        "Best sizes are: makespan = {}, work = {}, equity = {}, sum = {}",
        selection.best_makespan.nworkstations,
        selection.best_work.nworkstations,
        selection.perfect_equity.nworkstations,
        selection.min_sum.nworkstations
    );
    Ok(selection)
}
