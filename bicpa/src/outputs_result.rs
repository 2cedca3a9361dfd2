use crate::bicpa::BiCpaOutcome;
use crate::selector::ScheduleResult;
use lib::error::Result;
use lib::output_log::append_info_to_yaml;
use lib::util::get_file_name;
use serde_derive::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct ResultInfo {
    platform: String,
    dag: String,
    with_communications: bool,
    alloc_time: f64,
    mapping_time: f64,
    schedule_results: Vec<ScheduleResult>,
    non_dominated: Vec<usize>,
    selected_variants: Vec<VariantInfo>,
}

#[derive(Serialize, Deserialize)]
struct VariantInfo {
    tag: String,
    result: ScheduleResult,
}

pub fn dump_bicpa_result_to_file(
    file_path: &str,
    platform_path: &str,
    dag_path: &str,
    with_communications: bool,
    outcome: &BiCpaOutcome,
) -> Result<()> {
    let result_info = ResultInfo {
        platform: get_file_name(platform_path).to_string(),
        dag: get_file_name(dag_path).to_string(),
        with_communications,
        alloc_time: outcome.alloc_time,
        mapping_time: outcome.mapping_time,
        schedule_results: outcome.results.clone(),
        non_dominated: outcome
            .selection
            .non_dominated
            .iter()
            .map(|result| result.nworkstations)
            .collect(),
        selected_variants: outcome
            .variants
            .iter()
            .map(|(variant, result)| VariantInfo {
                tag: variant.tag().to_string(),
                result: *result,
            })
            .collect(),
    };
    let yaml = serde_yaml::to_string(&result_info)?;
    append_info_to_yaml(file_path, &yaml)
}
