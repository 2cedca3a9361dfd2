mod allocation;
mod bicpa;
mod mapping;
mod outputs_result;
mod round;
mod selector;

use bicpa::BiCpaScheduler;
use clap::Parser;
use lib::dag_creator::create_workflow_from_yaml;
use lib::error::Result;
use lib::homogeneous::create_cluster_from_yaml;
use lib::output_log::{dump_cluster_info_to_yaml, dump_workflow_info_to_yaml};
use lib::simulator::ReplaySimulator;
use lib::util::create_scheduler_log_yaml;
use log::{error, info};
use outputs_result::dump_bicpa_result_to_file;

#[derive(Parser)]
#[clap(
    name = "biCPA",
    version = "1.0",
    about = "About:
    biCPA computes, for every cluster size from 1 to the number of workstations,
    a CPA-like allocation of the parallel tasks of a workflow, maps and simulates
    each of them, and reports the schedules offering the best trade-offs between
    makespan and work."
)]
struct ArgParser {
    ///Path to platform YAML file.
    #[clap(short = 'p', long = "platform", required = true)]
    platform: String,
    ///Path to workflow YAML file.
    #[clap(short = 'd', long = "dag", required = true)]
    dag: String,
    ///Account for data transfers between tasks.
    #[clap(short = 'c', long = "with_communications")]
    with_communications: bool,
    ///Path to output directory. No result file is written if omitted.
    #[clap(short = 'o', long = "output_dir_path", required = false)]
    output_dir_path: Option<String>,
}

fn run(arg: &ArgParser) -> Result<()> {
    let cluster = create_cluster_from_yaml(&arg.platform)?;
    let dag = create_workflow_from_yaml(&arg.dag)?;

    let mut bicpa_scheduler = BiCpaScheduler::new(
        dag,
        cluster,
        ReplaySimulator::new(arg.with_communications),
        arg.with_communications,
    );
    let outcome = bicpa_scheduler.schedule()?;

    for (variant, result) in outcome.variants.iter() {
        println!(
            "{}",
            outcome.format_report_line(*variant, result, &arg.platform, &arg.dag)
        );
    }

    if let Some(output_dir_path) = &arg.output_dir_path {
        let file_path = create_scheduler_log_yaml(output_dir_path, "bicpa")?;
        dump_bicpa_result_to_file(
            &file_path,
            &arg.platform,
            &arg.dag,
            arg.with_communications,
            &outcome,
        )?;
        dump_workflow_info_to_yaml(&file_path, &bicpa_scheduler.dag)?;
        dump_cluster_info_to_yaml(&file_path, &bicpa_scheduler.cluster)?;
        info!("Results written to {}", file_path);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let arg: ArgParser = ArgParser::parse();
    if let Err(err) = run(&arg) {
        error!("{}", err);
        std::process::exit(1);
    }
}
