use crate::error::Result;
use crate::output_log::create_yaml_file;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

pub fn load_yaml(file_path: &str) -> Result<Vec<Yaml>> {
    let file_content = fs::read_to_string(file_path)?;
    Ok(YamlLoader::load_from_str(&file_content)?)
}

pub fn create_scheduler_log_yaml(dir_path: &str, alg_name: &str) -> Result<String> {
    let now: DateTime<Utc> = Utc::now();
    let date = now.format("%Y-%m-%d-%H-%M-%S").to_string();
    let file_name = format!("{}-{}-result", date, alg_name);
    create_yaml_file(dir_path, &file_name)
}

/// Base name of a file path, used to label report lines.
pub fn get_file_name(file_path: &str) -> &str {
    Path::new(file_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_path)
}
