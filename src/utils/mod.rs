pub mod converter;
pub mod exposition;
pub mod json_path;
pub mod labels;
pub mod metric_family;
pub mod pod_matcher;
