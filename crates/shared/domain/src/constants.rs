//! Shared string constants: `OpenAPI` tags, template names and export naming.

pub const SYSTEM_TAG: &str = "System";
pub const EXPERIMENTS_TAG: &str = "Experiments";
pub const BATTERIES_TAG: &str = "Batteries";
pub const EXPORT_TAG: &str = "Export";

/// Storage namespace holding installed experiment folders.
pub const EXPERIMENTS_NAMESPACE: &str = "experiments";
/// Public URL prefix under which installed experiment folders are served.
pub const EXPERIMENTS_STATIC_PREFIX: &str = "/static/experiments";

pub const EXPORT_PREFIX: &str = "expfactory";
pub const EXPORT_EXTENSION: &str = "tsv";

pub mod templates {
    pub const ALL_EXPERIMENTS: &str = "all_experiments.html";
    pub const EXPERIMENT_DETAILS: &str = "experiment_details.html";
    pub const EXPERIMENT_TEMPLATE_DETAILS: &str = "experiment_template_details.html";
    pub const EXPERIMENT_PREVIEW: &str = "experiment_preview.html";
    pub const ADD_EXPERIMENT_TEMPLATE: &str = "add_experiment_template.html";
    pub const EDIT_EXPERIMENT_TEMPLATE: &str = "edit_experiment_template.html";
    pub const ALL_BATTERIES: &str = "all_batteries.html";
    pub const BATTERY_DETAILS: &str = "battery_details.html";
    pub const EDIT_BATTERY: &str = "edit_battery.html";
    pub const ADD_EXPERIMENT: &str = "add_experiment.html";
    pub const EDIT_EXPERIMENT: &str = "edit_experiment.html";
}
