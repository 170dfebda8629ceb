//! Batteries feature slice.
//!
//! Battery management, the experiments placed in a battery with their credit conditions,
//! and tab-separated export of collected results.

pub mod credits;
mod error;
pub mod export;
pub mod forms;
#[cfg(feature = "server")]
mod handlers;
pub mod lineup;
#[cfg(feature = "server")]
pub mod router;

pub use error::{BatteriesError, BatteriesErrorExt};
pub use export::ResultTable;

use expdj_kernel::database::models::Id;
use expdj_kernel::domain::constants::{EXPORT_EXTENSION, EXPORT_PREFIX};
use expdj_kernel::domain::registry::InitializedSlice;
use tracing::info;

/// Batteries feature state.
#[expdj_derive::expdj_slice]
pub struct Batteries {
    /// Leading part of export file names.
    pub export_prefix: String,
}

impl BatteriesInner {
    /// `<prefix>_battery_<bid>.tsv`
    #[must_use]
    pub fn battery_file_name(&self, bid: Id) -> String {
        format!("{}_battery_{bid}.{EXPORT_EXTENSION}", self.export_prefix)
    }

    /// `<prefix>_experiment_<tag>.tsv`
    #[must_use]
    pub fn experiment_file_name(&self, tag: &str) -> String {
        format!("{}_experiment_{tag}.{EXPORT_EXTENSION}", self.export_prefix)
    }
}

/// Initializes the slice.
#[must_use]
pub fn init() -> InitializedSlice {
    info!(export_prefix = EXPORT_PREFIX, "Batteries slice initialized");
    Batteries::new(BatteriesInner { export_prefix: EXPORT_PREFIX.to_owned() }).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_file_names() {
        let slice = BatteriesInner { export_prefix: EXPORT_PREFIX.to_owned() };
        assert_eq!(slice.battery_file_name(7), "expfactory_battery_7.tsv");
        assert_eq!(slice.experiment_file_name("stroop"), "expfactory_experiment_stroop.tsv");
    }
}
