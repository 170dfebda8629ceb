//! Battery and battery-experiment forms.

use expdj_kernel::database::models::{Battery, Experiment, Id, User};
use expdj_kernel::forms::{FormData, FormErrors};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const NAME_MAX_LEN: usize = 200;

static DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new("[0-9]+").ok());

/// Editable fields of a battery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatteryForm {
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub bonus_active: bool,
    pub blacklist_active: bool,
    pub maximum_time: Option<i64>,
    pub number_of_experiments: Option<i64>,
    pub contributors: Vec<Id>,
}

impl BatteryForm {
    /// Validates a submission. Every contributor must be one of `users`.
    ///
    /// # Errors
    /// Field errors keyed by form field name.
    pub fn parse(data: &FormData, users: &[User]) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let name = data.required_text("name", NAME_MAX_LEN, &mut errors);
        let maximum_time = data.positive_int("maximum_time", &mut errors);
        let number_of_experiments = data.positive_int("number_of_experiments", &mut errors);

        let mut contributors = Vec::new();
        for raw in data.get_all("contributors").map(str::trim).filter(|raw| !raw.is_empty()) {
            match raw.parse::<Id>() {
                Ok(id) if users.iter().any(|user| user.id == id) => {
                    if !contributors.contains(&id) {
                        contributors.push(id);
                    }
                },
                _ => errors.add(
                    "contributors",
                    format!("Select a valid choice. {raw} is not one of the available choices."),
                ),
            }
        }

        match name {
            Some(name) if errors.is_empty() => Ok(Self {
                name,
                description: data.text("description"),
                active: data.flag("active"),
                bonus_active: data.flag("bonus_active"),
                blacklist_active: data.flag("blacklist_active"),
                maximum_time,
                number_of_experiments,
                contributors,
            }),
            _ => Err(errors),
        }
    }

    /// Copies the fields onto `battery`. Contributors are replaced only when
    /// `with_contributors` is set; the ids that were newly added are returned.
    pub fn apply(self, battery: &mut Battery, with_contributors: bool) -> Vec<Id> {
        battery.name = self.name;
        battery.description = self.description;
        battery.active = self.active;
        battery.bonus_active = self.bonus_active;
        battery.blacklist_active = self.blacklist_active;
        battery.maximum_time = self.maximum_time;
        battery.number_of_experiments = self.number_of_experiments;

        if !with_contributors {
            return Vec::new();
        }
        let added =
            self.contributors.iter().copied().filter(|id| !battery.contributors.contains(id)).collect();
        battery.contributors = self.contributors;
        added
    }
}

impl From<&Battery> for BatteryForm {
    fn from(battery: &Battery) -> Self {
        Self {
            name: battery.name.clone(),
            description: battery.description.clone(),
            active: battery.active,
            bonus_active: battery.bonus_active,
            blacklist_active: battery.blacklist_active,
            maximum_time: battery.maximum_time,
            number_of_experiments: battery.number_of_experiments,
            contributors: battery.contributors.clone(),
        }
    }
}

/// Bonus and rejection switches of an experiment placed in a battery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExperimentForm {
    pub include_bonus: bool,
    pub include_catch: bool,
}

impl ExperimentForm {
    #[must_use]
    pub fn parse(data: &FormData) -> Self {
        Self { include_bonus: data.flag("include_bonus"), include_catch: data.flag("include_catch") }
    }

    pub const fn apply(self, experiment: &mut Experiment) {
        experiment.include_bonus = self.include_bonus;
        experiment.include_catch = self.include_catch;
    }
}

impl From<&Experiment> for ExperimentForm {
    fn from(experiment: &Experiment) -> Self {
        Self { include_bonus: experiment.include_bonus, include_catch: experiment.include_catch }
    }
}

/// Variable ids named by credit-condition fields (`val12`, `oper12`, `amt12`).
///
/// The first run of digits in each key is taken; the result is unique and ascending.
#[must_use]
pub fn credit_variable_ids<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<Id> {
    let Some(digits) = DIGITS.as_ref() else {
        return Vec::new();
    };
    keys.into_iter()
        .filter_map(|key| digits.find(key))
        .filter_map(|found| found.as_str().parse::<Id>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
