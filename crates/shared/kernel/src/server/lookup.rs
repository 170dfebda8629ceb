//! Id to record, or 404.

use super::{ApiError, ApiResult};
use crate::database::Database;
use crate::database::models::{Battery, Experiment, ExperimentTemplate, Id};

pub async fn get_template(database: &Database, eid: Id) -> ApiResult<ExperimentTemplate> {
    database.template(eid).await?.ok_or_else(|| ApiError::not_found(format!("experiment template {eid}")))
}

pub async fn get_experiment(database: &Database, eid: Id) -> ApiResult<Experiment> {
    database.experiment(eid).await?.ok_or_else(|| ApiError::not_found(format!("experiment {eid}")))
}

pub async fn get_battery(database: &Database, bid: Id) -> ApiResult<Battery> {
    database.battery(bid).await?.ok_or_else(|| ApiError::not_found(format!("battery {bid}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_records_are_404() {
        let database = Database::ephemeral().await.unwrap();
        assert_eq!(get_template(&database, 1).await.unwrap_err().status_code(), 404);
        assert_eq!(get_experiment(&database, 1).await.unwrap_err().status_code(), 404);
        assert_eq!(get_battery(&database, 1).await.unwrap_err().status_code(), 404);
        assert_eq!(get_battery(&database, 0).await.unwrap_err().status_code(), 404);
    }

    #[tokio::test]
    async fn present_records_are_returned() {
        let database = Database::ephemeral().await.unwrap();
        let bid = database.insert_battery(Battery { name: "b".into(), ..Battery::default() }).await.unwrap();
        assert_eq!(get_battery(&database, bid).await.unwrap().name, "b");
    }
}
