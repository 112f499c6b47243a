use super::client::{MessageBusClient, Outcome, RequestKind};
use super::error::XrtError;
use async_trait::async_trait;
use domain::{Empty, Request, Schedule, ScheduleList, CLIENT_NAME};

/// Schedule management operations
#[async_trait]
pub trait ScheduleClient {
    /// Names of all schedules
    async fn all_schedules(&self) -> Outcome<Vec<String>>;

    /// Adds a new schedule
    async fn add_schedule(&self, schedule: Schedule) -> Outcome<()>;

    /// Removes a schedule
    async fn delete_schedule_by_name(&self, name: &str) -> Outcome<()>;
}

#[async_trait]
impl ScheduleClient for MessageBusClient {
    async fn all_schedules(&self) -> Outcome<Vec<String>> {
        let request = Request::all_schedules(CLIENT_NAME);

        self.send::<ScheduleList>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(|b| b.schedules))
            .map_err(|e| XrtError::wrap("failed to query schedule list", e))
    }

    async fn add_schedule(&self, schedule: Schedule) -> Outcome<()> {
        let request = Request::schedule_add(schedule, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap("failed to add schedule", e))
    }

    async fn delete_schedule_by_name(&self, name: &str) -> Outcome<()> {
        let request = Request::schedule_delete(name, CLIENT_NAME);

        self.send::<Empty>(RequestKind::Plain, &request)
            .await
            .map(|body| body.map(drop))
            .map_err(|e| XrtError::wrap(format!("failed to delete schedule {}", name), e))
    }
}
