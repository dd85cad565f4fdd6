// Live alarm endpoints.

use tracing::debug;

use crate::client::OntologyClient;
use crate::error::Error;
use crate::models::{AlarmAckDto, LiveAlarmDto};

impl OntologyClient {
    /// List live alarms, optionally only those changed since `timestamp`.
    pub async fn get_live_alarms(&self, timestamp: Option<&str>) -> Result<Vec<LiveAlarmDto>, Error> {
        match timestamp {
            Some(ts) => {
                self.get_with_params("core/application/livealarm", &[("timestamp", ts.to_owned())])
                    .await
            }
            None => self.get("core/application/livealarm").await,
        }
    }

    /// Acknowledge an alarm on the gateway.
    pub async fn acknowledge_alarm(&self, ack: &AlarmAckDto) -> Result<(), Error> {
        debug!(session_id = %ack.session_id, "acknowledging alarm");
        self.post_no_response("core/application/livealarm/ack", ack)
            .await
    }
}
