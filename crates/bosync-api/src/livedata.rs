// Live-data writes to datapoint instances.

use tracing::debug;

use crate::client::OntologyClient;
use crate::error::Error;
use crate::models::{LiveDataWriteDto, LiveDataWriteResult};

impl OntologyClient {
    /// Write values to datapoint instances.
    ///
    /// The gateway answers 200 with one result per item; any item carrying
    /// an error code turns the whole call into [`Error::Rejected`].
    pub async fn put_live_data(&self, writes: &[LiveDataWriteDto]) -> Result<(), Error> {
        let results: Vec<LiveDataWriteResult> = self
            .post("ontology/datapointinstance/livedata", writes)
            .await?;

        debug!(results = results.len(), "live data write acknowledged");

        let failures: Vec<LiveDataWriteResult> = results
            .into_iter()
            .filter(|r| !r.error_code.is_empty())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Rejected { failures })
        }
    }
}
