// Ontology export endpoints.

use crate::client::OntologyClient;
use crate::error::Error;
use crate::models::OntologyDto;

impl OntologyClient {
    /// Current structure version of the gateway's ontology.
    ///
    /// The endpoint answers with a bare JSON integer.
    pub async fn get_ontology_version(&self) -> Result<i32, Error> {
        self.get("core/application/data/version").await
    }

    /// Full ontology export.
    pub async fn get_ontology(&self) -> Result<OntologyDto, Error> {
        self.get("core/application/data").await
    }
}
