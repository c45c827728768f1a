use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use serde_dynamo::{from_item, to_attribute_value, to_item};

use crate::models::match_state::MatchGameState;
use crate::repositories::errors::match_state_repository_errors::MatchStateRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Crash-recovery storage for in-flight match state. The in-memory map
/// in the match state service stays authoritative; this collaborator
/// only has to honor save/load/delete by match id.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MatchStateRepository: Send + Sync {
    async fn save(&self, state: &MatchGameState) -> Result<(), MatchStateRepositoryError>;

    async fn load(
        &self,
        match_id: &str,
    ) -> Result<Option<MatchGameState>, MatchStateRepositoryError>;

    async fn delete(&self, match_id: &str) -> Result<(), MatchStateRepositoryError>;
}

pub struct DynamoDbMatchStateRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbMatchStateRepository {
    pub fn new(client: Client) -> Self {
        let table_name = std::env::var("MATCH_STATES_TABLE")
            .expect("MATCH_STATES_TABLE environment variable must be set");
        Self { client, table_name }
    }

    pub fn with_table_name(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl MatchStateRepository for DynamoDbMatchStateRepository {
    async fn save(&self, state: &MatchGameState) -> Result<(), MatchStateRepositoryError> {
        let item =
            to_item(state).map_err(|e| MatchStateRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| MatchStateRepositoryError::DynamoDb(e.to_string()))?;
        Ok(())
    }

    async fn load(
        &self,
        match_id: &str,
    ) -> Result<Option<MatchGameState>, MatchStateRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                "match_id",
                to_attribute_value(match_id)
                    .map_err(|e| MatchStateRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| MatchStateRepositoryError::DynamoDb(e.to_string()))?;

        match output.item {
            Some(item) => {
                let state: MatchGameState = from_item(item)
                    .map_err(|e| MatchStateRepositoryError::Serialization(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, match_id: &str) -> Result<(), MatchStateRepositoryError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(
                "match_id",
                to_attribute_value(match_id)
                    .map_err(|e| MatchStateRepositoryError::Serialization(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| MatchStateRepositoryError::DynamoDb(e.to_string()))?;
        Ok(())
    }
}
