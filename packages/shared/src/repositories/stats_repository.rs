use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use crate::repositories::errors::stats_repository_errors::StatsRepositoryError;

#[cfg(test)]
use mockall::automock;

/// Rating assigned to players the stats store has never seen.
pub const DEFAULT_RATING: i32 = 1200;

/// Read side of the player stats collaborator. Only the skill rating is
/// consumed here; everything else about stats lives outside the core.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn get_rating(&self, player_id: &str) -> Result<i32, StatsRepositoryError>;
}

pub struct DynamoDbStatsRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbStatsRepository {
    pub fn new(client: Client) -> Self {
        let table_name = std::env::var("PLAYER_STATS_TABLE")
            .expect("PLAYER_STATS_TABLE environment variable must be set");
        Self { client, table_name }
    }

    pub fn with_table_name(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl StatsRepository for DynamoDbStatsRepository {
    async fn get_rating(&self, player_id: &str) -> Result<i32, StatsRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("player_id", AttributeValue::S(player_id.to_string()))
            .send()
            .await
            .map_err(|e| StatsRepositoryError::DynamoDb(e.to_string()))?;

        let rating = output
            .item
            .as_ref()
            .and_then(|item| item.get("rating"))
            .and_then(|value| match value {
                AttributeValue::N(n) => n.parse::<i32>().ok(),
                _ => None,
            })
            .unwrap_or(DEFAULT_RATING);

        Ok(rating)
    }
}

/// Stand-in for deployments without a stats table: every player rates
/// at the default.
pub struct FixedRatingStatsRepository;

#[async_trait]
impl StatsRepository for FixedRatingStatsRepository {
    async fn get_rating(&self, _player_id: &str) -> Result<i32, StatsRepositoryError> {
        Ok(DEFAULT_RATING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_rating_repository_returns_default() {
        let repository = FixedRatingStatsRepository;

        let rating = repository.get_rating("anyone").await.unwrap();

        assert_eq!(rating, DEFAULT_RATING);
    }
}
