#[derive(Debug)]
pub enum StatsRepositoryError {
    DynamoDb(String),
    Serialization(String),
}

impl std::fmt::Display for StatsRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatsRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            StatsRepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StatsRepositoryError {}
