#[derive(Debug)]
pub enum MatchStateRepositoryError {
    DynamoDb(String),
    Serialization(String),
}

impl std::fmt::Display for MatchStateRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStateRepositoryError::DynamoDb(msg) => write!(f, "DynamoDB error: {}", msg),
            MatchStateRepositoryError::Serialization(msg) => {
                write!(f, "Serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for MatchStateRepositoryError {}
