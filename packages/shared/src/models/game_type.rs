use serde::{Deserialize, Serialize};

/// The six games the platform can referee. Used as the matchmaking queue
/// bucket key and as the engine registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Chess,
    ConnectFour,
    Mancala,
    Whot,
    Survey,
    Wordle,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Chess => "chess",
            GameType::ConnectFour => "connect_four",
            GameType::Mancala => "mancala",
            GameType::Whot => "whot",
            GameType::Survey => "survey",
            GameType::Wordle => "wordle",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chess" => Ok(GameType::Chess),
            "connect_four" => Ok(GameType::ConnectFour),
            "mancala" => Ok(GameType::Mancala),
            "whot" => Ok(GameType::Whot),
            "survey" => Ok(GameType::Survey),
            "wordle" => Ok(GameType::Wordle),
            other => Err(format!("Unknown game type: {}", other)),
        }
    }
}
