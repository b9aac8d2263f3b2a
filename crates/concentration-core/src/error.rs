use crate::model::owner::Owner;
use thiserror::Error;

/// Rejections reported by the board, the turn engine and the session.
///
/// Every variant is recoverable: the call that produced it left the game
/// exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("a {rows}x{cols} board needs an even, non-zero number of cells")]
    InvalidDimensions { rows: usize, cols: usize },
    #[error("card value {value} appears {count} times; every value must appear exactly twice")]
    InvalidLayout { value: u32, count: usize },
    #[error("index {index} is outside a board of {len} cards")]
    InvalidIndex { index: usize, len: usize },
    #[error("it is {expected}'s turn, not {actual}'s")]
    NotYourTurn { expected: Owner, actual: Owner },
    #[error("illegal move: {reason}")]
    IllegalState { reason: &'static str },
    #[error("the game is over")]
    GameOver,
}

impl GameError {
    pub(crate) const fn illegal(reason: &'static str) -> Self {
        GameError::IllegalState { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::GameError;
    use crate::model::owner::Owner;

    #[test]
    fn display_names_both_owners() {
        let err = GameError::NotYourTurn {
            expected: Owner::Ai,
            actual: Owner::Player,
        };
        assert_eq!(err.to_string(), "it is AI's turn, not Player's");
    }

    #[test]
    fn display_reports_odd_dimensions() {
        let err = GameError::InvalidDimensions { rows: 3, cols: 3 };
        assert!(err.to_string().contains("3x3"));
    }
}
