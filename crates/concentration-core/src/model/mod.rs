pub mod board;
pub mod card;
pub mod owner;
pub mod score;
