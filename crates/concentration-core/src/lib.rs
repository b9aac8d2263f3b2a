#![deny(warnings)]

pub mod ai;
pub mod error;
pub mod game;
pub mod model;

pub use error::GameError;
pub use game::session::{GameSession, GameSummary, SessionConfig};
pub use game::snapshot::SessionSnapshot;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "concentration"
    }

    pub const fn codename() -> &'static str {
        "Bounded Recall"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::AppInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(AppInfo::name(), "concentration");
        assert_eq!(AppInfo::codename(), "Bounded Recall");
        assert!(!AppInfo::version().is_empty());
    }
}
