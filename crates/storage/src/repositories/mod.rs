pub mod cooldown_repo;
pub mod cursor_repo;
pub mod rotation_repo;
pub mod settings_repo;
pub mod setups_repo;
pub mod signals_repo;

pub use cooldown_repo::CooldownRepository;
pub use cursor_repo::CursorRepository;
pub use rotation_repo::RotationRepository;
pub use settings_repo::SettingsRepository;
pub use setups_repo::SetupsRepository;
pub use signals_repo::{SentSignal, SignalsRepository};
