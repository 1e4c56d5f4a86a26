//! Where the engine looks up durations and chaining behaviour.

use crate::error::SettingsError;
use crate::model::SessionKind;
use crate::storage::{Config, ConfigFile};

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_RECOVERY_MINUTES: u32 = 5;
pub const DEFAULT_LONG_RECOVERY_MINUTES: u32 = 15;
pub const DEFAULT_RECOVERY_INTERVAL: u32 = 4;

/// Fallback duration used when settings cannot be read.
pub fn default_duration_minutes(kind: SessionKind) -> u32 {
    match kind {
        SessionKind::Work => DEFAULT_WORK_MINUTES,
        SessionKind::ShortRecovery => DEFAULT_SHORT_RECOVERY_MINUTES,
        SessionKind::LongRecovery => DEFAULT_LONG_RECOVERY_MINUTES,
    }
}

pub trait SettingsProvider {
    /// Planned length of a session of `kind`. Never zero.
    fn duration_minutes(&self, kind: SessionKind) -> Result<u32, SettingsError>;

    /// Whether finishing a session of `kind` starts the next one automatically.
    fn auto_chain_enabled(&self, finished: SessionKind) -> Result<bool, SettingsError>;

    /// Every Nth completed work session is followed by a long recovery.
    fn recovery_interval(&self) -> Result<u32, SettingsError>;
}

impl SettingsProvider for Config {
    fn duration_minutes(&self, kind: SessionKind) -> Result<u32, SettingsError> {
        let minutes = match kind {
            SessionKind::Work => self.schedule.work_minutes,
            SessionKind::ShortRecovery => self.schedule.short_recovery_minutes,
            SessionKind::LongRecovery => self.schedule.long_recovery_minutes,
        };
        Ok(minutes.max(1))
    }

    fn auto_chain_enabled(&self, finished: SessionKind) -> Result<bool, SettingsError> {
        Ok(if finished.is_work() {
            self.auto_chain.auto_start_recovery
        } else {
            self.auto_chain.auto_start_work
        })
    }

    fn recovery_interval(&self) -> Result<u32, SettingsError> {
        Ok(self.schedule.recovery_interval)
    }
}

impl SettingsProvider for ConfigFile {
    fn duration_minutes(&self, kind: SessionKind) -> Result<u32, SettingsError> {
        self.current()?.duration_minutes(kind)
    }

    fn auto_chain_enabled(&self, finished: SessionKind) -> Result<bool, SettingsError> {
        self.current()?.auto_chain_enabled(finished)
    }

    fn recovery_interval(&self) -> Result<u32, SettingsError> {
        self.current()?.recovery_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_maps_chain_flags_by_finished_kind() {
        let mut cfg = Config::default();
        cfg.auto_chain.auto_start_recovery = true;
        assert!(cfg.auto_chain_enabled(SessionKind::Work).unwrap());
        assert!(!cfg.auto_chain_enabled(SessionKind::ShortRecovery).unwrap());
        assert!(!cfg.auto_chain_enabled(SessionKind::LongRecovery).unwrap());
    }

    #[test]
    fn config_durations_match_defaults() {
        let cfg = Config::default();
        for kind in [SessionKind::Work, SessionKind::ShortRecovery, SessionKind::LongRecovery] {
            assert_eq!(cfg.duration_minutes(kind).unwrap(), default_duration_minutes(kind));
        }
        assert_eq!(cfg.recovery_interval().unwrap(), DEFAULT_RECOVERY_INTERVAL);
    }

    #[test]
    fn unreadable_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[schedule\n").unwrap();
        let file = ConfigFile::new(path);
        assert!(matches!(
            file.duration_minutes(SessionKind::Work),
            Err(SettingsError::Unavailable(_))
        ));
    }
}
