//! Хранение конфигурации ПИД.

use super::robot::calibration;
use super::pid::PidConfig;

/// Хранилище конфигурации ПИД.
///
/// Формат во flash определяет реализация, ядру нужны только загрузка и
/// сохранение всей конфигурации.
pub trait ConfigStore {
    type Error;

    fn load(&mut self) -> Result<PidConfig, Self::Error>;

    fn save(&mut self, config: &PidConfig) -> Result<(), Self::Error>;

    /// Число отсчётов неподвижного гироскопа для усреднения при запуске.
    fn calibration_samples(&self) -> u16 {
        calibration::DEFAULT_SAMPLES
    }
}

/// Конфигурация только в RAM, живёт до следующего сброса.
pub struct RamStore {
    config: PidConfig,
    samples: u16,
    saves: u32,
}

impl RamStore {
    pub const fn new(config: PidConfig) -> Self {
        Self {
            config,
            samples: calibration::DEFAULT_SAMPLES,
            saves: 0,
        }
    }

    pub const fn with_calibration_samples(mut self, samples: u16) -> Self {
        self.samples = samples;
        self
    }

    /// Число успешных сохранений с момента создания.
    pub fn save_count(&self) -> u32 {
        self.saves
    }
}

impl Default for RamStore {
    fn default() -> Self {
        Self::new(PidConfig::DEFAULT)
    }
}

impl ConfigStore for RamStore {
    type Error = core::convert::Infallible;

    fn load(&mut self) -> Result<PidConfig, Self::Error> {
        Ok(self.config)
    }

    fn save(&mut self, config: &PidConfig) -> Result<(), Self::Error> {
        self.config = *config;
        self.saves = self.saves.wrapping_add(1);
        Ok(())
    }

    fn calibration_samples(&self) -> u16 {
        self.samples
    }
}
