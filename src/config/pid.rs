//! Конфигурация ПИД во время работы.

use crate::error::ConfigError;

/// Коэффициенты, уставка и пределы контура балансировки.
///
/// Заменяется целиком, частичных обновлений нет.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Уставка тангажа в градусах.
    pub target_angle: f32,
    pub iterm_min: f32,
    pub iterm_max: f32,
    pub output_min: f32,
    pub output_max: f32,
}

impl PidConfig {
    /// Осторожная настройка до загрузки сохранённой конфигурации.
    pub const DEFAULT: Self = Self {
        kp: 12.0,
        ki: 0.8,
        kd: 0.35,
        target_angle: 0.0,
        iterm_min: -40.0,
        iterm_max: 40.0,
        output_min: -100.0,
        output_max: 100.0,
    };

    /// Проверка `min <= max` и конечности всех полей.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            self.kp,
            self.ki,
            self.kd,
            self.target_angle,
            self.iterm_min,
            self.iterm_max,
            self.output_min,
            self.output_max,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NotFinite);
        }
        if self.iterm_min > self.iterm_max {
            return Err(ConfigError::IntegralLimits);
        }
        if self.output_min > self.output_max {
            return Err(ConfigError::OutputLimits);
        }
        Ok(())
    }
}

impl Default for PidConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
