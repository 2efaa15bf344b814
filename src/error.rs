//! Типы ошибок ядра управления.
//!
//! Все ошибки это небольшие `Copy` перечисления. Обрабатываются на месте
//! с заранее определённой реакцией и никогда не останавливают прошивку.

use core::fmt;

/// Неудачное чтение IMU. Временная ошибка, задача датчиков на этом такте
/// повторяет предыдущую оценку.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorReadError {
    Acceleration,
    AngularRate,
}

/// Калибровка смещения гироскопа не завершилась. Запуск невозможен.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Запрошено ноль отсчётов.
    NoSamples,
    /// Ошибка чтения отсчёта номер `sample` (с нуля).
    SensorRead { sample: u16 },
}

/// Конфигурация ПИД нарушает ограничения и отклонена.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `iterm_min > iterm_max`
    IntegralLimits,
    /// `output_min > output_max`
    OutputLimits,
    /// Коэффициент, уставка или предел равны NaN или бесконечности.
    NotFinite,
}

/// Управление мотором отказало или не смогло задать скорость.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    /// Привод сообщил об ошибке, вместо команды запрошен ноль.
    Actuation,
    /// Выход регулятора не является конечным числом.
    UnsafeCommand,
}

impl fmt::Display for SensorReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorReadError::Acceleration => f.write_str("failed to read acceleration"),
            SensorReadError::AngularRate => f.write_str("failed to read angular rate"),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::NoSamples => f.write_str("calibration needs at least one sample"),
            CalibrationError::SensorRead { sample } => {
                write!(f, "gyro read failed at calibration sample {}", sample)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IntegralLimits => f.write_str("iterm_min is greater than iterm_max"),
            ConfigError::OutputLimits => f.write_str("output_min is greater than output_max"),
            ConfigError::NotFinite => f.write_str("configuration contains a non-finite value"),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::Actuation => f.write_str("actuator fault"),
            MotorError::UnsafeCommand => f.write_str("non-finite motor command"),
        }
    }
}
