//! ПИД-регулятор с ограничением интеграла.
//!
//! Регулятор владеет только конфигурацией. Накопленное состояние хранится
//! в [`PidState`] у вызывающего, один регулятор может обслуживать несколько
//! контуров.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::PidConfig;
use crate::error::ConfigError;
use crate::utils::math::constrain;

/// Состояние одного контура.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    pub integral: f32,
    pub last_error: f32,
}

impl PidState {
    pub const fn new() -> Self {
        Self {
            integral: 0.0,
            last_error: 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

pub struct PidController {
    config: Mutex<CriticalSectionRawMutex, Cell<PidConfig>>,
}

impl PidController {
    /// `config` здесь не проверяется, обновления во время работы идут через `set_config`.
    pub const fn new(config: PidConfig) -> Self {
        Self {
            config: Mutex::new(Cell::new(config)),
        }
    }

    /// Заменить конфигурацию целиком. Некорректная отклоняется, текущая
    /// остаётся.
    pub fn set_config(&self, config: PidConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config.lock(|c| c.set(config));
        Ok(())
    }

    pub fn config(&self) -> PidConfig {
        self.config.lock(|c| c.get())
    }

    pub fn target_angle(&self) -> f32 {
        self.config().target_angle
    }

    /// Один шаг регулятора по измерению `current` за `dt` секунд.
    ///
    /// При неположительном или NaN `dt` интеграл и производная не считаются.
    /// Неконечный `current` даёт ноль в пределах выхода, `state` не меняется.
    pub fn compute(&self, state: &mut PidState, current: f32, dt: f32) -> f32 {
        // копия, блокировка на время расчёта не держится
        let cfg = self.config();

        if !current.is_finite() {
            warn!("ПИД: неконечное измерение");
            return constrain(0.0, cfg.output_min, cfg.output_max);
        }

        let error = cfg.target_angle - current;
        let p_term = cfg.kp * error;

        let (i_term, d_term) = if dt > 0.0 {
            state.integral = constrain(state.integral + error * dt, cfg.iterm_min, cfg.iterm_max);
            (cfg.ki * state.integral, cfg.kd * (error - state.last_error) / dt)
        } else {
            (cfg.ki * state.integral, 0.0)
        };
        state.last_error = error;

        let output = constrain(p_term + i_term + d_term, cfg.output_min, cfg.output_max);

        #[cfg(feature = "debug-actuators")]
        trace!("pid: e={} p={} i={} d={} out={}", error, p_term, i_term, d_term, output);

        output
    }
}
