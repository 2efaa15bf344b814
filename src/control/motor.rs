//! Управление моторами: последняя блокировка между выходом ПИД и колёсами.

use crate::config::motor;
use crate::data::OperatingState;
use crate::error::MotorError;
use crate::utils::math::{constrain, slew_toward};

/// Силовой каскад колёс.
pub trait Actuator {
    type Error;

    /// Заполнение со знаком в `[-1, 1]`, положительное вперёд.
    fn set_speed(&mut self, speed: f32) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorLimits {
    /// Выход регулятора, соответствующий полному заполнению.
    pub full_scale: f32,
    /// Наибольшее записываемое заполнение.
    pub max_speed: f32,
    /// Наибольшее изменение заполнения в секунду.
    pub max_slew_per_s: f32,
}

impl MotorLimits {
    pub const DEFAULT: Self = Self {
        full_scale: motor::FULL_SCALE_OUTPUT,
        max_speed: motor::MAX_SAFE_SPEED,
        max_slew_per_s: motor::MAX_SLEW_PER_S,
    };
}

impl Default for MotorLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

pub struct MotorControl<A: Actuator> {
    actuator: A,
    limits: MotorLimits,
    speed: f32,
}

impl<A: Actuator> MotorControl<A> {
    pub fn new(actuator: A, limits: MotorLimits) -> Self {
        Self {
            actuator,
            limits,
            speed: 0.0,
        }
    }

    /// Последняя записанная в привод скорость.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Один такт привода, возвращает применённую скорость.
    ///
    /// `output` проходит только в `Balancing`, в остальных режимах пишется ноль.
    pub fn update(
        &mut self,
        mode: OperatingState,
        output: f32,
        dt: f32,
    ) -> Result<f32, MotorError> {
        if mode != OperatingState::Balancing {
            self.write(0.0)?;
            return Ok(0.0);
        }

        if !output.is_finite() {
            error!("Моторы: неконечная команда, принудительный ноль");
            self.write(0.0)?;
            return Err(MotorError::UnsafeCommand);
        }

        let target = constrain(
            output / self.limits.full_scale,
            -self.limits.max_speed,
            self.limits.max_speed,
        );
        let step = if dt > 0.0 { self.limits.max_slew_per_s * dt } else { 0.0 };
        let speed = slew_toward(self.speed, target, step);

        self.write(speed)?;

        #[cfg(feature = "debug-actuators")]
        trace!("motor: out={} target={} speed={}", output, target, speed);

        Ok(speed)
    }

    /// Записать нулевую скорость.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        self.write(0.0)
    }

    fn write(&mut self, speed: f32) -> Result<(), MotorError> {
        if self.actuator.set_speed(speed).is_ok() {
            self.speed = speed;
            return Ok(());
        }
        error!("Моторы: ошибка привода на скорости {}", speed);
        // Ошибочное значение не повторяем, только пытаемся остановить.
        if self.actuator.set_speed(0.0).is_err() {
            error!("Моторы: привод не принял нулевую скорость");
        }
        self.speed = 0.0;
        Err(MotorError::Actuation)
    }
}

impl<A: Actuator> Drop for MotorControl<A> {
    fn drop(&mut self) {
        let _ = self.actuator.set_speed(0.0);
    }
}
