use embassy_time::Ticker;

use crate::config::system::{ACTUATOR_DT_S, ACTUATOR_PERIOD};
use crate::control::motor::{Actuator, MotorControl};
use crate::data::{Alarm, ControlOutput, DataChannels, SystemState};
use crate::error::MotorError;

/// Подаёт последний выход регулятора через управление моторами.
pub struct ActuatorTask<'a, A: Actuator> {
    motor: MotorControl<A>,
    channels: &'a DataChannels,
    system: &'a SystemState,
}

impl<'a, A: Actuator> ActuatorTask<'a, A> {
    pub fn new(motor: MotorControl<A>, channels: &'a DataChannels, system: &'a SystemState) -> Self {
        Self {
            motor,
            channels,
            system,
        }
    }

    /// Один период моторов. Возвращает реально применённую скорость.
    pub fn tick(&mut self) -> f32 {
        let mode = self.system.mode();
        let command = self.channels.control.get().unwrap_or(ControlOutput::ZERO);

        let speed = match self.motor.update(mode, command.output, ACTUATOR_DT_S) {
            Ok(speed) => speed,
            Err(MotorError::UnsafeCommand) => {
                self.system.raise(Alarm::UnsafeCommand);
                0.0
            }
            Err(MotorError::Actuation) => {
                self.system.raise(Alarm::ActuatorFault);
                0.0
            }
        };
        self.channels.motor_speed.overwrite(speed);
        speed
    }

    pub async fn run(mut self) -> ! {
        info!("Запуск задачи управления моторами");
        let mut ticker = Ticker::every(ACTUATOR_PERIOD);
        loop {
            ticker.next().await;
            self.tick();
        }
    }
}
