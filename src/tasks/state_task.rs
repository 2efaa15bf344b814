use embassy_time::{Instant, Ticker};

use crate::config::system::STATE_CHECK_PERIOD;
use crate::control::pid::PidController;
use crate::control::state_machine::{MotorDirective, StateMachine};
use crate::data::{ControlOutput, DataChannels, SystemState};

/// Тактирует автомат состояний безопасности.
pub struct StateTask<'a> {
    machine: StateMachine<'a>,
    controller: &'a PidController,
    channels: &'a DataChannels,
    system: &'a SystemState,
}

impl<'a> StateTask<'a> {
    pub fn new(
        machine: StateMachine<'a>,
        controller: &'a PidController,
        channels: &'a DataChannels,
        system: &'a SystemState,
    ) -> Self {
        Self {
            machine,
            controller,
            channels,
            system,
        }
    }

    pub fn machine(&self) -> &StateMachine<'a> {
        &self.machine
    }

    pub fn tick(&mut self, now: Instant) -> MotorDirective {
        if let Some(config) = self.channels.config.take() {
            // отказ логирует автомат
            let _ = self.machine.apply_config(config, self.controller);
        }

        let attitude = self.channels.attitude.observe();
        let alarm = self.system.take_alarm();

        let directive = self.machine.step(now, attitude, alarm);
        if directive == MotorDirective::HoldZero {
            self.channels.control.overwrite(ControlOutput::ZERO);
        }
        directive
    }

    pub async fn run(mut self) -> ! {
        info!("Запуск задачи автомата состояний");
        let mut ticker = Ticker::every(STATE_CHECK_PERIOD);
        loop {
            ticker.next().await;
            self.tick(Instant::now());
        }
    }
}
