use embassy_time::Ticker;

use crate::config::system::{CONTROL_DT_S, CONTROL_PERIOD};
use crate::control::pid::{PidController, PidState};
use crate::data::{ControlOutput, DataChannels, OperatingState, SystemState};

/// Считает ПИД по каждому отсчёту ориентации во время балансировки.
pub struct ControlTask<'a> {
    controller: &'a PidController,
    channels: &'a DataChannels,
    system: &'a SystemState,
    state: PidState,
}

impl<'a> ControlTask<'a> {
    pub fn new(
        controller: &'a PidController,
        channels: &'a DataChannels,
        system: &'a SystemState,
    ) -> Self {
        Self {
            controller,
            channels,
            system,
            state: PidState::new(),
        }
    }

    pub fn pid_state(&self) -> &PidState {
        &self.state
    }

    /// Опустошить очередь ориентации. Возвращает выход, опубликованный на этом такте.
    ///
    /// Вне `Balancing` отсчёты отбрасываются, а состояние сбрасывается,
    /// балансировка всегда начинается с нулевого интеграла.
    pub fn tick(&mut self) -> Option<ControlOutput> {
        if self.system.mode() != OperatingState::Balancing {
            while self.channels.attitude.try_pop().is_some() {}
            self.state.reset();
            return None;
        }

        let mut latest = None;
        while let Some(sample) = self.channels.attitude.try_pop() {
            let output = self.controller.compute(&mut self.state, sample.pitch, CONTROL_DT_S);
            latest = Some(ControlOutput { output });
        }
        if let Some(output) = latest {
            self.channels.control.overwrite(output);
        }
        latest
    }

    pub async fn run(mut self) -> ! {
        info!("Запуск задачи управления");
        let mut ticker = Ticker::every(CONTROL_PERIOD);
        loop {
            ticker.next().await;
            self.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PidConfig;
    use crate::data::AttitudeSample;
    use embassy_time::Instant;

    fn push(channels: &DataChannels, pitch: f32) {
        channels
            .attitude
            .try_push(AttitudeSample { pitch, ..AttitudeSample::level(Instant::from_millis(0)) })
            .unwrap();
    }

    fn p_only(kp: f32) -> PidConfig {
        PidConfig { kp, ki: 0.0, kd: 0.0, ..PidConfig::DEFAULT }
    }

    #[test]
    fn test_publishes_pid_output_while_balancing() {
        let pid = PidController::new(p_only(10.0));
        let channels = DataChannels::new();
        let system = SystemState::new();
        system.set_mode(OperatingState::Balancing);
        let mut task = ControlTask::new(&pid, &channels, &system);

        push(&channels, 5.0);
        let out = task.tick().unwrap();
        assert!((out.output + 50.0).abs() < 1e-4);
        assert_eq!(channels.control.get(), Some(out));
        assert!(channels.attitude.is_empty());
    }

    #[test]
    fn test_saturated_output() {
        let pid = PidController::new(p_only(50.0));
        let channels = DataChannels::new();
        let system = SystemState::new();
        system.set_mode(OperatingState::Balancing);
        let mut task = ControlTask::new(&pid, &channels, &system);

        push(&channels, 5.0);
        assert_eq!(task.tick(), Some(ControlOutput { output: -100.0 }));
    }

    #[test]
    fn test_latest_sample_wins() {
        let pid = PidController::new(p_only(1.0));
        let channels = DataChannels::new();
        let system = SystemState::new();
        system.set_mode(OperatingState::Balancing);
        let mut task = ControlTask::new(&pid, &channels, &system);

        push(&channels, 1.0);
        push(&channels, 2.0);
        push(&channels, 3.0);
        let out = task.tick().unwrap();
        assert!((out.output + 3.0).abs() < 1e-5);
        // Новых данных нет: в ящике остаётся прошлый выход.
        assert_eq!(task.tick(), None);
        assert_eq!(channels.control.get(), Some(out));
    }

    #[test]
    fn test_discards_and_resets_outside_balancing() {
        let pid = PidController::new(PidConfig { ki: 1.0, ..p_only(1.0) });
        let channels = DataChannels::new();
        let system = SystemState::new();
        system.set_mode(OperatingState::Balancing);
        let mut task = ControlTask::new(&pid, &channels, &system);

        push(&channels, 4.0);
        task.tick();
        assert!(task.pid_state().integral != 0.0);

        for mode in [OperatingState::Falling, OperatingState::Idle, OperatingState::Error] {
            system.set_mode(mode);
            push(&channels, 4.0);
            channels.control.take();
            assert_eq!(task.tick(), None);
            assert!(channels.attitude.is_empty());
            assert_eq!(channels.control.get(), None);
            assert_eq!(*task.pid_state(), PidState::default());
        }
    }
}
