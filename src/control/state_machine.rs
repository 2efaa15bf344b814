//! Автомат состояний безопасности.
//!
//! Только он решает, может ли выход ПИД попасть на моторы.
//! [`StateMachine::step`] это функция перехода на один такт от текущего
//! времени, последней оценки ориентации и последней аварии.

use embassy_time::{Duration, Instant};

use super::pid::PidController;
use crate::config::safety;
use crate::config::PidConfig;
use crate::data::{Alarm, AttitudeSample, OperatingState, SystemState};
use crate::error::ConfigError;
use crate::utils::math::deviation;

/// Пороги автомата состояний.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyLimits {
    /// Зона вертикали вокруг уставки, градусы.
    pub balance_threshold: f32,
    /// Отклонение, считающееся падением, градусы.
    pub fall_threshold: f32,
    pub fall_settle: Duration,
    pub error_hold: Duration,
}

impl SafetyLimits {
    pub const DEFAULT: Self = Self {
        balance_threshold: safety::BALANCE_THRESHOLD_DEG,
        fall_threshold: safety::FALL_THRESHOLD_DEG,
        fall_settle: safety::FALL_SETTLE,
        error_hold: safety::ERROR_HOLD,
    };
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Что должны сделать моторы после такта.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorDirective {
    /// Выход ПИД может попасть на привод.
    Release,
    /// Принудительно обнулить выход регулятора.
    HoldZero,
}

pub struct StateMachine<'a> {
    system: &'a SystemState,
    limits: SafetyLimits,
    target_angle: f32,
    state: OperatingState,
    entered_at: Option<Instant>,
}

impl<'a> StateMachine<'a> {
    pub fn new(system: &'a SystemState, limits: SafetyLimits, target_angle: f32) -> Self {
        system.set_mode(OperatingState::Init);
        Self {
            system,
            limits,
            target_angle,
            state: OperatingState::Init,
            entered_at: None,
        }
    }

    pub fn state(&self) -> OperatingState {
        self.state
    }

    pub fn target_angle(&self) -> f32 {
        self.target_angle
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    /// Передать `config` регулятору и запомнить уставку.
    ///
    /// Та же конфигурация ничего не меняет. Отклонённая не трогает ни
    /// регулятор, ни сохранённую уставку.
    pub fn apply_config(
        &mut self,
        config: PidConfig,
        controller: &PidController,
    ) -> Result<(), ConfigError> {
        if controller.config() == config && self.target_angle == config.target_angle {
            return Ok(());
        }
        if let Err(e) = controller.set_config(config) {
            warn!("Конфигурация ПИД отклонена: {}", e);
            return Err(e);
        }
        self.target_angle = config.target_angle;
        info!(
            "Конфигурация ПИД применена: kp={} ki={} kd={} target={}",
            config.kp,
            config.ki,
            config.kd,
            config.target_angle
        );
        Ok(())
    }

    /// Один такт логики безопасности.
    pub fn step(
        &mut self,
        now: Instant,
        attitude: Option<AttitudeSample>,
        alarm: Option<Alarm>,
    ) -> MotorDirective {
        let deviation = attitude.map(|s| deviation(s.pitch, self.target_angle));
        // Пока IMU не отвечает, данные устаревшие.
        let sensor_fault = self.system.sensor_fault();

        match self.state {
            OperatingState::Init => {
                if let Some(alarm) = alarm {
                    debug!("Авария в INIT пропущена: {}", alarm_name(&alarm));
                }
                self.transition(OperatingState::Idle, now);
                MotorDirective::HoldZero
            }
            OperatingState::Idle => match alarm {
                Some(Alarm::SensorFault) | Some(Alarm::ActuatorFault) => {
                    self.alarm_transition(alarm, OperatingState::Error, now);
                    MotorDirective::HoldZero
                }
                _ if sensor_fault => {
                    error!("Неисправность IMU, балансировка запрещена");
                    self.transition(OperatingState::Error, now);
                    MotorDirective::HoldZero
                }
                _ => match deviation {
                    Some(d) if d < self.limits.balance_threshold => {
                        self.transition(OperatingState::Balancing, now);
                        MotorDirective::Release
                    }
                    _ => MotorDirective::HoldZero,
                },
            },
            OperatingState::Balancing => match alarm {
                Some(Alarm::Fall { .. }) | Some(Alarm::UnsafeCommand) => {
                    self.alarm_transition(alarm, OperatingState::Falling, now);
                    MotorDirective::HoldZero
                }
                Some(Alarm::SensorFault) | Some(Alarm::ActuatorFault) => {
                    self.alarm_transition(alarm, OperatingState::Error, now);
                    MotorDirective::HoldZero
                }
                None if sensor_fault => {
                    error!("Неисправность IMU во время балансировки");
                    self.transition(OperatingState::Error, now);
                    MotorDirective::HoldZero
                }
                None => match deviation {
                    Some(d) if d > self.limits.fall_threshold => {
                        error!("Обнаружено падение: отклонение {} град", d);
                        self.transition(OperatingState::Falling, now);
                        MotorDirective::HoldZero
                    }
                    _ => MotorDirective::Release,
                },
            },
            OperatingState::Falling => {
                if self.elapsed(now) >= self.limits.fall_settle {
                    match deviation {
                        Some(d) if d < self.limits.balance_threshold && !sensor_fault => {
                            self.transition(OperatingState::Idle, now)
                        }
                        _ => self.transition(OperatingState::Error, now),
                    }
                }
                MotorDirective::HoldZero
            }
            OperatingState::Error => {
                if self.elapsed(now) >= self.limits.error_hold {
                    self.transition(OperatingState::Init, now);
                }
                MotorDirective::HoldZero
            }
        }
    }

    fn elapsed(&self, now: Instant) -> Duration {
        match self.entered_at {
            Some(entered) => now.saturating_duration_since(entered),
            None => Duration::from_ticks(0),
        }
    }

    fn alarm_transition(&mut self, alarm: Option<Alarm>, to: OperatingState, now: Instant) {
        if let Some(alarm) = alarm {
            error!("Авария {} в {}", alarm_name(&alarm), self.state.as_str());
        }
        self.transition(to, now);
    }

    fn transition(&mut self, to: OperatingState, now: Instant) {
        info!("Состояние {} -> {}", self.state.as_str(), to.as_str());
        self.state = to;
        self.entered_at = Some(now);
        self.system.set_mode(to);
    }
}

fn alarm_name(alarm: &Alarm) -> &'static str {
    match alarm {
        Alarm::Fall { .. } => "fall",
        Alarm::SensorFault => "sensor fault",
        Alarm::UnsafeCommand => "unsafe command",
        Alarm::ActuatorFault => "actuator fault",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn sample(pitch: f32, ms: u64) -> Option<AttitudeSample> {
        Some(AttitudeSample {
            pitch,
            roll: 0.0,
            yaw: 0.0,
            timestamp: at(ms),
        })
    }

    /// Автомат, уже вышедший из INIT.
    fn idle(system: &SystemState) -> StateMachine<'_> {
        let mut sm = StateMachine::new(system, SafetyLimits::DEFAULT, 0.0);
        assert_eq!(sm.step(at(0), None, None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Idle);
        sm
    }

    #[test]
    fn test_init_goes_idle() {
        let system = SystemState::new();
        let sm = idle(&system);
        assert_eq!(system.mode(), OperatingState::Idle);
        assert_eq!(sm.target_angle(), 0.0);
    }

    #[test]
    fn test_idle_waits_for_upright() {
        let system = SystemState::new();
        let mut sm = idle(&system);
        assert_eq!(sm.step(at(10), None, None), MotorDirective::HoldZero);
        assert_eq!(sm.step(at(20), sample(12.0, 20), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Idle);
        // Ровно на пороге робот не вертикален.
        assert_eq!(sm.step(at(30), sample(5.0, 30), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Idle);
    }

    #[test]
    fn test_fall_and_recovery() {
        let system = SystemState::new();
        let mut sm = idle(&system);

        assert_eq!(sm.step(at(10), sample(3.0, 10), None), MotorDirective::Release);
        assert_eq!(sm.state(), OperatingState::Balancing);
        assert_eq!(system.mode(), OperatingState::Balancing);

        assert_eq!(sm.step(at(20), sample(10.0, 20), None), MotorDirective::Release);

        assert_eq!(sm.step(at(30), sample(50.0, 30), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Falling);
        assert_eq!(system.mode(), OperatingState::Falling);

        // Успокоение: снова вертикален, но слишком рано.
        assert_eq!(sm.step(at(1000), sample(2.0, 1000), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Falling);

        assert_eq!(sm.step(at(2030), sample(2.0, 2030), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Idle);
    }

    #[test]
    fn test_falling_without_recovery_goes_error_then_init() {
        let system = SystemState::new();
        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        sm.step(at(20), sample(-60.0, 20), None);
        assert_eq!(sm.state(), OperatingState::Falling);

        sm.step(at(2020), sample(-60.0, 2020), None);
        assert_eq!(sm.state(), OperatingState::Error);

        assert_eq!(sm.step(at(5000), None, None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Error);

        assert_eq!(sm.step(at(7020), None, None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Init);

        sm.step(at(7030), None, None);
        assert_eq!(sm.state(), OperatingState::Idle);
    }

    #[test]
    fn test_falling_without_sample_goes_error() {
        let system = SystemState::new();
        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        sm.step(at(20), sample(46.0, 20), None);
        sm.step(at(2020), None, None);
        assert_eq!(sm.state(), OperatingState::Error);
    }

    #[test]
    fn test_alarms_while_balancing() {
        let system = SystemState::new();

        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        // Авария важнее нормального на вид отсчёта.
        let d = sm.step(at(20), sample(1.0, 20), Some(Alarm::Fall { pitch: 46.0 }));
        assert_eq!(d, MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Falling);

        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        sm.step(at(20), sample(0.0, 20), Some(Alarm::UnsafeCommand));
        assert_eq!(sm.state(), OperatingState::Falling);

        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        sm.step(at(20), sample(0.0, 20), Some(Alarm::SensorFault));
        assert_eq!(sm.state(), OperatingState::Error);

        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        sm.step(at(20), sample(0.0, 20), Some(Alarm::ActuatorFault));
        assert_eq!(sm.state(), OperatingState::Error);
        assert_eq!(system.mode(), OperatingState::Error);
    }

    #[test]
    fn test_alarms_outside_balancing() {
        let system = SystemState::new();
        let mut sm = idle(&system);
        // Авария падения в IDLE не обрабатывается, моторы и так выключены.
        sm.step(at(10), sample(50.0, 10), Some(Alarm::Fall { pitch: 50.0 }));
        assert_eq!(sm.state(), OperatingState::Idle);

        sm.step(at(20), None, Some(Alarm::SensorFault));
        assert_eq!(sm.state(), OperatingState::Error);

        // Аварии не продлевают выдержку в ERROR.
        sm.step(at(3000), None, Some(Alarm::ActuatorFault));
        assert_eq!(sm.state(), OperatingState::Error);
        sm.step(at(5020), None, None);
        assert_eq!(sm.state(), OperatingState::Init);
    }

    #[test]
    fn test_sensor_fault_blocks_balancing() {
        let system = SystemState::new();
        let mut sm = idle(&system);
        system.set_sensor_fault(true);

        // Вертикален, но отсчёту нельзя доверять.
        assert_eq!(sm.step(at(10), sample(0.0, 10), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Error);

        // После выдержки новая попытка, и снова ошибка, пока неисправность держится.
        sm.step(at(5010), sample(0.0, 5010), None);
        assert_eq!(sm.state(), OperatingState::Init);
        sm.step(at(5020), sample(0.0, 5020), None);
        assert_eq!(sm.state(), OperatingState::Idle);
        assert_eq!(sm.step(at(5030), sample(0.0, 5030), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Error);

        // Датчик снова исправен: обычный запуск.
        system.set_sensor_fault(false);
        sm.step(at(10030), None, None);
        sm.step(at(10040), None, None);
        assert_eq!(sm.step(at(10050), sample(0.0, 10050), None), MotorDirective::Release);
        assert_eq!(sm.state(), OperatingState::Balancing);
    }

    #[test]
    fn test_sensor_fault_level_while_balancing() {
        let system = SystemState::new();
        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        assert_eq!(sm.state(), OperatingState::Balancing);

        // Аварии нет, достаточно одного флага.
        system.set_sensor_fault(true);
        assert_eq!(sm.step(at(20), sample(0.0, 20), None), MotorDirective::HoldZero);
        assert_eq!(sm.state(), OperatingState::Error);
    }

    #[test]
    fn test_falling_does_not_recover_on_faulted_sensor() {
        let system = SystemState::new();
        let mut sm = idle(&system);
        sm.step(at(10), sample(0.0, 10), None);
        sm.step(at(20), sample(50.0, 20), None);
        assert_eq!(sm.state(), OperatingState::Falling);

        system.set_sensor_fault(true);
        sm.step(at(2020), sample(1.0, 2020), None);
        assert_eq!(sm.state(), OperatingState::Error);
    }

    #[test]
    fn test_threshold_uses_target_angle() {
        let system = SystemState::new();
        let mut sm = StateMachine::new(&system, SafetyLimits::DEFAULT, 10.0);
        sm.step(at(0), None, None);
        sm.step(at(10), sample(3.0, 10), None);
        assert_eq!(sm.state(), OperatingState::Idle);
        sm.step(at(20), sample(12.0, 20), None);
        assert_eq!(sm.state(), OperatingState::Balancing);
    }

    #[test]
    fn test_apply_config() {
        let system = SystemState::new();
        let pid = PidController::new(PidConfig::DEFAULT);
        let mut sm = StateMachine::new(&system, SafetyLimits::DEFAULT, 0.0);

        let cfg = PidConfig { target_angle: 1.5, kp: 30.0, ..PidConfig::DEFAULT };
        assert_eq!(sm.apply_config(cfg, &pid), Ok(()));
        assert_eq!(sm.target_angle(), 1.5);
        assert_eq!(pid.config(), cfg);

        // Повторное применение той же конфигурации безвредно.
        assert_eq!(sm.apply_config(cfg, &pid), Ok(()));

        let bad = PidConfig { target_angle: 9.0, output_min: 10.0, output_max: -10.0, ..cfg };
        assert_eq!(sm.apply_config(bad, &pid), Err(ConfigError::OutputLimits));
        assert_eq!(sm.target_angle(), 1.5);
        assert_eq!(pid.config(), cfg);
    }
}
