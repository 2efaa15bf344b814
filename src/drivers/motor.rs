//! Два коллекторных мотора на сдвоенном H-мосте (типа TB6612 / L298).
//!
//! Каждый мотор берёт два входа ШИМ с одного слайса: канал A вперёд,
//! канал B назад. Оба колеса получают одинаковое заполнение.

use core::convert::Infallible;

use embassy_rp::clocks::clk_sys_freq;
use embassy_rp::pwm::{Config, Pwm};

use balancing_robot::config::motor::PWM_FREQUENCY_HZ;
use balancing_robot::control::Actuator;
use balancing_robot::utils::math::{abs, constrain};

pub struct DualHBridge<'d> {
    left: Pwm<'d>,
    right: Pwm<'d>,
    config: Config,
}

impl<'d> DualHBridge<'d> {
    /// Принимает два ненастроенных слайса, оба мотора сначала остановлены.
    pub fn new(mut left: Pwm<'d>, mut right: Pwm<'d>) -> Self {
        let mut config = Config::default();
        let top = clk_sys_freq() / PWM_FREQUENCY_HZ - 1;
        config.top = top.min(u16::MAX as u32) as u16;
        config.compare_a = 0;
        config.compare_b = 0;
        left.set_config(&config);
        right.set_config(&config);
        defmt::info!("H-мост: ШИМ {} Гц, top={}", PWM_FREQUENCY_HZ, config.top);
        Self {
            left,
            right,
            config,
        }
    }

    fn apply(&mut self, speed: f32) {
        let duty = (abs(speed) * (self.config.top as f32 + 1.0)) as u16;
        let (forward, reverse) = if speed >= 0.0 { (duty, 0) } else { (0, duty) };
        self.config.compare_a = forward;
        self.config.compare_b = reverse;
        self.left.set_config(&self.config);
        self.right.set_config(&self.config);
    }
}

impl Actuator for DualHBridge<'_> {
    type Error = Infallible;

    fn set_speed(&mut self, speed: f32) -> Result<(), Infallible> {
        // неконечное значение останавливает моторы
        let speed = if speed.is_finite() { constrain(speed, -1.0, 1.0) } else { 0.0 };
        self.apply(speed);

        #[cfg(feature = "debug-actuators")]
        defmt::debug!("H-мост: скорость={}", speed);

        Ok(())
    }
}
