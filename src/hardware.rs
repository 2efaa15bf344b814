//! Подключение к плате.
//!
//! | Назначение        | Пины            | Периферия   |
//! |-------------------|-----------------|-------------|
//! | IMU SDA / SCL     | GPIO4 / GPIO5   | I2C0        |
//! | Левый мотор A/B   | GPIO10 / GPIO11 | PWM slice 5 |
//! | Правый мотор A/B  | GPIO12 / GPIO13 | PWM slice 6 |
//! | Светодиод статуса | GPIO25          |             |

/// Частота шины IMU (fast mode).
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// Helper macro to create interrupt executors.
macro_rules! interrupt_executor {
    ($interrupt:ident, $prio:ident) => {{
        use embassy_executor::InterruptExecutor;
        use embassy_rp::interrupt;
        use embassy_rp::interrupt::{InterruptExt, Priority};

        interrupt::$interrupt.set_priority(Priority::$prio);
        static EXECUTOR: InterruptExecutor = InterruptExecutor::new();
        let spawner = EXECUTOR.start(interrupt::$interrupt);

        #[interrupt]
        #[allow(non_snake_case)]
        unsafe fn $interrupt() {
            EXECUTOR.on_interrupt()
        }

        spawner
    }};
}
