//! Периодические задачи.
//!
//! Каждая задача это структура с `tick`, выполняющим один период работы,
//! и циклом `run`, который вызывает его по [`embassy_time::Ticker`].
//! Прошивка оборачивает каждый `run` в `#[embassy_executor::task]`.

pub mod actuator_task;
pub mod config_task;
pub mod control_task;
pub mod sensor_task;
pub mod state_task;
pub mod telemetry_task;

pub use actuator_task::ActuatorTask;
pub use config_task::ConfigTask;
pub use control_task::ControlTask;
pub use sensor_task::SensorTask;
pub use state_task::StateTask;
pub use telemetry_task::{LogSink, TelemetrySink, TelemetryTask};
