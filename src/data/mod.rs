// src/data/mod.rs
pub mod channel;

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;

use crate::config::system::ATTITUDE_QUEUE_DEPTH;
use crate::config::PidConfig;
use channel::{Fifo, Mailbox};

/// Оценка ориентации в градусах.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeSample {
    pub pitch: f32,
    pub roll: f32, // не оценивается, передаётся как есть
    pub yaw: f32,  // не оценивается, передаётся как есть
    pub timestamp: Instant,
}

impl AttitudeSample {
    pub const fn level(timestamp: Instant) -> Self {
        Self {
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
            timestamp,
        }
    }
}

/// Последний выход ПИД в пределах настроенного диапазона.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlOutput {
    pub output: f32,
}

impl ControlOutput {
    /// Безопасная команда.
    pub const ZERO: Self = Self { output: 0.0 };
}

/// Снимок состояния для телеметрии.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    pub attitude: AttitudeSample,
    pub control: ControlOutput,
    pub motor_speed: f32,
    pub state: OperatingState,
}

/// Состояние безопасности робота.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OperatingState {
    Init = 0,
    Idle = 1,
    Balancing = 2,
    Falling = 3,
    Error = 4,
}

impl OperatingState {
    /// Неизвестные значения отображаются в `Error`.
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Init,
            1 => Self::Idle,
            2 => Self::Balancing,
            3 => Self::Falling,
            _ => Self::Error,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Idle => "IDLE",
            Self::Balancing => "BALANCING",
            Self::Falling => "FALLING",
            Self::Error => "ERROR",
        }
    }
}

/// Событие безопасности от задачи для автомата состояний.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm {
    /// Задача датчиков измерила тангаж за порогом падения.
    Fall { pitch: f32 },
    /// Слишком много ошибок чтения IMU подряд.
    SensorFault,
    /// Управление мотором получило неконечную команду.
    UnsafeCommand,
    /// Привод сообщил об ошибке.
    ActuatorFault,
}

impl Alarm {
    /// Аварии неисправности ведут в ERROR и важнее аварий падения.
    pub const fn is_fault(&self) -> bool {
        matches!(self, Alarm::SensorFault | Alarm::ActuatorFault)
    }
}

/// Общее состояние всех задач (чтение без блокировки).
pub struct SystemState {
    mode: AtomicU8,
    /// Держится задачей датчиков, пока IMU не отвечает.
    sensor_fault: AtomicBool,
    /// Последняя необработанная авария, неисправности в приоритете.
    pub alarms: Signal<CriticalSectionRawMutex, Alarm>,
}

impl SystemState {
    pub const fn new() -> Self {
        Self {
            mode: AtomicU8::new(OperatingState::Init as u8),
            sensor_fault: AtomicBool::new(false),
            alarms: Signal::new(),
        }
    }

    pub fn mode(&self) -> OperatingState {
        OperatingState::from_u8(self.mode.load(Ordering::Acquire))
    }

    // Режим публикует только автомат состояний.
    pub(crate) fn set_mode(&self, mode: OperatingState) {
        self.mode.store(mode as u8, Ordering::Release);
    }

    pub fn sensor_fault(&self) -> bool {
        self.sensor_fault.load(Ordering::Acquire)
    }

    pub(crate) fn set_sensor_fault(&self, faulted: bool) {
        self.sensor_fault.store(faulted, Ordering::Release);
    }

    /// Ожидающая авария неисправности не затирается обычной.
    pub fn raise(&self, alarm: Alarm) {
        let keep = match self.alarms.try_take() {
            Some(pending) if pending.is_fault() && !alarm.is_fault() => pending,
            _ => alarm,
        };
        self.alarms.signal(keep);
    }

    pub fn take_alarm(&self) -> Option<Alarm> {
        self.alarms.try_take()
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new()
    }
}

/// Каналы между задачами.
pub struct DataChannels {
    // датчики -> ПИД (с извлечением), автомат и телеметрия (наблюдение)
    pub attitude: Fifo<AttitudeSample, ATTITUDE_QUEUE_DEPTH>,
    // ПИД / автомат -> моторы, телеметрия
    pub control: Mailbox<ControlOutput>,
    // моторы -> телеметрия
    pub motor_speed: Mailbox<f32>,
    // задача конфигурации -> автомат
    pub config: Mailbox<PidConfig>,
}

impl DataChannels {
    pub const fn new() -> Self {
        Self {
            attitude: Fifo::new(),
            control: Mailbox::new(),
            motor_speed: Mailbox::new(),
            config: Mailbox::new(),
        }
    }
}

impl Default for DataChannels {
    fn default() -> Self {
        Self::new()
    }
}
