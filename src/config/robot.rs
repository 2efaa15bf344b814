//! Постоянные параметры балансирующего робота.

/// Периоды задач.
pub mod system {
    use embassy_time::Duration;

    /// Период задачи датчиков (100 Гц). Он же шаг интегрирования
    /// комплементарного фильтра, см. [`super::filters::FUSION_DT_S`].
    pub const SENSOR_PERIOD: Duration = Duration::from_millis(10);

    /// Период задачи ПИД (100 Гц).
    pub const CONTROL_PERIOD: Duration = Duration::from_millis(10);

    /// Период задачи моторов (100 Гц).
    pub const ACTUATOR_PERIOD: Duration = Duration::from_millis(10);

    /// Такт автомата состояний (100 Гц).
    pub const STATE_CHECK_PERIOD: Duration = Duration::from_millis(10);

    /// Период телеметрии (10 Гц).
    pub const TELEMETRY_PERIOD: Duration = Duration::from_millis(100);

    /// Период задачи конфигурации (1 Гц).
    pub const CONFIG_PERIOD: Duration = Duration::from_millis(1000);

    /// Глубина очереди датчики -> ПИД.
    pub const ATTITUDE_QUEUE_DEPTH: usize = 10;

    /// `CONTROL_PERIOD` в секундах, `dt` для ПИД.
    pub const CONTROL_DT_S: f32 = 0.01;

    /// `ACTUATOR_PERIOD` в секундах, шаг ограничения скорости нарастания.
    pub const ACTUATOR_DT_S: f32 = 0.01;
}

/// Пороги блокировки безопасности.
pub mod safety {
    use embassy_time::Duration;

    /// |pitch - target|, ниже которого робот считается вертикальным (градусы).
    pub const BALANCE_THRESHOLD_DEG: f32 = 5.0;

    /// |pitch - target|, выше которого робот падает (градусы).
    pub const FALL_THRESHOLD_DEG: f32 = 45.0;

    /// Время в FALLING с выключенными моторами до повторной проверки наклона.
    pub const FALL_SETTLE: Duration = Duration::from_millis(2000);

    /// Время в ERROR до повторного запуска с INIT.
    pub const ERROR_HOLD: Duration = Duration::from_millis(5000);

    /// Число ошибок чтения IMU подряд, после которого датчик неисправен (1 с).
    pub const SENSOR_FAULT_LIMIT: u32 = 100;
}

/// Слияние данных датчиков.
pub mod filters {
    /// Вес проинтегрированного угла гироскопа в комплементарном фильтре.
    pub const COMPLEMENTARY_ALPHA: f32 = 0.98;

    /// Шаг интегрирования фильтра, связан с `system::SENSOR_PERIOD`.
    pub const FUSION_DT_S: f32 = 0.01;
}

/// Калибровка смещения гироскопа.
pub mod calibration {
    use embassy_time::Duration;

    /// Число отсчётов неподвижного гироскопа по умолчанию.
    pub const DEFAULT_SAMPLES: u16 = 100;

    /// Пауза между отсчётами калибровки.
    pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);
}

/// Формирование выхода на моторы.
pub mod motor {
    /// Выход ПИД, соответствующий полному заполнению в любую сторону.
    pub const FULL_SCALE_OUTPUT: f32 = 100.0;

    /// Наибольшее заполнение, которое уходит на H-мост.
    pub const MAX_SAFE_SPEED: f32 = 0.95;

    /// Наибольшее изменение заполнения в секунду (полная шкала за 50 мс).
    pub const MAX_SLEW_PER_S: f32 = 20.0;

    /// Несущая частота ШИМ на входах H-моста (Гц).
    pub const PWM_FREQUENCY_HZ: u32 = 10_000;
}
