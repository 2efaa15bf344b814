#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, Blocking, Config as I2cConfig};
use embassy_rp::peripherals::I2C0;
use embassy_rp::pwm::Pwm;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

#[macro_use]
mod hardware;
mod drivers;

use balancing_robot::config::{calibration, ConfigStore, PidConfig, RamStore, RequestInbox};
use balancing_robot::control::{
    MotorControl, MotorLimits, PidController, SafetyLimits, StateMachine,
};
use balancing_robot::data::{DataChannels, OperatingState, SystemState};
use balancing_robot::sensors::{AttitudeEstimator, ComplementaryFilter};
use balancing_robot::tasks::{
    ActuatorTask, ConfigTask, ControlTask, LogSink, SensorTask, StateTask, TelemetryTask,
};

use crate::drivers::imu::Mpu6050;
use crate::drivers::motor::DualHBridge;
use crate::hardware::I2C_FREQUENCY_HZ;

static CHANNELS: DataChannels = DataChannels::new();
static SYSTEM_STATE: SystemState = SystemState::new();
static PID_CONTROLLER: PidController = PidController::new(PidConfig::DEFAULT);
/// Сюда транспорты (консоль, радио) отправляют обновления ПИД.
static CONFIG_REQUESTS: RequestInbox = RequestInbox::new();

type Imu = Mpu6050<'static, I2C0>;
type Motors = MotorControl<DualHBridge<'static>>;

#[embassy_executor::task]
async fn sensor_task(task: SensorTask<'static, Imu>) {
    task.run().await
}

#[embassy_executor::task]
async fn control_task(task: ControlTask<'static>) {
    task.run().await
}

#[embassy_executor::task]
async fn actuator_task(task: ActuatorTask<'static, DualHBridge<'static>>) {
    task.run().await
}

#[embassy_executor::task]
async fn state_task(task: StateTask<'static>) {
    task.run().await
}

#[embassy_executor::task]
async fn telemetry_task(task: TelemetryTask<'static, LogSink>) {
    task.run().await
}

#[embassy_executor::task]
async fn config_task(task: ConfigTask<'static, &'static RequestInbox, RamStore>) {
    task.run().await
}

/// Точка входа прошивки.
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    defmt::info!("=== Балансирующий робот v{} ===", env!("CARGO_PKG_VERSION"));

    let mut led = Output::new(p.PIN_25, Level::Low);
    for _ in 0..3 {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(100)).await;
    }

    // Сначала моторы, чтобы до конца запуска они стояли на нуле.
    let mut motors: Motors = MotorControl::new(
        DualHBridge::new(
            Pwm::new_output_ab(p.PWM_SLICE5, p.PIN_10, p.PIN_11, Default::default()),
            Pwm::new_output_ab(p.PWM_SLICE6, p.PIN_12, p.PIN_13, Default::default()),
        ),
        MotorLimits::DEFAULT,
    );
    if motors.stop().is_err() {
        defmt::warn!("Не удалось остановить моторы при запуске");
    }

    let i2c: i2c::I2c<'static, I2C0, Blocking> = {
        let mut config = I2cConfig::default();
        config.frequency = I2C_FREQUENCY_HZ;
        i2c::I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, config)
    };

    let mut store = RamStore::default();
    let stored = store.load().unwrap_or(PidConfig::DEFAULT);
    if let Err(e) = PID_CONTROLLER.set_config(stored) {
        defmt::warn!("Сохранённая конфигурация ПИД некорректна ({}), используются значения по умолчанию", e);
    }
    let active = PID_CONTROLLER.config();

    let imu = match Mpu6050::new(i2c).await {
        Ok(imu) => imu,
        Err(e) => {
            defmt::error!("Ошибка инициализации IMU: {}", e);
            halt(led, motors).await
        }
    };

    let mut estimator = AttitudeEstimator::new(imu, ComplementaryFilter::default());
    if let Err(e) = estimator
        .calibrate_bias(store.calibration_samples(), calibration::SAMPLE_INTERVAL)
        .await
    {
        defmt::error!("Ошибка калибровки гироскопа: {}", e);
        halt(led, motors).await
    }

    defmt::info!("Запуск задач");

    // Контуры управления вытесняют всё остальное.
    let high = interrupt_executor!(SWI_IRQ_1, P2);
    high.spawn(sensor_task(SensorTask::new(estimator, &CHANNELS, &SYSTEM_STATE)))
        .unwrap();
    high.spawn(state_task(StateTask::new(
        StateMachine::new(&SYSTEM_STATE, SafetyLimits::DEFAULT, active.target_angle),
        &PID_CONTROLLER,
        &CHANNELS,
        &SYSTEM_STATE,
    )))
    .unwrap();
    high.spawn(control_task(ControlTask::new(&PID_CONTROLLER, &CHANNELS, &SYSTEM_STATE)))
        .unwrap();
    high.spawn(actuator_task(ActuatorTask::new(motors, &CHANNELS, &SYSTEM_STATE)))
        .unwrap();

    spawner
        .spawn(telemetry_task(TelemetryTask::new(LogSink, &CHANNELS, &SYSTEM_STATE)))
        .unwrap();
    spawner
        .spawn(config_task(ConfigTask::new(&CONFIG_REQUESTS, store, &CHANNELS, active)))
        .unwrap();

    // Индикация: горит при балансировке, медленно мигает в IDLE, быстро при ошибках.
    let mut tick: u32 = 0;
    loop {
        let on = match SYSTEM_STATE.mode() {
            OperatingState::Balancing => true,
            OperatingState::Idle => tick % 10 < 5,
            OperatingState::Falling | OperatingState::Error => tick % 2 == 0,
            OperatingState::Init => false,
        };
        led.set_level(if on { Level::High } else { Level::Low });
        tick = tick.wrapping_add(1);
        Timer::after(Duration::from_millis(100)).await;
    }
}

/// Запуск не удался: моторы на нуле, бесконечно мигаем.
async fn halt(mut led: Output<'static>, mut motors: Motors) -> ! {
    let _ = motors.stop();
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(50)).await;
    }
}
