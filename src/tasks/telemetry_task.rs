use embassy_time::{Instant, Ticker};

use crate::config::system::TELEMETRY_PERIOD;
use crate::data::{AttitudeSample, ControlOutput, DataChannels, SystemState, TelemetryRecord};

/// Получатель записей телеметрии. Не должен блокироваться.
pub trait TelemetrySink {
    fn publish(&mut self, record: &TelemetryRecord);
}

/// Публикует записи в лог.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn publish(&mut self, record: &TelemetryRecord) {
        info!(
            "Телеметрия: состояние={} тангаж={} выход={} скорость={}",
            record.state.as_str(),
            record.attitude.pitch,
            record.control.output,
            record.motor_speed
        );
    }
}

/// Снимает состояние каналов с низкой частотой.
pub struct TelemetryTask<'a, S> {
    sink: S,
    channels: &'a DataChannels,
    system: &'a SystemState,
}

impl<'a, S: TelemetrySink> TelemetryTask<'a, S> {
    pub fn new(sink: S, channels: &'a DataChannels, system: &'a SystemState) -> Self {
        Self {
            sink,
            channels,
            system,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Собрать и опубликовать запись. Пустые каналы дают значения по умолчанию.
    pub fn tick(&mut self, now: Instant) -> TelemetryRecord {
        let attitude = match self.channels.attitude.observe() {
            Some(sample) => sample,
            None => {
                debug!("Телеметрия: ориентации ещё нет");
                AttitudeSample::level(now)
            }
        };
        let control = self.channels.control.get().unwrap_or(ControlOutput::ZERO);
        let motor_speed = self.channels.motor_speed.get().unwrap_or(0.0);

        let record = TelemetryRecord {
            attitude,
            control,
            motor_speed,
            state: self.system.mode(),
        };
        self.sink.publish(&record);
        record
    }

    pub async fn run(mut self) -> ! {
        info!("Запуск задачи телеметрии");
        let mut ticker = Ticker::every(TELEMETRY_PERIOD);
        loop {
            ticker.next().await;
            self.tick(Instant::now());
        }
    }
}
