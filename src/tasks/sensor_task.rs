use embassy_time::{Instant, Ticker};

use crate::config::safety::{FALL_THRESHOLD_DEG, SENSOR_FAULT_LIMIT};
use crate::config::system::SENSOR_PERIOD;
use crate::data::{Alarm, AttitudeSample, DataChannels, SystemState};
use crate::sensors::{AttitudeEstimator, ImuSource};
use crate::utils::math::abs;

/// Читает IMU и заполняет очередь ориентации.
pub struct SensorTask<'a, I> {
    estimator: AttitudeEstimator<I>,
    channels: &'a DataChannels,
    system: &'a SystemState,
    last: AttitudeSample,
    /// Ошибки чтения подряд.
    failures: u32,
    fault_raised: bool,
}

impl<'a, I: ImuSource> SensorTask<'a, I> {
    pub fn new(
        estimator: AttitudeEstimator<I>,
        channels: &'a DataChannels,
        system: &'a SystemState,
    ) -> Self {
        Self {
            estimator,
            channels,
            system,
            last: AttitudeSample::level(Instant::from_ticks(0)),
            failures: 0,
            fault_raised: false,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn estimator_mut(&mut self) -> &mut AttitudeEstimator<I> {
        &mut self.estimator
    }

    /// Один период датчиков. При ошибке чтения повторно публикуется
    /// предыдущая оценка.
    pub async fn tick(&mut self, now: Instant) -> AttitudeSample {
        let pitch = match self.estimator.estimate_pitch(self.last.pitch).await {
            Ok(pitch) => {
                if self.fault_raised {
                    info!("IMU восстановлен после {} ошибок чтения", self.failures);
                    self.system.set_sensor_fault(false);
                }
                self.failures = 0;
                self.fault_raised = false;
                pitch
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures == 1 {
                    warn!("Ошибка чтения IMU: {}", e);
                }
                if self.failures >= SENSOR_FAULT_LIMIT && !self.fault_raised {
                    error!("IMU: {} ошибок чтения подряд", self.failures);
                    self.system.set_sensor_fault(true);
                    self.system.raise(Alarm::SensorFault);
                    self.fault_raised = true;
                }
                self.last.pitch
            }
        };

        let sample = AttitudeSample {
            pitch,
            roll: self.estimator.estimate_roll(self.last.roll),
            yaw: self.estimator.estimate_yaw(self.last.yaw),
            timestamp: now,
        };
        self.last = sample;

        // Независимо от проверки падения в автомате.
        if abs(pitch) > FALL_THRESHOLD_DEG {
            self.system.raise(Alarm::Fall { pitch });
        }

        if self.channels.attitude.try_push(sample).is_err() {
            warn!("Очередь ориентации переполнена, отсчёт отброшен");
        }

        #[cfg(feature = "debug-sensors")]
        debug!("Ориентация: тангаж={}", pitch);

        sample
    }

    pub async fn run(mut self) -> ! {
        info!("Запуск задачи датчиков");
        let mut ticker = Ticker::every(SENSOR_PERIOD);
        loop {
            ticker.next().await;
            self.tick(Instant::now()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::estimator::tests::FakeImu;
    use crate::sensors::ComplementaryFilter;
    use embassy_futures::block_on;

    fn task<'a>(
        imu: FakeImu,
        channels: &'a DataChannels,
        system: &'a SystemState,
    ) -> SensorTask<'a, FakeImu> {
        SensorTask::new(
            AttitudeEstimator::new(imu, ComplementaryFilter::default()),
            channels,
            system,
        )
    }

    #[test]
    fn test_publishes_samples() {
        let channels = DataChannels::new();
        let system = SystemState::new();
        let mut task = task(FakeImu::tilted(10.0, 0.0), &channels, &system);

        let s = block_on(task.tick(Instant::from_millis(10)));
        assert!(s.pitch > 0.0 && s.pitch < 10.0);
        assert_eq!(s.timestamp, Instant::from_millis(10));
        assert_eq!(channels.attitude.try_pop(), Some(s));
        assert_eq!(system.take_alarm(), None);
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let channels = DataChannels::new();
        let system = SystemState::new();
        let mut task = task(FakeImu::tilted(0.0, 0.0), &channels, &system);

        let cap = channels.attitude.capacity();
        for i in 0..cap + 3 {
            block_on(task.tick(Instant::from_millis(i as u64)));
        }
        assert_eq!(channels.attitude.len(), cap);
        assert_eq!(channels.attitude.peek().unwrap().timestamp, Instant::from_millis(0));
    }

    #[test]
    fn test_read_failure_reuses_previous_estimate() {
        let channels = DataChannels::new();
        let system = SystemState::new();
        let mut task = task(FakeImu::tilted(20.0, 0.0), &channels, &system);

        let first = block_on(task.tick(Instant::from_millis(10)));
        task.estimator_mut().imu_mut().fail_accel = true;
        let second = block_on(task.tick(Instant::from_millis(20)));
        assert_eq!(second.pitch, first.pitch);
        assert_eq!(second.timestamp, Instant::from_millis(20));
        assert_eq!(task.failures(), 1);
    }

    #[test]
    fn test_failure_streak_raises_sensor_fault_once() {
        let channels = DataChannels::new();
        let system = SystemState::new();
        let mut imu = FakeImu::tilted(0.0, 0.0);
        imu.fail_accel = true;
        let mut task = task(imu, &channels, &system);

        for i in 0..SENSOR_FAULT_LIMIT - 1 {
            block_on(task.tick(Instant::from_millis(i as u64)));
            channels.attitude.clear();
        }
        assert_eq!(system.take_alarm(), None);

        assert!(!system.sensor_fault());

        block_on(task.tick(Instant::from_millis(1000)));
        assert_eq!(system.take_alarm(), Some(Alarm::SensorFault));
        assert!(system.sensor_fault());

        // Авария срабатывает один раз, флаг неисправности остаётся.
        block_on(task.tick(Instant::from_millis(1010)));
        assert_eq!(system.take_alarm(), None);
        assert!(system.sensor_fault());

        // Удачное чтение прерывает серию.
        task.estimator_mut().imu_mut().fail_accel = false;
        block_on(task.tick(Instant::from_millis(1020)));
        assert_eq!(task.failures(), 0);
        assert!(!system.sensor_fault());
    }

    #[test]
    fn test_large_pitch_raises_fall_alarm() {
        let channels = DataChannels::new();
        let system = SystemState::new();
        let mut task = task(FakeImu::tilted(80.0, 0.0), &channels, &system);

        // Сходимся за порог падения.
        let mut alarm = None;
        for i in 0..200 {
            block_on(task.tick(Instant::from_millis(i)));
            channels.attitude.clear();
            alarm = alarm.or(system.take_alarm());
        }
        match alarm {
            Some(Alarm::Fall { pitch }) => assert!(pitch > FALL_THRESHOLD_DEG),
            other => panic!("expected fall alarm, got {:?}", other),
        }
    }
}
