//! Оценка тангажа по [`ImuSource`].

use embassy_time::{Duration, Timer};

use super::fusion::ComplementaryFilter;
use super::ImuSource;
use crate::error::{CalibrationError, SensorReadError};

/// Владеет IMU, смещением гироскопа и фильтром.
pub struct AttitudeEstimator<I> {
    imu: I,
    gyro_bias: f32,
    calibrated: bool,
    filter: ComplementaryFilter,
}

impl<I: ImuSource> AttitudeEstimator<I> {
    pub fn new(imu: I, filter: ComplementaryFilter) -> Self {
        Self {
            imu,
            gyro_bias: 0.0,
            calibrated: false,
            filter,
        }
    }

    /// Усреднить `samples` отсчётов гироскопа по оси тангажа с шагом `interval`.
    ///
    /// Робот должен быть неподвижен. При ошибке остаётся прежнее смещение.
    pub async fn calibrate_bias(
        &mut self,
        samples: u16,
        interval: Duration,
    ) -> Result<f32, CalibrationError> {
        if samples == 0 {
            return Err(CalibrationError::NoSamples);
        }
        info!("Калибровка гироскопа: {} отсчётов, не двигайте робота", samples);

        let mut sum = 0.0f32;
        for sample in 0..samples {
            let rate = self
                .imu
                .read_angular_rate()
                .await
                .map_err(|_| CalibrationError::SensorRead { sample })?;
            sum += rate.y;
            Timer::after(interval).await;
        }

        self.gyro_bias = sum / samples as f32;
        self.calibrated = true;
        info!("Калибровка завершена, смещение тангажа {} град/с", self.gyro_bias);
        Ok(self.gyro_bias)
    }

    /// Новая оценка тангажа по одному чтению IMU, градусы.
    pub async fn estimate_pitch(&mut self, previous: f32) -> Result<f32, SensorReadError> {
        let accel = self
            .imu
            .read_acceleration()
            .await
            .map_err(|_| SensorReadError::Acceleration)?;
        let gyro = self
            .imu
            .read_angular_rate()
            .await
            .map_err(|_| SensorReadError::AngularRate)?;

        let accel_angle = ComplementaryFilter::accel_pitch(&accel);
        let rate = gyro.y - self.gyro_bias;

        #[cfg(feature = "debug-sensors")]
        trace!("imu: accel pitch {} rate {}", accel_angle, rate);

        Ok(self.filter.fuse(previous, accel_angle, rate))
    }

    /// Крен не оценивается.
    pub fn estimate_roll(&self, previous: f32) -> f32 {
        previous
    }

    /// Рыскание не оценивается.
    pub fn estimate_yaw(&self, previous: f32) -> f32 {
        previous
    }

    pub fn gyro_bias(&self) -> f32 {
        self.gyro_bias
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn filter(&self) -> &ComplementaryFilter {
        &self.filter
    }

    pub fn imu_mut(&mut self) -> &mut I {
        &mut self.imu
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::utils::math::deg_to_rad;
    use embassy_futures::block_on;
    use nalgebra::Vector3;

    /// Неподвижный робот с наклоном `angle` градусов и постоянным смещением гироскопа.
    pub(crate) struct FakeImu {
        pub angle: f32,
        pub bias: f32,
        pub fail_accel: bool,
        pub fail_gyro_after: Option<u32>,
        pub gyro_reads: u32,
    }

    impl FakeImu {
        pub(crate) fn tilted(angle: f32, bias: f32) -> Self {
            Self {
                angle,
                bias,
                fail_accel: false,
                fail_gyro_after: None,
                gyro_reads: 0,
            }
        }
    }

    impl ImuSource for FakeImu {
        type Error = ();

        async fn read_acceleration(&mut self) -> Result<Vector3<f32>, ()> {
            if self.fail_accel {
                return Err(());
            }
            let theta = deg_to_rad(self.angle);
            Ok(Vector3::new(-libm::sinf(theta), 0.0, libm::cosf(theta)))
        }

        async fn read_angular_rate(&mut self) -> Result<Vector3<f32>, ()> {
            if let Some(limit) = self.fail_gyro_after {
                if self.gyro_reads >= limit {
                    return Err(());
                }
            }
            self.gyro_reads += 1;
            Ok(Vector3::new(0.3, self.bias, -0.2))
        }
    }

    const NO_WAIT: Duration = Duration::from_ticks(0);

    #[test]
    fn test_calibration_averages_pitch_axis() {
        let mut est = AttitudeEstimator::new(FakeImu::tilted(0.0, 1.5), ComplementaryFilter::default());
        assert!(!est.is_calibrated());

        let bias = block_on(est.calibrate_bias(20, NO_WAIT)).unwrap();
        assert!((bias - 1.5).abs() < 1e-5);
        assert!((est.gyro_bias() - 1.5).abs() < 1e-5);
        assert!(est.is_calibrated());
    }

    #[test]
    fn test_calibration_zero_samples() {
        let mut est = AttitudeEstimator::new(FakeImu::tilted(0.0, 1.5), ComplementaryFilter::default());
        assert_eq!(block_on(est.calibrate_bias(0, NO_WAIT)), Err(CalibrationError::NoSamples));
        assert!(!est.is_calibrated());
    }

    #[test]
    fn test_calibration_read_failure_keeps_bias() {
        let mut imu = FakeImu::tilted(0.0, 1.5);
        imu.fail_gyro_after = Some(3);
        let mut est = AttitudeEstimator::new(imu, ComplementaryFilter::default());

        assert_eq!(
            block_on(est.calibrate_bias(10, NO_WAIT)),
            Err(CalibrationError::SensorRead { sample: 3 })
        );
        assert_eq!(est.gyro_bias(), 0.0);
        assert!(!est.is_calibrated());
    }

    #[test]
    fn test_converges_to_true_angle_after_calibration() {
        for start in [-60.0, 0.0, 60.0] {
            let mut est =
                AttitudeEstimator::new(FakeImu::tilted(10.0, 2.0), ComplementaryFilter::default());
            block_on(est.calibrate_bias(50, NO_WAIT)).unwrap();

            let mut pitch = start;
            for _ in 0..600 {
                pitch = block_on(est.estimate_pitch(pitch)).unwrap();
            }
            assert!((pitch - 10.0).abs() < 0.05, "start = {}, pitch = {}", start, pitch);
        }
    }

    #[test]
    fn test_uncalibrated_bias_leaves_offset() {
        let mut est = AttitudeEstimator::new(FakeImu::tilted(0.0, 2.0), ComplementaryFilter::default());

        let mut pitch = 0.0;
        for _ in 0..600 {
            pitch = block_on(est.estimate_pitch(pitch)).unwrap();
        }
        // Установившееся значение: alpha * bias * dt / (1 - alpha) = 0.98 град
        assert!((pitch - 0.98).abs() < 0.05, "pitch = {}", pitch);
    }

    #[test]
    fn test_read_errors_are_reported() {
        let mut imu = FakeImu::tilted(0.0, 0.0);
        imu.fail_accel = true;
        let mut est = AttitudeEstimator::new(imu, ComplementaryFilter::default());
        assert_eq!(block_on(est.estimate_pitch(3.0)), Err(SensorReadError::Acceleration));

        let mut imu = FakeImu::tilted(0.0, 0.0);
        imu.fail_gyro_after = Some(0);
        let mut est = AttitudeEstimator::new(imu, ComplementaryFilter::default());
        assert_eq!(block_on(est.estimate_pitch(3.0)), Err(SensorReadError::AngularRate));
    }

    #[test]
    fn test_roll_and_yaw_pass_through() {
        let est = AttitudeEstimator::new(FakeImu::tilted(0.0, 0.0), ComplementaryFilter::default());
        assert_eq!(est.estimate_roll(4.5), 4.5);
        assert_eq!(est.estimate_yaw(-12.0), -12.0);
    }
}
