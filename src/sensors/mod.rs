pub mod estimator;
pub mod fusion;

use nalgebra::Vector3;

pub use estimator::AttitudeEstimator;
pub use fusion::ComplementaryFilter;

/// Инерциальный датчик с точки зрения оценщика.
///
/// Оси: X вперёд, Y вдоль оси колёс (ось тангажа), Z вверх.
/// Перевод в физические единицы делает драйвер.
#[allow(async_fn_in_trait)]
pub trait ImuSource {
    type Error;

    /// Удельная сила в любых согласованных единицах (драйвер MPU6050 отдаёт g).
    async fn read_acceleration(&mut self) -> Result<Vector3<f32>, Self::Error>;

    /// Угловая скорость в градусах в секунду.
    async fn read_angular_rate(&mut self) -> Result<Vector3<f32>, Self::Error>;
}
