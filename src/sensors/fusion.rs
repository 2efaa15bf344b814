//! Комплементарный фильтр по оси тангажа.

use nalgebra::Vector3;

use crate::config::filters::{COMPLEMENTARY_ALPHA, FUSION_DT_S};
use crate::utils::math::{rad_to_deg, safe_sqrt};

/// Смешивает проинтегрированную скорость гироскопа (точна на коротком
/// интервале) с наклоном по акселерометру (точен на длинном).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplementaryFilter {
    /// Вес гироскопа, 0..1.
    alpha: f32,
    /// Шаг интегрирования в секундах.
    dt: f32,
}

impl ComplementaryFilter {
    pub const fn new(alpha: f32, dt: f32) -> Self {
        Self { alpha, dt }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Тангаж только по гравитации, градусы.
    pub fn accel_pitch(accel: &Vector3<f32>) -> f32 {
        let horizontal = safe_sqrt(accel.y * accel.y + accel.z * accel.z);
        rad_to_deg(libm::atan2f(-accel.x, horizontal))
    }

    /// Один шаг фильтра. `rate` скорость тангажа без смещения, град/с.
    pub fn fuse(&self, previous: f32, accel_angle: f32, rate: f32) -> f32 {
        self.alpha * (previous + rate * self.dt) + (1.0 - self.alpha) * accel_angle
    }
}

impl Default for ComplementaryFilter {
    fn default() -> Self {
        Self::new(COMPLEMENTARY_ALPHA, FUSION_DT_S)
    }
}
