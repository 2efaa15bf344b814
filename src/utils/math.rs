//! Математические функции для оценщика, ПИД и управления моторами.

use core::f32::consts::PI;

/// Ограничить `value` диапазоном `[min, max]`.
///
/// В отличие от `f32::clamp` не паникует. `min <= max` проверяет вызывающий,
/// NaN проходит без изменений.
#[inline(always)]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Модуль числа без `std`.
#[inline(always)]
pub fn abs(value: f32) -> f32 {
    libm::fabsf(value)
}

#[inline(always)]
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * (PI / 180.0)
}

#[inline(always)]
pub fn rad_to_deg(rad: f32) -> f32 {
    rad * (180.0 / PI)
}

/// Квадратный корень, 0 для неположительных значений.
#[inline]
pub fn safe_sqrt(value: f32) -> f32 {
    if value <= 0.0 {
        0.0
    } else {
        libm::sqrtf(value)
    }
}

/// Сдвинуть `current` к `target` не больше чем на `max_change`.
#[inline]
pub fn slew_toward(current: f32, target: f32, max_change: f32) -> f32 {
    let diff = target - current;
    if abs(diff) <= max_change {
        target
    } else if diff > 0.0 {
        current + max_change
    } else {
        current - max_change
    }
}

/// Угловое расстояние от `angle` до `target` в тех же единицах.
#[inline]
pub fn deviation(angle: f32, target: f32) -> f32 {
    abs(angle - target)
}
