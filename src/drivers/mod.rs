//! Драйверы платы за трейтами ядра.

pub mod imu;
pub mod motor;
