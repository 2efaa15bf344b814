#![cfg_attr(not(test), no_std)]

//! Ядро управления двухколёсного балансирующего робота.
//!
//! Ядро объединяет показания IMU в оценку тангажа, считает по ней ПИД и
//! через автомат безопасности решает, может ли выход ПИД попасть на моторы.
//! К железу обращается только через трейты [`sensors::ImuSource`] и
//! [`control::motor::Actuator`], поэтому одно и то же ядро работает и в
//! тестах на хосте, и в прошивке RP2040.

// Должен идти первым: макросы логирования видны только ниже по тексту.
mod fmt;

pub mod config;
pub mod control;
pub mod data;
pub mod error;
pub mod sensors;
pub mod tasks;
pub mod utils;
