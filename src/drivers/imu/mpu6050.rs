//! MPU6050 на блокирующем I2C.

use embassy_rp::i2c::{Blocking, Error as I2cError, I2c, Instance};
use embassy_time::{Duration, Timer};
use nalgebra::Vector3;

use balancing_robot::sensors::ImuSource;

/// Адрес на шине по умолчанию (AD0 в нуле).
const MPU6050_ADDR: u8 = 0x68;

#[allow(dead_code)]
mod regs {
    pub const SMPLRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const GYRO_XOUT_H: u8 = 0x43;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const PWR_MGMT_2: u8 = 0x6C;
    pub const WHO_AM_I: u8 = 0x75;
}

#[derive(Debug, Clone, Copy)]
pub enum AccelRange {
    G2 = 0x00,
    G4 = 0x08,
    G8 = 0x10,
    G16 = 0x18,
}

impl AccelRange {
    /// LSB на g.
    const fn scale(self) -> f32 {
        match self {
            AccelRange::G2 => 16384.0,
            AccelRange::G4 => 8192.0,
            AccelRange::G8 => 4096.0,
            AccelRange::G16 => 2048.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum GyroRange {
    Deg250 = 0x00,
    Deg500 = 0x08,
    Deg1000 = 0x10,
    Deg2000 = 0x18,
}

impl GyroRange {
    /// LSB на град/с.
    const fn scale(self) -> f32 {
        match self {
            GyroRange::Deg250 => 131.0,
            GyroRange::Deg500 => 65.5,
            GyroRange::Deg1000 => 32.8,
            GyroRange::Deg2000 => 16.4,
        }
    }
}

#[derive(Debug, defmt::Format)]
pub enum Mpu6050Error {
    I2c(I2cError),
    /// WHO_AM_I вернул другое значение.
    InvalidDevice(u8),
}

impl From<I2cError> for Mpu6050Error {
    fn from(error: I2cError) -> Self {
        Mpu6050Error::I2c(error)
    }
}

/// Драйвер владеет шиной, других устройств на I2C0 нет.
pub struct Mpu6050<'d, I: Instance> {
    i2c: I2c<'d, I, Blocking>,
    addr: u8,
    accel_scale: f32,
    gyro_scale: f32,
}

impl<'d, I: Instance> Mpu6050<'d, I> {
    /// Сброс и настройка: ±4 g, ±500 °/с, DLPF 44 Гц, частота 100 Гц.
    pub async fn new(i2c: I2c<'d, I, Blocking>) -> Result<Self, Mpu6050Error> {
        let mut mpu = Self {
            i2c,
            addr: MPU6050_ADDR,
            accel_scale: AccelRange::G2.scale(),
            gyro_scale: GyroRange::Deg250.scale(),
        };
        mpu.init().await?;
        Ok(mpu)
    }

    async fn init(&mut self) -> Result<(), Mpu6050Error> {
        let who_am_i = self.read_register(regs::WHO_AM_I)?;
        if who_am_i != 0x68 && who_am_i != 0x72 {
            defmt::error!("MPU6050: неожиданный WHO_AM_I 0x{:02x}", who_am_i);
            return Err(Mpu6050Error::InvalidDevice(who_am_i));
        }

        // сброс устройства
        self.write_register(regs::PWR_MGMT_1, 0x80)?;
        Timer::after(Duration::from_millis(100)).await;

        // пробуждение, PLL от гироскопа X
        self.write_register(regs::PWR_MGMT_1, 0x01)?;
        Timer::after(Duration::from_millis(10)).await;

        // DLPF_CFG = 3: 44 Гц акселерометр, 42 Гц гироскоп
        self.write_register(regs::CONFIG, 0x03)?;
        // 1 кГц / (1 + 9) = 100 Гц
        self.write_register(regs::SMPLRT_DIV, 9)?;

        self.set_accel_range(AccelRange::G4)?;
        self.set_gyro_range(GyroRange::Deg500)?;

        self.write_register(regs::PWR_MGMT_2, 0x00)?;
        Timer::after(Duration::from_millis(20)).await;

        defmt::info!("MPU6050 готов");
        Ok(())
    }

    pub fn set_accel_range(&mut self, range: AccelRange) -> Result<(), Mpu6050Error> {
        self.write_register(regs::ACCEL_CONFIG, range as u8)?;
        self.accel_scale = range.scale();
        Ok(())
    }

    pub fn set_gyro_range(&mut self, range: GyroRange) -> Result<(), Mpu6050Error> {
        self.write_register(regs::GYRO_CONFIG, range as u8)?;
        self.gyro_scale = range.scale();
        Ok(())
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, I2cError> {
        let mut buf = [0u8; 1];
        self.i2c.blocking_write_read(self.addr, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), I2cError> {
        self.i2c.blocking_write(self.addr, &[reg, value])
    }

    /// Три регистра i16 big-endian начиная с `start_reg`.
    fn read_triple(&mut self, start_reg: u8) -> Result<[i16; 3], I2cError> {
        let mut buf = [0u8; 6];
        self.i2c.blocking_write_read(self.addr, &[start_reg], &mut buf)?;
        Ok([
            i16::from_be_bytes([buf[0], buf[1]]),
            i16::from_be_bytes([buf[2], buf[3]]),
            i16::from_be_bytes([buf[4], buf[5]]),
        ])
    }
}

impl<'d, I: Instance> ImuSource for Mpu6050<'d, I> {
    type Error = Mpu6050Error;

    /// Ускорение в g.
    async fn read_acceleration(&mut self) -> Result<Vector3<f32>, Mpu6050Error> {
        let [x, y, z] = self.read_triple(regs::ACCEL_XOUT_H)?;
        Ok(Vector3::new(x as f32, y as f32, z as f32) / self.accel_scale)
    }

    async fn read_angular_rate(&mut self) -> Result<Vector3<f32>, Mpu6050Error> {
        let [x, y, z] = self.read_triple(regs::GYRO_XOUT_H)?;
        Ok(Vector3::new(x as f32, y as f32, z as f32) / self.gyro_scale)
    }
}
