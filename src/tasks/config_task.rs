use embassy_time::Ticker;

use crate::config::requests::ConfigRequestSource;
use crate::config::store::ConfigStore;
use crate::config::system::CONFIG_PERIOD;
use crate::config::PidConfig;
use crate::data::DataChannels;
use crate::error::ConfigError;

/// Проверяет запрошенные обновления ПИД, сохраняет принятые и передаёт
/// активную конфигурацию автомату состояний.
pub struct ConfigTask<'a, R, S> {
    requests: R,
    store: S,
    channels: &'a DataChannels,
    active: PidConfig,
}

impl<'a, R: ConfigRequestSource, S: ConfigStore> ConfigTask<'a, R, S> {
    pub fn new(requests: R, store: S, channels: &'a DataChannels, active: PidConfig) -> Self {
        Self {
            requests,
            store,
            channels,
            active,
        }
    }

    pub fn active(&self) -> &PidConfig {
        &self.active
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Один период конфигурации. Возвращает результат обработанного
    /// запроса, если он был.
    pub fn tick(&mut self) -> Option<Result<(), ConfigError>> {
        let mut outcome = None;
        if let Some(config) = self.requests.poll_pending_update() {
            let result = self.accept(config);
            self.requests.acknowledge(result);
            outcome = Some(result);
        }
        self.channels.config.overwrite(self.active);
        outcome
    }

    fn accept(&mut self, config: PidConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!("Обновление конфигурации отклонено: {}", e);
            return Err(e);
        }
        if self.store.save(&config).is_err() {
            warn!("Не удалось сохранить конфигурацию, применяем без сохранения");
        }
        self.active = config;
        info!("Обновление конфигурации принято");
        Ok(())
    }

    pub async fn run(mut self) -> ! {
        info!("Запуск задачи конфигурации");
        let mut ticker = Ticker::every(CONFIG_PERIOD);
        loop {
            ticker.next().await;
            self.tick();
        }
    }
}
