//! Входящие обновления конфигурации ПИД.

use super::pid::PidConfig;
use crate::data::channel::Mailbox;
use crate::error::ConfigError;

/// Источник запросов на обновление конфигурации извне ядра
/// (веб-форма, последовательная консоль, наземная станция).
pub trait ConfigRequestSource {
    /// Ожидающее обновление, если есть. Забирает его.
    fn poll_pending_update(&mut self) -> Option<PidConfig>;

    /// Результат последнего полученного обновления.
    fn acknowledge(&mut self, _result: Result<(), ConfigError>) {}
}

/// Источник запросов на основе почтового ящика.
///
/// Любой транспорт может вызвать `submit`, хранится только последний
/// необработанный запрос. Результат последнего обработанного запроса
/// доступен через [`RequestInbox::last_result`].
pub struct RequestInbox {
    pending: Mailbox<PidConfig>,
    result: Mailbox<Result<(), ConfigError>>,
}

impl RequestInbox {
    pub const fn new() -> Self {
        Self {
            pending: Mailbox::new(),
            result: Mailbox::new(),
        }
    }

    /// Поставить `config` в очередь вместо необработанного запроса.
    pub fn submit(&self, config: PidConfig) {
        self.pending.overwrite(config);
    }

    pub fn last_result(&self) -> Option<Result<(), ConfigError>> {
        self.result.get()
    }
}

impl Default for RequestInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRequestSource for &RequestInbox {
    fn poll_pending_update(&mut self) -> Option<PidConfig> {
        self.pending.take()
    }

    fn acknowledge(&mut self, result: Result<(), ConfigError>) {
        self.result.overwrite(result);
    }
}
