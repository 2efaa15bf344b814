//! Каналы между задачами.
//!
//! Два разных типа:
//! * [`Mailbox`] хранит только последнее значение (запись перезаписывает).
//! * [`Fifo`] ограниченная очередь с одним потребителем, который извлекает
//!   ([`Fifo::try_pop`]), и любым числом наблюдателей
//!   ([`Fifo::peek`], [`Fifo::observe`]).
//!
//! Все операции неблокирующие. Критические секции только копируют
//! значения, зависшая задача не может задержать вызывающую.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;

/// Канал на одно значение, хранит последнее.
pub struct Mailbox<T: Copy> {
    slot: Mutex<CriticalSectionRawMutex, Cell<Option<T>>>,
}

impl<T: Copy> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(None)),
        }
    }

    /// Заменить значение, ошибок не бывает.
    pub fn overwrite(&self, value: T) {
        self.slot.lock(|slot| slot.set(Some(value)));
    }

    /// Последнее значение без извлечения.
    pub fn get(&self) -> Option<T> {
        self.slot.lock(|slot| slot.get())
    }

    /// Последнее значение, ящик остаётся пустым.
    pub fn take(&self) -> Option<T> {
        self.slot.lock(|slot| slot.take())
    }
}

impl<T: Copy> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct FifoInner<T, const N: usize> {
    queue: Deque<T, N>,
    newest: Option<T>,
}

/// Ограниченная очередь, при переполнении отбрасывается новое.
pub struct Fifo<T: Copy, const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<FifoInner<T, N>>>,
}

impl<T: Copy, const N: usize> Fifo<T, N> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(FifoInner {
                queue: Deque::new(),
                newest: None,
            })),
        }
    }

    /// Добавить `value`. Если очередь полна, значение возвращается
    /// обратно, производитель не блокируется.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            inner.queue.push_back(value)?;
            inner.newest = Some(value);
            Ok(())
        })
    }

    /// Извлечь самый старый элемент.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock(|inner| inner.borrow_mut().queue.pop_front())
    }

    /// Самый старый элемент без извлечения.
    pub fn peek(&self) -> Option<T> {
        self.inner.lock(|inner| inner.borrow().queue.front().copied())
    }

    /// Чтение для наблюдения: голова очереди, если есть, иначе последний
    /// принятый элемент. Наблюдатель видит данные, даже когда потребитель
    /// успевает опустошать очередь, но может отставать на глубину очереди.
    pub fn observe(&self) -> Option<T> {
        self.inner.lock(|inner| {
            let inner = inner.borrow();
            inner.queue.front().copied().or(inner.newest)
        })
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|inner| inner.borrow().queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Очистить очередь. Последний принятый элемент сохраняется.
    pub fn clear(&self) {
        self.inner.lock(|inner| inner.borrow_mut().queue.clear());
    }
}

impl<T: Copy, const N: usize> Default for Fifo<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
