use std::{cell::Cell, rc::Rc};

use tracing::warn;
use zkit_error::{DictError, DictResult};

use super::{
    dict_base::{Dict, EntryKey},
    dict_type::DictType,
};

/// Вид курсора.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// Разрешает изменения словаря во время обхода и приостанавливает
    /// ленивое рехеширование, пока курсор жив.
    Safe,
    /// Запрещает изменения: при `release` сверяется отпечаток словаря.
    Unsafe,
}

/// Курсор обхода словаря, не удерживающий заимствование.
///
/// Курсор хранит позицию (таблица, бакет) и заранее сохранённую ссылку на
/// следующую запись цепочки, поэтому текущую запись можно удалить между
/// вызовами `Dict::next_entry`. Ключи, присутствующие на протяжении всего
/// обхода безопасным курсором, выдаются ровно один раз.
#[derive(Debug)]
pub struct DictCursor {
    kind: CursorKind,
    table: usize,
    /// Последний посещённый бакет текущей таблицы.
    position: Option<usize>,
    next: Option<EntryKey>,
    /// Записи, уже выданные из текущего бакета.
    seen: Vec<EntryKey>,
    done: bool,
    fingerprint: u64,
    guard: Option<SafeGuard>,
}

/// Счётчик безопасных курсоров, уменьшаемый при уничтожении.
#[derive(Debug)]
struct SafeGuard(Rc<Cell<usize>>);

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl DictCursor {
    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    /// `true`, если обход завершён.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl SafeGuard {
    fn acquire(counter: &Rc<Cell<usize>>) -> Self {
        counter.set(counter.get() + 1);
        SafeGuard(Rc::clone(counter))
    }
}

impl<T: DictType> Dict<T> {
    /// Создаёт безопасный курсор. Пока он жив, ленивые шаги рехеширования
    /// не выполняются.
    pub fn safe_cursor(&self) -> DictCursor {
        self.new_cursor(CursorKind::Safe)
    }

    /// Создаёт небезопасный курсор. Между созданием и `release` словарь
    /// изменять нельзя.
    pub fn cursor(&self) -> DictCursor {
        self.new_cursor(CursorKind::Unsafe)
    }

    /// Возвращает следующую запись обхода или `None`, когда записи
    /// закончились.
    ///
    /// Если сохранённая ссылка на следующую запись устарела (запись удалили),
    /// текущий бакет просматривается заново с головы, а уже выданные из него
    /// записи пропускаются.
    pub fn next_entry(
        &self,
        cursor: &mut DictCursor,
    ) -> Option<(&T::Key, &T::Value)> {
        if cursor.done {
            return None;
        }

        loop {
            if let Some(id) = cursor.next.take() {
                match self.entries.get(id) {
                    Some(entry) => {
                        cursor.next = entry.next;
                        if cursor.seen.contains(&id) {
                            continue;
                        }
                        cursor.seen.push(id);
                        return Some((&entry.key, &entry.val));
                    }
                    None => {
                        cursor.next = self.bucket_head(cursor.table, cursor.position);
                        continue;
                    }
                }
            }

            cursor.seen.clear();
            let next_bucket = cursor.position.map_or(0, |b| b + 1);
            match self.tables.get(cursor.table) {
                Some(table) if next_bucket < table.size() => {
                    cursor.position = Some(next_bucket);
                    cursor.next = table.buckets[next_bucket];
                }
                _ if cursor.table == 0 && self.tables.get(1).is_some() => {
                    cursor.table = 1;
                    cursor.position = None;
                }
                _ => {
                    cursor.done = true;
                    return None;
                }
            }
        }
    }

    /// Освобождает курсор.
    ///
    /// Для небезопасного курсора сверяет отпечаток словаря с отпечатком на
    /// момент создания и возвращает `DictError::FingerprintMismatch`, если
    /// словарь изменили.
    pub fn release(
        &self,
        cursor: DictCursor,
    ) -> DictResult<()> {
        if cursor.kind == CursorKind::Safe {
            return Ok(());
        }

        let actual = self.fingerprint();
        if actual != cursor.fingerprint {
            warn!(
                expected = cursor.fingerprint,
                actual, "dict modified during unsafe iteration"
            );
            return Err(DictError::FingerprintMismatch {
                expected: cursor.fingerprint,
                actual,
            });
        }

        Ok(())
    }

    fn new_cursor(
        &self,
        kind: CursorKind,
    ) -> DictCursor {
        let guard = match kind {
            CursorKind::Safe => Some(SafeGuard::acquire(&self.safe_iterators)),
            CursorKind::Unsafe => None,
        };

        DictCursor {
            kind,
            table: 0,
            position: None,
            next: None,
            seen: Vec::new(),
            done: false,
            fingerprint: self.fingerprint(),
            guard,
        }
    }

    fn bucket_head(
        &self,
        table: usize,
        position: Option<usize>,
    ) -> Option<EntryKey> {
        let table = self.tables.get(table)?;
        table.buckets.get(position?).copied().flatten()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для SafeGuard
////////////////////////////////////////////////////////////////////////////////

impl Drop for SafeGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
