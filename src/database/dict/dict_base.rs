use std::{cell::Cell, fmt, rc::Rc, time::Duration, time::Instant};

use slotmap::{new_key_type, SlotMap};
use tracing::{debug, trace};
use zkit_error::{ensure, DictError, DictResult};

use super::{
    dict_type::DictType,
    hash::mix64,
};
use crate::config::{structures::DICT_MIN_SIZE, DictConfig, ResizePolicy};

/// Количество бакетов за одну порцию в `rehash_for`.
const REHASH_BATCH: usize = 100;

new_key_type! {
    /// Индекс записи в арене словаря.
    pub struct EntryKey;
}

/// Запись словаря: ключ, значение и ссылка на следующую запись цепочки.
#[derive(Debug)]
pub struct DictEntry<K, V> {
    pub(super) key: K,
    pub(super) val: V,
    pub(super) next: Option<EntryKey>,
}

/// Одна хеш-таблица: вектор голов цепочек, маска размера и количество
/// занятых элементов.
#[derive(Debug)]
pub(super) struct HashTable {
    /// Идентичность выделения (участвует в отпечатке вместо адреса).
    pub(super) id: u64,
    pub(super) buckets: Vec<Option<EntryKey>>,
    pub(super) size_mask: usize,
    pub(super) used: usize,
}

/// Состояние пары таблиц.
///
/// Индекс 0 — активная (старая) таблица, индекс 1 — целевая таблица
/// рехеширования.
#[derive(Debug, Default)]
pub(super) enum Tables {
    #[default]
    Empty,
    Stable(HashTable),
    Rehashing {
        old: HashTable,
        new: HashTable,
        /// Следующий бакет `old`, который предстоит перенести.
        cursor: usize,
    },
}

/// Результат `replace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replaced {
    Inserted,
    Updated,
}

/// Хеш-таблица с инкрементальным рехешированием.
///
/// **ИНВАРИАНТЫ:**
///
/// - `Tables::Stable`: все элементы находятся в таблице 0.
/// - `Tables::Rehashing { cursor, .. }`: каждый ключ лежит ровно в одной из
///   таблиц, все бакеты старой таблицы с индексом `< cursor` пусты.
/// - Размер каждой таблицы — степень двойки не меньше 4.
///
/// Рехеширование идёт порциями по одному бакету при вставке, удалении и
/// поиске, пока нет живых безопасных курсоров. Явный `rehash` работает
/// всегда.
pub struct Dict<T: DictType> {
    pub(super) ty: T,
    pub(super) entries: SlotMap<EntryKey, DictEntry<T::Key, T::Value>>,
    pub(super) tables: Tables,
    pub(super) config: DictConfig,
    pub(super) safe_iterators: Rc<Cell<usize>>,
    next_table_id: u64,
}

/// Итератор по словарю `Dict` (разделяемая ссылка).
pub struct DictIter<'a, K, V> {
    tables: [Option<&'a HashTable>; 2],
    entries: &'a SlotMap<EntryKey, DictEntry<K, V>>,
    table_idx: usize,
    bucket_idx: usize,
    current: Option<EntryKey>,
}

/// Итог попытки вставки.
pub(super) enum AddOutcome<K, V> {
    Added(EntryKey),
    Exists { id: EntryKey, key: K, val: V },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, V> DictEntry<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.val
    }
}

impl HashTable {
    /// Создаёт таблицу ровно из `size` бакетов (`size` — степень двойки).
    ///
    /// Память под бакеты резервируется через `try_reserve_exact`, так что
    /// нехватка памяти возвращается ошибкой.
    fn try_with_size(
        id: u64,
        size: usize,
    ) -> DictResult<Self> {
        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(size)
            .map_err(|_| DictError::OutOfMemory { buckets: size })?;
        buckets.resize(size, None);

        Ok(HashTable {
            id,
            buckets,
            size_mask: size - 1,
            used: 0,
        })
    }

    #[inline]
    pub(super) fn size(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub(super) fn slot(
        &self,
        hash: u32,
    ) -> usize {
        (hash as usize) & self.size_mask
    }
}

impl Tables {
    /// Таблица по индексу: 0 — активная/старая, 1 — целевая.
    pub(super) fn get(
        &self,
        idx: usize,
    ) -> Option<&HashTable> {
        match (self, idx) {
            (Tables::Stable(t), 0) => Some(t),
            (Tables::Rehashing { old, .. }, 0) => Some(old),
            (Tables::Rehashing { new, .. }, 1) => Some(new),
            _ => None,
        }
    }

    pub(super) fn get_mut(
        &mut self,
        idx: usize,
    ) -> Option<&mut HashTable> {
        match (self, idx) {
            (Tables::Stable(t), 0) => Some(t),
            (Tables::Rehashing { old, .. }, 0) => Some(old),
            (Tables::Rehashing { new, .. }, 1) => Some(new),
            _ => None,
        }
    }

    /// Таблица, в которую попадают новые записи.
    fn target_mut(&mut self) -> Option<&mut HashTable> {
        match self {
            Tables::Empty => None,
            Tables::Stable(t) => Some(t),
            Tables::Rehashing { new, .. } => Some(new),
        }
    }

    #[inline]
    pub(super) fn is_rehashing(&self) -> bool {
        matches!(self, Tables::Rehashing { .. })
    }
}

impl<T: DictType> Dict<T> {
    /// Создаёт новый пустой словарь. Память под бакеты не выделяется до
    /// первой вставки.
    pub fn new(ty: T) -> Self {
        Self::with_config(ty, DictConfig::default())
    }

    pub fn with_config(
        ty: T,
        config: DictConfig,
    ) -> Self {
        Dict {
            ty,
            entries: SlotMap::with_key(),
            tables: Tables::Empty,
            config,
            safe_iterators: Rc::new(Cell::new(0)),
            next_table_id: 0,
        }
    }

    pub fn dict_type(&self) -> &T {
        &self.ty
    }

    pub fn config(&self) -> &DictConfig {
        &self.config
    }

    pub fn resize_policy(&self) -> ResizePolicy {
        self.config.resize_policy
    }

    /// Разрешает или откладывает обычное расширение. Принудительное
    /// расширение (`used / size > force_resize_ratio`) работает всегда.
    pub fn set_resize_policy(
        &mut self,
        policy: ResizePolicy,
    ) {
        self.config.resize_policy = policy;
    }

    /// Добавляет пару `(key, val)`.
    ///
    /// Если ключ уже есть, словарь не меняется и возвращается
    /// `DictError::KeyExists`.
    pub fn add(
        &mut self,
        key: T::Key,
        val: T::Value,
    ) -> DictResult<()> {
        match self.try_add(key, val)? {
            AddOutcome::Added(_) => Ok(()),
            AddOutcome::Exists { .. } => Err(DictError::KeyExists),
        }
    }

    /// Вставляет пару или заменяет значение существующего ключа.
    ///
    /// Старое значение освобождается через `destroy_val` только при
    /// обновлении. Переданный ключ при обновлении не используется.
    pub fn replace(
        &mut self,
        key: T::Key,
        val: T::Value,
    ) -> DictResult<Replaced> {
        match self.try_add(key, val)? {
            AddOutcome::Added(_) => Ok(Replaced::Inserted),
            AddOutcome::Exists { id, key, val } => {
                let val = self.ty.dup_val(val);
                let old = match self.entries.get_mut(id) {
                    Some(entry) => std::mem::replace(&mut entry.val, val),
                    None => return Err(DictError::KeyNotFound),
                };
                self.ty.destroy_val(old);
                drop(key);
                Ok(Replaced::Updated)
            }
        }
    }

    /// Ищет запись по ключу. Выполняет шаг рехеширования, если оно идёт.
    pub fn find(
        &mut self,
        key: &T::Key,
    ) -> Option<&DictEntry<T::Key, T::Value>> {
        if matches!(self.tables, Tables::Empty) {
            return None;
        }
        self.rehash_step();

        let hash = self.ty.hash(key);
        let id = self.lookup(key, hash)?;
        self.entries.get(id)
    }

    /// Возвращает `Some(&V)` для указанного ключа или `None`.
    ///
    /// В отличие от `find` не двигает рехеширование.
    pub fn get(
        &self,
        key: &T::Key,
    ) -> Option<&T::Value> {
        let hash = self.ty.hash(key);
        let id = self.lookup(key, hash)?;
        self.entries.get(id).map(|e| &e.val)
    }

    /// Возвращает `Some(&mut V)` для указанного ключа или `None`.
    pub fn get_mut(
        &mut self,
        key: &T::Key,
    ) -> Option<&mut T::Value> {
        if matches!(self.tables, Tables::Empty) {
            return None;
        }
        self.rehash_step();

        let hash = self.ty.hash(key);
        let id = self.lookup(key, hash)?;
        self.entries.get_mut(id).map(|e| &mut e.val)
    }

    pub fn contains_key(
        &self,
        key: &T::Key,
    ) -> bool {
        self.lookup(key, self.ty.hash(key)).is_some()
    }

    /// Удаляет ключ, освобождая ключ и значение через хуки типа.
    /// Возвращает `true`, если удаление произошло.
    pub fn remove(
        &mut self,
        key: &T::Key,
    ) -> bool {
        match self.remove_generic(key) {
            Some((k, v)) => {
                self.ty.destroy_key(k);
                self.ty.destroy_val(v);
                true
            }
            None => false,
        }
    }

    /// Удаляет ключ без вызова хуков освобождения и отдаёт пару вызывающему.
    pub fn remove_detached(
        &mut self,
        key: &T::Key,
    ) -> Option<(T::Key, T::Value)> {
        self.remove_generic(key)
    }

    /// Расширяет (или впервые создаёт) таблицу до ближайшей степени двойки
    /// `>= size`.
    ///
    /// Ошибки: идёт рехеширование, `size` меньше числа элементов, не хватило
    /// памяти. При ошибке словарь не меняется. Размер, совпадающий с текущим,
    /// ничего не делает.
    pub fn expand(
        &mut self,
        size: usize,
    ) -> DictResult<()> {
        ensure!(!self.tables.is_rehashing(), DictError::Rehashing);

        let used = self.len();
        ensure!(
            size >= used,
            DictError::SizeBelowUsed {
                requested: size,
                used
            }
        );

        let real_size = size
            .max(DICT_MIN_SIZE)
            .checked_next_power_of_two()
            .ok_or(DictError::OutOfMemory { buckets: size })?;
        if let Tables::Stable(current) = &self.tables {
            if current.size() == real_size {
                trace!(size = real_size, "dict expand to current size skipped");
                return Ok(());
            }
        }

        let table = HashTable::try_with_size(self.next_table_id + 1, real_size)?;
        self.next_table_id += 1;

        self.tables = match std::mem::take(&mut self.tables) {
            Tables::Empty => Tables::Stable(table),
            Tables::Stable(old) => {
                debug!(
                    from = old.size(),
                    to = real_size,
                    used = old.used,
                    "dict rehash started"
                );
                Tables::Rehashing {
                    old,
                    new: table,
                    cursor: 0,
                }
            }
            rehashing @ Tables::Rehashing { .. } => rehashing,
        };

        Ok(())
    }

    /// Выполняет до `n` шагов рехеширования (шаг = один непустой бакет).
    ///
    /// Работает независимо от безопасных курсоров. Возвращает `true`, если
    /// рехеширование ещё не завершено.
    pub fn rehash(
        &mut self,
        n: usize,
    ) -> bool {
        self.rehash_buckets(n);
        self.tables.is_rehashing()
    }

    /// Рехеширует порциями по 100 бакетов, пока не истечёт `budget`.
    /// Возвращает количество перенесённых бакетов.
    pub fn rehash_for(
        &mut self,
        budget: Duration,
    ) -> usize {
        let start = Instant::now();
        let mut migrated = 0;

        while self.tables.is_rehashing() {
            migrated += self.rehash_buckets(REHASH_BATCH);
            if start.elapsed() >= budget {
                break;
            }
        }

        migrated
    }

    /// Возвращает общее количество элементов во всех таблицах.
    pub fn len(&self) -> usize {
        self.tables.get(0).map_or(0, |t| t.used) + self.tables.get(1).map_or(0, |t| t.used)
    }

    /// Возвращает `true`, если словарь пуст.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Размер таблицы, в которую попадают новые записи (0 до первой вставки).
    pub fn capacity(&self) -> usize {
        match &self.tables {
            Tables::Empty => 0,
            Tables::Stable(t) => t.size(),
            Tables::Rehashing { new, .. } => new.size(),
        }
    }

    /// Размеры таблиц 0 и 1 (0 — таблица не выделена).
    pub fn table_sizes(&self) -> [usize; 2] {
        [
            self.tables.get(0).map_or(0, HashTable::size),
            self.tables.get(1).map_or(0, HashTable::size),
        ]
    }

    #[inline]
    pub fn is_rehashing(&self) -> bool {
        self.tables.is_rehashing()
    }

    /// Следующий бакет старой таблицы для переноса или `None`, если
    /// рехеширование не идёт.
    pub fn rehash_index(&self) -> Option<usize> {
        match self.tables {
            Tables::Rehashing { cursor, .. } => Some(cursor),
            _ => None,
        }
    }

    /// Количество живых безопасных курсоров.
    pub fn safe_iterators(&self) -> usize {
        self.safe_iterators.get()
    }

    /// Отпечаток структуры: идентичность, размер и заполненность обеих
    /// таблиц.
    pub fn fingerprint(&self) -> u64 {
        let describe = |t: Option<&HashTable>| {
            t.map_or([0, 0, 0], |t| [t.id, t.size() as u64, t.used as u64])
        };
        let [a, b, c] = describe(self.tables.get(0));
        let [d, e, f] = describe(self.tables.get(1));

        mix64(&[a, b, c, d, e, f])
    }

    /// Очищает словарь, освобождая все записи через хуки типа.
    pub fn clear(&mut self) {
        self.release_entries();
        self.tables = Tables::Empty;
    }

    /// Возвращает итератор по парам `(&K, &V)`.
    pub fn iter(&self) -> DictIter<'_, T::Key, T::Value> {
        DictIter {
            tables: [self.tables.get(0), self.tables.get(1)],
            entries: &self.entries,
            table_idx: 0,
            bucket_idx: 0,
            current: None,
        }
    }

    /// Поиск ключа в обеих таблицах (вторая — только при рехешировании).
    pub(super) fn lookup(
        &self,
        key: &T::Key,
        hash: u32,
    ) -> Option<EntryKey> {
        for idx in 0..=1 {
            let Some(table) = self.tables.get(idx) else {
                break;
            };

            let mut cur = table.buckets[table.slot(hash)];
            while let Some(id) = cur {
                let entry = self.entries.get(id)?;
                if self.ty.key_eq(key, &entry.key) {
                    return Some(id);
                }
                cur = entry.next;
            }
        }

        None
    }

    /// Вставляет пару, если ключа ещё нет; иначе возвращает пару обратно
    /// вместе с индексом существующей записи.
    pub(super) fn try_add(
        &mut self,
        key: T::Key,
        val: T::Value,
    ) -> DictResult<AddOutcome<T::Key, T::Value>> {
        self.rehash_step();

        let hash = self.ty.hash(&key);
        if let Some(id) = self.lookup(&key, hash) {
            return Ok(AddOutcome::Exists { id, key, val });
        }

        self.expand_if_needed()?;
        Ok(AddOutcome::Added(self.link(hash, key, val)))
    }

    /// Кладёт новую запись в голову цепочки целевой таблицы.
    ///
    /// Вызывается только после `expand_if_needed`, который гарантирует
    /// наличие таблицы.
    pub(super) fn link(
        &mut self,
        hash: u32,
        key: T::Key,
        val: T::Value,
    ) -> EntryKey {
        let key = self.ty.dup_key(key);
        let val = self.ty.dup_val(val);

        let Some(table) = self.tables.target_mut() else {
            unreachable!("expand_if_needed allocates the first table");
        };

        let slot = table.slot(hash);
        let id = self.entries.insert(DictEntry {
            key,
            val,
            next: table.buckets[slot],
        });
        table.buckets[slot] = Some(id);
        table.used += 1;

        id
    }

    /// Вынимает запись `id` из её цепочки. `hash` — хеш её ключа.
    pub(super) fn unlink(
        &mut self,
        id: EntryKey,
        hash: u32,
    ) -> Option<DictEntry<T::Key, T::Value>> {
        for idx in 0..=1 {
            let Some(table) = self.tables.get_mut(idx) else {
                break;
            };

            let slot = table.slot(hash);
            let mut prev: Option<EntryKey> = None;
            let mut cur = table.buckets[slot];

            while let Some(cur_id) = cur {
                let next = self.entries.get(cur_id)?.next;
                if cur_id == id {
                    match prev.and_then(|p| self.entries.get_mut(p)) {
                        Some(prev_entry) => prev_entry.next = next,
                        None => table.buckets[slot] = next,
                    }
                    table.used -= 1;
                    return self.entries.remove(id);
                }
                prev = Some(cur_id);
                cur = next;
            }
        }

        None
    }

    fn remove_generic(
        &mut self,
        key: &T::Key,
    ) -> Option<(T::Key, T::Value)> {
        if matches!(self.tables, Tables::Empty) {
            return None;
        }
        self.rehash_step();

        let hash = self.ty.hash(key);
        let id = self.lookup(key, hash)?;
        self.unlink(id, hash).map(|e| (e.key, e.val))
    }

    /// Ленивый шаг рехеширования: пропускается, пока живы безопасные
    /// курсоры.
    pub(super) fn rehash_step(&mut self) {
        if !self.tables.is_rehashing() {
            return;
        }

        if self.safe_iterators.get() == 0 {
            self.rehash_buckets(1);
        } else {
            trace!(
                safe_iterators = self.safe_iterators.get(),
                "lazy rehash step skipped"
            );
        }
    }

    /// Переносит до `n` непустых бакетов. Возвращает число перенесённых.
    fn rehash_buckets(
        &mut self,
        n: usize,
    ) -> usize {
        let Tables::Rehashing { old, new, cursor } = &mut self.tables else {
            return 0;
        };

        let mut migrated = 0;
        while migrated < n && old.used > 0 {
            // used > 0 гарантирует непустой бакет не раньше курсора.
            while *cursor < old.size() && old.buckets[*cursor].is_none() {
                *cursor += 1;
            }
            let Some(slot) = old.buckets.get_mut(*cursor) else {
                break;
            };

            let mut cur = slot.take();
            while let Some(id) = cur {
                let Some(entry) = self.entries.get_mut(id) else {
                    break;
                };
                cur = entry.next;

                let dst = new.slot(self.ty.hash(&entry.key));
                entry.next = new.buckets[dst];
                new.buckets[dst] = Some(id);

                old.used -= 1;
                new.used += 1;
            }

            *cursor += 1;
            migrated += 1;
        }

        let done = old.used == 0;
        if done {
            self.finish_rehash();
        }

        migrated
    }

    fn finish_rehash(&mut self) {
        if let Tables::Rehashing { new, .. } = std::mem::take(&mut self.tables) {
            debug!(size = new.size(), used = new.used, "dict rehash completed");
            self.tables = Tables::Stable(new);
        }
    }

    /// Выделяет первую таблицу или запускает расширение по политике.
    pub(super) fn expand_if_needed(&mut self) -> DictResult<()> {
        let (used, size) = match &self.tables {
            Tables::Rehashing { .. } => return Ok(()),
            Tables::Empty => return self.expand(self.config.initial_size),
            Tables::Stable(t) => (t.used, t.size()),
        };

        if used < size {
            return Ok(());
        }

        let forced = used / size > self.config.force_resize_ratio;
        if self.config.resize_policy == ResizePolicy::Enable || forced {
            self.expand(used * 2)
        } else {
            trace!(used, size, "dict resize deferred by policy");
            Ok(())
        }
    }

    fn release_entries(&mut self) {
        for (_, entry) in self.entries.drain() {
            self.ty.destroy_key(entry.key);
            self.ty.destroy_val(entry.val);
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для Dict, DictIter
////////////////////////////////////////////////////////////////////////////////

impl<'a, K, V> Iterator for DictIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Отдаём текущий элемент цепочки, если он есть.
            if let Some(id) = self.current.take() {
                if let Some(entry) = self.entries.get(id) {
                    self.current = entry.next;
                    return Some((&entry.key, &entry.val));
                }
                continue;
            }

            let table = self.tables.get(self.table_idx).copied().flatten()?;

            // Бакеты текущей таблицы исчерпаны.
            if self.bucket_idx >= table.size() {
                if self.table_idx == 0 && self.tables[1].is_some() {
                    self.table_idx = 1;
                    self.bucket_idx = 0;
                    continue;
                }
                return None;
            }

            self.current = table.buckets[self.bucket_idx];
            self.bucket_idx += 1;
        }
    }
}

impl<'a, T: DictType> IntoIterator for &'a Dict<T> {
    type Item = (&'a T::Key, &'a T::Value);
    type IntoIter = DictIter<'a, T::Key, T::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: DictType + Default> Default for Dict<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: DictType> Drop for Dict<T> {
    fn drop(&mut self) {
        self.release_entries();
    }
}

impl<T: DictType> fmt::Debug for Dict<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Dict")
            .field("len", &self.len())
            .field("table_sizes", &self.table_sizes())
            .field("rehash_index", &self.rehash_index())
            .field("safe_iterators", &self.safe_iterators())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
