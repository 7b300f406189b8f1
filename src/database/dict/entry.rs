use zkit_error::DictResult;

use super::{
    dict_base::{Dict, EntryKey},
    dict_type::DictType,
};

/// Вход в словарь для ключа: занятый или свободный.
pub enum Entry<'a, T: DictType> {
    Occupied(OccupiedEntry<'a, T>),
    Vacant(VacantEntry<'a, T>),
}

pub struct OccupiedEntry<'a, T: DictType> {
    pub(super) dict: &'a mut Dict<T>,
    pub(super) id: EntryKey,
    pub(super) hash: u32,
}

pub struct VacantEntry<'a, T: DictType> {
    pub(super) dict: &'a mut Dict<T>,
    pub(super) key: T::Key,
    pub(super) hash: u32,
}

impl<T: DictType> Dict<T> {
    /// Возвращает вход для ключа. Выполняет ленивый шаг рехеширования.
    ///
    /// Таблица расширяется только при вставке в свободный вход.
    pub fn entry(
        &mut self,
        key: T::Key,
    ) -> Entry<'_, T> {
        self.rehash_step();

        let hash = self.ty.hash(&key);
        match self.lookup(&key, hash) {
            Some(id) => Entry::Occupied(OccupiedEntry {
                dict: self,
                id,
                hash,
            }),
            None => Entry::Vacant(VacantEntry {
                dict: self,
                key,
                hash,
            }),
        }
    }
}

impl<'a, T: DictType> OccupiedEntry<'a, T> {
    #[inline]
    pub fn key(&self) -> &T::Key {
        &self.dict.entries[self.id].key
    }

    #[inline]
    pub fn get(&self) -> &T::Value {
        &self.dict.entries[self.id].val
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T::Value {
        &mut self.dict.entries[self.id].val
    }

    #[inline]
    pub fn into_mut(self) -> &'a mut T::Value {
        &mut self.dict.entries[self.id].val
    }

    /// Заменяет значение и возвращает старое без вызова `destroy_val`.
    #[inline]
    pub fn insert(
        &mut self,
        val: T::Value,
    ) -> T::Value {
        let val = self.dict.ty.dup_val(val);
        std::mem::replace(&mut self.dict.entries[self.id].val, val)
    }

    /// Удаляет запись и отдаёт пару вызывающему (хуки освобождения не
    /// вызываются).
    pub fn remove_entry(self) -> (T::Key, T::Value) {
        match self.dict.unlink(self.id, self.hash) {
            Some(entry) => (entry.key, entry.val),
            None => unreachable!("occupied entry is linked into its bucket"),
        }
    }

    #[inline]
    pub fn remove(self) -> T::Value {
        self.remove_entry().1
    }
}

impl<'a, T: DictType> VacantEntry<'a, T> {
    #[inline]
    pub fn key(&self) -> &T::Key {
        &self.key
    }

    #[inline]
    pub fn into_key(self) -> T::Key {
        self.key
    }

    /// Вставляет значение, при необходимости расширяя таблицу.
    pub fn insert(
        self,
        val: T::Value,
    ) -> DictResult<&'a mut T::Value> {
        self.dict.expand_if_needed()?;
        let id = self.dict.link(self.hash, self.key, val);
        Ok(&mut self.dict.entries[id].val)
    }
}

impl<'a, T> Entry<'a, T>
where
    T: DictType,
    T::Value: Default,
{
    #[inline]
    pub fn or_default(self) -> DictResult<&'a mut T::Value> {
        self.or_insert_with(T::Value::default)
    }
}

impl<'a, T: DictType> Entry<'a, T> {
    pub fn or_insert(
        self,
        default: T::Value,
    ) -> DictResult<&'a mut T::Value> {
        match self {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => e.insert(default),
        }
    }

    pub fn or_insert_with(
        self,
        f: impl FnOnce() -> T::Value,
    ) -> DictResult<&'a mut T::Value> {
        match self {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => e.insert(f()),
        }
    }

    pub fn or_insert_with_key(
        self,
        f: impl FnOnce(&T::Key) -> T::Value,
    ) -> DictResult<&'a mut T::Value> {
        match self {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let val = f(&e.key);
                e.insert(val)
            }
        }
    }

    pub fn and_modify(
        self,
        f: impl FnOnce(&mut T::Value),
    ) -> Self {
        match self {
            Entry::Occupied(mut e) => {
                f(e.get_mut());
                Entry::Occupied(e)
            }
            Entry::Vacant(e) => Entry::Vacant(e),
        }
    }

    pub fn key(&self) -> &T::Key {
        match self {
            Entry::Occupied(e) => e.key(),
            Entry::Vacant(e) => e.key(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
