use std::{
    fmt,
    hash::{BuildHasher, Hash},
    marker::PhantomData,
};

use super::hash::{fold64, murmur2, DEFAULT_SEED};

/// Описание типа словаря: хеширование, сравнение, копирование и
/// освобождение ключей и значений.
///
/// Хуки `dup_*` вызываются, когда запись забирает ключ или значение себе.
/// По умолчанию запись просто принимает владение без копирования.
/// Хуки `destroy_*` вызываются при удалении записи (кроме `remove_detached`)
/// и при очистке словаря.
pub trait DictType {
    type Key;
    type Value;

    /// 32-битный хеш ключа.
    fn hash(
        &self,
        key: &Self::Key,
    ) -> u32;

    /// Равенство ключей.
    fn key_eq(
        &self,
        a: &Self::Key,
        b: &Self::Key,
    ) -> bool;

    fn dup_key(
        &self,
        key: Self::Key,
    ) -> Self::Key {
        key
    }

    fn dup_val(
        &self,
        val: Self::Value,
    ) -> Self::Value {
        val
    }

    fn destroy_key(
        &self,
        key: Self::Key,
    ) {
        drop(key);
    }

    fn destroy_val(
        &self,
        val: Self::Value,
    ) {
        drop(val);
    }
}

/// Тип словаря для байтовых/строковых ключей на MurmurHash2.
///
/// Хеш детерминирован (фиксированный сид), поэтому раскладка по бакетам
/// воспроизводима между запусками.
pub struct MurmurDictType<K, V> {
    seed: u32,
    _marker: PhantomData<fn() -> (K, V)>,
}

/// Тип словаря для любых `Hash + Eq` ключей поверх `BuildHasher`.
pub struct HashDictType<K, V, S = ahash::RandomState> {
    hasher: S,
    _marker: PhantomData<fn() -> (K, V)>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<K, V> MurmurDictType<K, V> {
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            _marker: PhantomData,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl<K, V, S> HashDictType<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            _marker: PhantomData,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl<K, V> DictType for MurmurDictType<K, V>
where
    K: AsRef<[u8]>,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn hash(
        &self,
        key: &K,
    ) -> u32 {
        murmur2(key.as_ref(), self.seed)
    }

    #[inline]
    fn key_eq(
        &self,
        a: &K,
        b: &K,
    ) -> bool {
        a.as_ref() == b.as_ref()
    }
}

impl<K, V, S> DictType for HashDictType<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn hash(
        &self,
        key: &K,
    ) -> u32 {
        fold64(self.hasher.hash_one(key))
    }

    #[inline]
    fn key_eq(
        &self,
        a: &K,
        b: &K,
    ) -> bool {
        a == b
    }
}

impl<K, V> Default for MurmurDictType<K, V> {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl<K, V, S: Default> Default for HashDictType<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V> Clone for MurmurDictType<K, V> {
    fn clone(&self) -> Self {
        Self::with_seed(self.seed)
    }
}

impl<K, V, S: Clone> Clone for HashDictType<K, V, S> {
    fn clone(&self) -> Self {
        Self::with_hasher(self.hasher.clone())
    }
}

impl<K, V> fmt::Debug for MurmurDictType<K, V> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("MurmurDictType")
            .field("seed", &self.seed)
            .finish()
    }
}

impl<K, V, S> fmt::Debug for HashDictType<K, V, S> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("HashDictType").finish_non_exhaustive()
    }
}
