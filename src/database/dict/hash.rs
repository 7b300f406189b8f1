//! Хеш-функции словаря.
//!
//! `murmur2` — эталонная функция для строковых ключей (MurmurHash2, 32 бита).
//! `mix64` — целочисленное перемешивание, на котором строится отпечаток
//! (fingerprint) словаря.

/// Сид по умолчанию для строковых ключей.
pub const DEFAULT_SEED: u32 = 5381;

const M: u32 = 0x5bd1_e995;
const R: u32 = 24;

/// MurmurHash2 (32 бита) по произвольному байтовому срезу.
pub fn murmur2(
    data: &[u8],
    seed: u32,
) -> u32 {
    let mut h = seed ^ (data.len() as u32);

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h = h.wrapping_mul(M);
        h ^= k;
    }

    let tail = chunks.remainder();
    if tail.len() == 3 {
        h ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        h ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        h ^= tail[0] as u32;
        h = h.wrapping_mul(M);
    }

    h ^= h >> 13;
    h = h.wrapping_mul(M);
    h ^= h >> 15;
    h
}

/// Сворачивает 64-битный хеш в 32 бита без потери старших разрядов.
#[inline]
pub fn fold64(h: u64) -> u32 {
    (h ^ (h >> 32)) as u32
}

/// Перемешивает последовательность целых в один 64-битный хеш.
///
/// Порядок значений важен: `[a, b]` и `[b, a]` дают разные результаты.
pub fn mix64(values: &[u64]) -> u64 {
    let mut hash: u64 = 0;

    for &v in values {
        hash = hash.wrapping_add(v);
        hash = (!hash).wrapping_add(hash << 21);
        hash ^= hash >> 24;
        hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8);
        hash ^= hash >> 14;
        hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4);
        hash ^= hash >> 28;
        hash = hash.wrapping_add(hash << 31);
    }

    hash
}
