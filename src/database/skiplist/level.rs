use rand::{rngs::StdRng, Rng, SeedableRng};

/// Максимальное количество уровней в пропускном списке.
pub const MAX_LEVEL: usize = 32;

/// Вероятность перехода на следующий уровень, в долях от 0x10000 (0.25).
const P_THRESHOLD: u32 = 0x4000;
const P_MASK: u32 = 0xFFFF;

/// Источник уровней для новых узлов.
///
/// Реализация обязана возвращать значение в диапазоне `1..=MAX_LEVEL`.
pub trait LevelSampler {
    fn sample_level(&mut self) -> usize;
}

/// Геометрическое распределение уровней с p = 0.25.
#[derive(Debug, Clone)]
pub struct GeometricLevels {
    rng: StdRng,
}

impl GeometricLevels {
    /// Генератор со случайным сидом.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Детерминированный генератор для воспроизводимых раскладок.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl LevelSampler for GeometricLevels {
    fn sample_level(&mut self) -> usize {
        let mut level = 1;
        while (self.rng.gen::<u32>() & P_MASK) < P_THRESHOLD && level < MAX_LEVEL {
            level += 1;
        }
        level
    }
}

impl Default for GeometricLevels {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> LevelSampler for F
where
    F: FnMut() -> usize,
{
    fn sample_level(&mut self) -> usize {
        self().clamp(1, MAX_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что уровни всегда лежат в допустимом диапазоне.
    #[test]
    fn test_levels_in_bounds() {
        let mut sampler = GeometricLevels::with_seed(7);
        for _ in 0..10_000 {
            let level = sampler.sample_level();
            assert!((1..=MAX_LEVEL).contains(&level));
        }
    }

    /// Тест проверяет распределение: около 3/4 узлов имеют уровень 1.
    #[test]
    fn test_geometric_distribution() {
        let mut sampler = GeometricLevels::with_seed(42);
        let n = 100_000;
        let mut level_one = 0;
        let mut above_two = 0;
        for _ in 0..n {
            match sampler.sample_level() {
                1 => level_one += 1,
                l if l > 2 => above_two += 1,
                _ => {}
            }
        }

        let p1 = level_one as f64 / n as f64;
        let p3 = above_two as f64 / n as f64;
        assert!((p1 - 0.75).abs() < 0.01, "P(level = 1) = {p1}");
        assert!((p3 - 0.0625).abs() < 0.01, "P(level > 2) = {p3}");
    }

    /// Тест проверяет детерминизм при одинаковом сиде.
    #[test]
    fn test_seeded_sampler_is_reproducible() {
        let mut a = GeometricLevels::with_seed(123);
        let mut b = GeometricLevels::with_seed(123);
        let la: Vec<usize> = (0..64).map(|_| a.sample_level()).collect();
        let lb: Vec<usize> = (0..64).map(|_| b.sample_level()).collect();
        assert_eq!(la, lb);
    }

    /// Тест проверяет ограничение уровней у замыкания.
    #[test]
    fn test_closure_sampler_is_clamped() {
        let mut too_high = || 100usize;
        let mut zero = || 0usize;
        assert_eq!(too_high.sample_level(), MAX_LEVEL);
        assert_eq!(zero.sample_level(), 1);
    }
}
