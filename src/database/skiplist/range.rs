use zkit_error::{SkipListError, SkipListResult};

/// Диапазон score с независимо включаемыми или исключаемыми границами.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
    pub min_exclusive: bool,
    pub max_exclusive: bool,
}

impl ScoreRange {
    pub fn new(
        min: f64,
        max: f64,
        min_exclusive: bool,
        max_exclusive: bool,
    ) -> Self {
        Self {
            min,
            max,
            min_exclusive,
            max_exclusive,
        }
    }

    /// Диапазон `[min, max]`.
    pub fn inclusive(
        min: f64,
        max: f64,
    ) -> Self {
        Self::new(min, max, false, false)
    }

    /// Диапазон `(-inf, +inf)`.
    pub fn all() -> Self {
        Self::inclusive(f64::NEG_INFINITY, f64::INFINITY)
    }

    #[inline]
    pub fn value_gte_min(
        &self,
        value: f64,
    ) -> bool {
        if self.min_exclusive {
            value > self.min
        } else {
            value >= self.min
        }
    }

    #[inline]
    pub fn value_lte_max(
        &self,
        value: f64,
    ) -> bool {
        if self.max_exclusive {
            value < self.max
        } else {
            value <= self.max
        }
    }

    #[inline]
    pub fn contains(
        &self,
        value: f64,
    ) -> bool {
        self.value_gte_min(value) && self.value_lte_max(value)
    }

    /// `true`, если диапазону не может принадлежать ни одно значение.
    pub fn is_empty(&self) -> bool {
        self.min > self.max
            || (self.min == self.max && (self.min_exclusive || self.max_exclusive))
    }

    /// Разбирает пару границ в синтаксисе `ZRANGEBYSCORE`:
    /// `"1.5"`, `"(1.5"` (исключающая), `"-inf"`, `"+inf"`.
    pub fn parse(
        min: &str,
        max: &str,
    ) -> SkipListResult<Self> {
        let (min, min_exclusive) = parse_bound(min)?;
        let (max, max_exclusive) = parse_bound(max)?;
        Ok(Self::new(min, max, min_exclusive, max_exclusive))
    }
}

fn parse_bound(raw: &str) -> SkipListResult<(f64, bool)> {
    let (text, exclusive) = match raw.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (raw, false),
    };

    let value = match text {
        "-inf" => f64::NEG_INFINITY,
        "+inf" | "inf" => f64::INFINITY,
        _ => text.parse::<f64>().map_err(|_| SkipListError::InvalidRange {
            reason: format!("{raw:?} is not a valid score bound"),
        })?,
    };

    if value.is_nan() {
        return Err(SkipListError::InvalidRange {
            reason: format!("{raw:?} is NaN"),
        });
    }

    Ok((value, exclusive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_inclusive_and_exclusive() {
        let r = ScoreRange::new(1.0, 2.0, true, false);
        assert!(!r.value_gte_min(1.0));
        assert!(r.value_gte_min(1.5));
        assert!(r.value_lte_max(2.0));
        assert!(!r.contains(2.5));
    }

    #[test]
    fn test_is_empty() {
        assert!(ScoreRange::inclusive(3.0, 1.0).is_empty());
        assert!(ScoreRange::new(1.0, 1.0, true, false).is_empty());
        assert!(ScoreRange::new(1.0, 1.0, false, true).is_empty());
        assert!(!ScoreRange::inclusive(1.0, 1.0).is_empty());
        assert!(!ScoreRange::all().is_empty());
    }

    #[test]
    fn test_parse() {
        let r = ScoreRange::parse("(1", "+inf").unwrap();
        assert_eq!(r.min, 1.0);
        assert!(r.min_exclusive);
        assert_eq!(r.max, f64::INFINITY);
        assert!(!r.max_exclusive);

        let r = ScoreRange::parse("-inf", "(2.5").unwrap();
        assert_eq!(r.min, f64::NEG_INFINITY);
        assert!(r.max_exclusive);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ScoreRange::parse("abc", "1"),
            Err(SkipListError::InvalidRange { .. })
        ));
        assert!(ScoreRange::parse("1", "nan").is_err());
        assert!(ScoreRange::parse("(", "1").is_err());
    }
}
