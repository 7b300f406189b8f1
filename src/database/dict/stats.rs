//! Статистика и проверка инвариантов словаря.

use std::{collections::HashSet, fmt::Write};

use zkit_error::{ensure, ValidationError};

use super::{
    dict_base::{Dict, EntryKey, HashTable, Tables},
    dict_type::DictType,
};
use crate::config::structures::DICT_MIN_SIZE;

/// Статистика одной таблицы.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    pub size: usize,
    pub used: usize,
    /// Количество непустых бакетов.
    pub non_empty_buckets: usize,
    /// Длина самой длинной цепочки.
    pub max_chain_len: usize,
}

/// Статистика словаря.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictStats {
    /// Выделенные таблицы: одна, две при рехешировании или ни одной.
    pub tables: Vec<TableStats>,
    pub rehash_index: Option<usize>,
    pub safe_iterators: usize,
}

impl TableStats {
    fn collect<K, V>(
        table: &HashTable,
        entries: &slotmap::SlotMap<EntryKey, super::dict_base::DictEntry<K, V>>,
    ) -> Self {
        let mut stats = TableStats {
            size: table.size(),
            used: table.used,
            ..Default::default()
        };

        for head in &table.buckets {
            let mut chain = 0;
            let mut cur = *head;
            while let Some(id) = cur {
                chain += 1;
                cur = entries.get(id).and_then(|e| e.next);
            }
            if chain > 0 {
                stats.non_empty_buckets += 1;
                stats.max_chain_len = stats.max_chain_len.max(chain);
            }
        }

        stats
    }

    /// Средняя длина непустой цепочки.
    pub fn average_chain_len(&self) -> f64 {
        if self.non_empty_buckets == 0 {
            return 0.0;
        }
        self.used as f64 / self.non_empty_buckets as f64
    }
}

impl DictStats {
    /// Форматирует статистику для вывода.
    pub fn format_report(&self) -> String {
        let mut report = String::from("Dict Statistics:\n");

        if self.tables.is_empty() {
            report.push_str("  No tables allocated\n");
            return report;
        }

        for (idx, t) in self.tables.iter().enumerate() {
            let _ = writeln!(report, "  Table {idx}:");
            let _ = writeln!(report, "    Size: {}", t.size);
            let _ = writeln!(report, "    Used: {}", t.used);
            let _ = writeln!(report, "    Non-empty buckets: {}", t.non_empty_buckets);
            let _ = writeln!(report, "    Max chain length: {}", t.max_chain_len);
            let _ = writeln!(
                report,
                "    Avg chain length: {:.2}",
                t.average_chain_len()
            );
        }

        if let Some(idx) = self.rehash_index {
            let _ = writeln!(report, "  Rehashing: bucket {idx}");
        }
        let _ = writeln!(report, "  Safe iterators: {}", self.safe_iterators);

        report
    }
}

impl<T: DictType> Dict<T> {
    /// Собирает статистику по таблицам.
    pub fn stats(&self) -> DictStats {
        let tables = (0..=1)
            .filter_map(|idx| self.tables.get(idx))
            .map(|t| TableStats::collect(t, &self.entries))
            .collect();

        DictStats {
            tables,
            rehash_index: self.rehash_index(),
            safe_iterators: self.safe_iterators(),
        }
    }

    /// Полная проверка структурных инвариантов, O(n).
    ///
    /// Проверяются размеры таблиц, принадлежность записей бакетам,
    /// счётчики `used`, пустота уже перенесённых бакетов и уникальность
    /// ключей.
    pub fn validate_invariants(&self) -> Result<(), ValidationError> {
        let mut seen: HashSet<EntryKey> = HashSet::with_capacity(self.entries.len());

        for idx in 0..=1 {
            let Some(table) = self.tables.get(idx) else {
                break;
            };

            let size = table.size();
            ensure!(
                size >= DICT_MIN_SIZE && size.is_power_of_two(),
                ValidationError::InvalidTableSize { size }
            );

            let mut counted = 0;
            for (slot, head) in table.buckets.iter().enumerate() {
                let mut cur = *head;
                while let Some(id) = cur {
                    let entry = self.entries.get(id).ok_or_else(|| {
                        ValidationError::MisplacedEntry {
                            message: format!("table {idx} bucket {slot} links a freed entry"),
                        }
                    })?;

                    ensure!(
                        seen.insert(id),
                        ValidationError::MisplacedEntry {
                            message: format!("entry linked twice (table {idx}, bucket {slot})"),
                        }
                    );
                    ensure!(
                        table.slot(self.ty.hash(&entry.key)) == slot,
                        ValidationError::MisplacedEntry {
                            message: format!("entry in table {idx} hashes outside bucket {slot}"),
                        }
                    );

                    counted += 1;
                    cur = entry.next;
                }
            }

            ensure!(
                counted == table.used,
                ValidationError::LengthMismatch {
                    expected: table.used,
                    actual: counted,
                }
            );
        }

        if let Tables::Rehashing { old, cursor, .. } = &self.tables {
            ensure!(
                old.buckets.iter().take(*cursor).all(Option::is_none),
                ValidationError::MisplacedEntry {
                    message: format!("old table has entries below rehash index {cursor}"),
                }
            );
        }

        ensure!(
            seen.len() == self.entries.len(),
            ValidationError::LengthMismatch {
                expected: self.entries.len(),
                actual: seen.len(),
            }
        );

        // Первое совпадение при поиске должно быть самой записью.
        for (id, entry) in &self.entries {
            ensure!(
                self.lookup(&entry.key, self.ty.hash(&entry.key)) == Some(id),
                ValidationError::MisplacedEntry {
                    message: "duplicate key across tables".to_string(),
                }
            );
        }

        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use crate::{
        config::ResizePolicy,
        database::dict::{Dict, MurmurDictType},
    };

    /// Тест проверяет статистику пустого словаря.
    #[test]
    fn test_stats_empty() {
        let d: Dict<MurmurDictType<String, ()>> = Dict::new(MurmurDictType::default());
        let stats = d.stats();

        assert!(stats.tables.is_empty());
        assert_eq!(stats.rehash_index, None);
        assert!(stats.format_report().contains("No tables allocated"));
        assert!(d.validate_invariants().is_ok());
    }

    /// Тест проверяет статистику во время рехеширования.
    #[test]
    fn test_stats_during_rehash() {
        let mut d = Dict::new(MurmurDictType::default());
        d.set_resize_policy(ResizePolicy::Avoid);
        for i in 0..25 {
            d.add(format!("k{i}"), i).unwrap();
        }

        let stats = d.stats();
        assert_eq!(stats.tables.len(), 2);
        assert_eq!(stats.tables[0].size, 4);
        assert_eq!(stats.tables[1].size, 64);
        assert_eq!(stats.tables[0].used + stats.tables[1].used, 25);
        assert!(stats.tables[0].max_chain_len >= 6);
        assert_eq!(stats.rehash_index, Some(0));

        let report = stats.format_report();
        assert!(report.contains("Table 1:"));
        assert!(report.contains("Rehashing: bucket 0"));
        assert!(d.validate_invariants().is_ok());
    }

    /// Тест проверяет инварианты на протяжении всего рехеширования.
    #[test]
    fn test_invariants_hold_through_rehash() {
        let mut d = Dict::new(MurmurDictType::default());
        for i in 0..200 {
            d.add(format!("key-{i}"), i).unwrap();
            assert!(d.validate_invariants().is_ok(), "after insert {i}");
        }
        while d.rehash(1) {
            assert!(d.validate_invariants().is_ok());
        }
        for i in (0..200).step_by(3) {
            assert!(d.remove(&format!("key-{i}")));
        }
        assert!(d.validate_invariants().is_ok());
    }
}
