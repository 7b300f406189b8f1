use std::fmt::Write;

use slotmap::SecondaryMap;
use zkit_error::{ensure, ValidationError};

use super::{
    level::{LevelSampler, MAX_LEVEL},
    skiplist_base::{NodeKey, ZSkipList},
};

/// Статистика структуры ZSkipList.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipListStatistics {
    /// Количество узлов
    pub node_count: usize,
    /// Распределение узлов по уровням (индекс 0 — узлы уровня 1)
    pub level_distribution: Vec<usize>,
    /// Текущий максимальный уровень
    pub current_max_level: usize,
    /// Максимально возможный уровень
    pub max_possible_level: usize,
    /// Средний уровень узла
    pub average_level: f64,
}

impl SkipListStatistics {
    /// Создает пустую статистику.
    pub fn empty(max_level: usize) -> Self {
        Self {
            node_count: 0,
            level_distribution: vec![0; max_level],
            current_max_level: 1,
            max_possible_level: max_level,
            average_level: 0.0,
        }
    }

    /// Вычисляет средний уровень.
    pub fn compute_average_level(&mut self) {
        if self.node_count == 0 {
            self.average_level = 0.0;
            return;
        }

        let total_levels: usize = self
            .level_distribution
            .iter()
            .enumerate()
            .map(|(level, &count)| (level + 1) * count)
            .sum();

        self.average_level = total_levels as f64 / self.node_count as f64;
    }

    /// Форматирует статистику для вывода.
    pub fn format_report(&self) -> String {
        let mut report = String::from("ZSkipList Statistics:\n");
        let _ = writeln!(report, "  Total nodes: {}", self.node_count);
        let _ = writeln!(report, "  Current max level: {}", self.current_max_level);
        let _ = writeln!(report, "  Max possible level: {}", self.max_possible_level);
        let _ = writeln!(report, "  Average level: {:.2}", self.average_level);
        report.push_str("  Level distribution:\n");

        for (level, &count) in self.level_distribution.iter().enumerate() {
            if count > 0 {
                let percentage = (count as f64 / self.node_count as f64) * 100.0;
                let _ = writeln!(
                    report,
                    "    Level {}: {} nodes ({:.1}%)",
                    level + 1,
                    count,
                    percentage
                );
            }
        }

        report
    }
}

impl<S: LevelSampler> ZSkipList<S> {
    /// Собирает статистику уровней.
    pub fn statistics(&self) -> SkipListStatistics {
        let mut stats = SkipListStatistics::empty(MAX_LEVEL);
        stats.current_max_level = self.level;

        for node in self.iter() {
            stats.node_count += 1;
            stats.level_distribution[node.level() - 1] += 1;
        }

        stats.compute_average_level();
        stats
    }

    /// Полная проверка структурных инвариантов, O(n * level).
    ///
    /// Проверяются порядок, длина, обратные ссылки, `tail` и span каждой
    /// ссылки на каждом уровне.
    pub fn validate_invariants(&self) -> Result<(), ValidationError> {
        ensure!(
            (1..=MAX_LEVEL).contains(&self.level),
            ValidationError::InvalidLevel {
                node_level: self.level,
                max_level: MAX_LEVEL,
            }
        );
        ensure!(
            self.header[self.level..].iter().all(|l| l.forward.is_none()),
            ValidationError::InvalidLevel {
                node_level: MAX_LEVEL,
                max_level: self.level,
            }
        );

        // Уровень 0: порядок, обратные ссылки, tail, ранги.
        let mut ranks: SecondaryMap<NodeKey, usize> = SecondaryMap::new();
        let mut prev: Option<NodeKey> = None;
        let mut cur = self.header[0].forward;
        let mut count = 0;

        while let Some(key) = cur {
            let node = &self.nodes[key];
            count += 1;
            ensure!(
                count <= self.nodes.len(),
                ValidationError::LengthMismatch {
                    expected: self.nodes.len(),
                    actual: count,
                }
            );

            let level = node.level();
            ensure!(
                (1..=self.level).contains(&level),
                ValidationError::InvalidLevel {
                    node_level: level,
                    max_level: self.level,
                }
            );
            ensure!(
                node.backward == prev,
                ValidationError::InvalidBackwardLink {
                    message: format!("node {:?} at rank {count}", node.member),
                }
            );

            if let Some(p) = prev {
                let p = &self.nodes[p];
                ensure!(
                    p.score < node.score || (p.score == node.score && p.member < node.member),
                    ValidationError::SortOrderViolation {
                        message: format!(
                            "({}, {:?}) is not before ({}, {:?})",
                            p.score, p.member, node.score, node.member
                        ),
                    }
                );
            }

            ranks.insert(key, count);
            prev = Some(key);
            cur = node.levels[0].forward;
        }

        ensure!(
            count == self.length && self.nodes.len() == self.length,
            ValidationError::LengthMismatch {
                expected: self.length,
                actual: count,
            }
        );
        ensure!(
            self.tail == prev,
            ValidationError::InvalidBackwardLink {
                message: "tail is not the last node".to_string(),
            }
        );

        // Все уровни: span совпадает с разностью рангов.
        for i in 0..self.level {
            let mut pred: Option<NodeKey> = None;
            let mut pred_rank = 0;

            loop {
                let link = self.level_ref(pred, i);
                let target_rank = match link.forward {
                    Some(next) => ranks.get(next).copied().ok_or_else(|| {
                        ValidationError::SortOrderViolation {
                            message: format!("level {i} links a node missing from level 0"),
                        }
                    })?,
                    None => self.length,
                };

                ensure!(
                    target_rank >= pred_rank,
                    ValidationError::SortOrderViolation {
                        message: format!("level {i} goes backwards after rank {pred_rank}"),
                    }
                );
                ensure!(
                    link.span == target_rank - pred_rank,
                    ValidationError::SpanMismatch {
                        level: i,
                        stored: link.span,
                        actual: target_rank - pred_rank,
                    }
                );

                match link.forward {
                    Some(next) => {
                        pred = Some(next);
                        pred_rank = target_rank;
                    }
                    None => break,
                }
            }
        }

        Ok(())
    }
}
