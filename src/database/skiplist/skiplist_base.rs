use std::fmt;

use slotmap::{new_key_type, SlotMap};
use tracing::debug;
use zkit_error::{ensure, SkipListError, SkipListResult};

use super::{
    level::{GeometricLevels, LevelSampler, MAX_LEVEL},
    range::ScoreRange,
};
use crate::config::SkipListConfig;

new_key_type! {
    /// Индекс узла в арене пропускного списка.
    pub struct NodeKey;
}

/// Ссылка уровня: следующий узел и количество узлов, которые она
/// перепрыгивает.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct Level {
    pub(super) forward: Option<NodeKey>,
    pub(super) span: usize,
}

/// Узел пропускного списка.
#[derive(Debug)]
pub struct SkipListNode {
    pub(super) member: String,
    pub(super) score: f64,
    pub(super) backward: Option<NodeKey>,
    pub(super) levels: Vec<Level>,
}

/// Пропускной список с рангами, упорядоченный по `(score, member)`.
///
/// Заголовок хранится отдельно от арены узлов и всегда содержит
/// `MAX_LEVEL` ссылок. Предшественник `None` в обходах обозначает
/// заголовок.
pub struct ZSkipList<S: LevelSampler = GeometricLevels> {
    pub(super) header: Vec<Level>,
    pub(super) nodes: SlotMap<NodeKey, SkipListNode>,
    pub(super) tail: Option<NodeKey>,
    pub(super) length: usize,
    pub(super) level: usize,
    sampler: S,
}

/// Итератор по узлам списка в прямом порядке.
pub struct SkipListIter<'a> {
    nodes: &'a SlotMap<NodeKey, SkipListNode>,
    current: Option<NodeKey>,
    remaining: usize,
}

/// Итератор по узлам списка в обратном порядке.
pub struct ReverseIter<'a> {
    nodes: &'a SlotMap<NodeKey, SkipListNode>,
    current: Option<NodeKey>,
    remaining: usize,
}

/// Итератор по узлам, score которых попадает в диапазон.
pub struct RangeIter<'a> {
    nodes: &'a SlotMap<NodeKey, SkipListNode>,
    current: Option<NodeKey>,
    range: ScoreRange,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SkipListNode {
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    /// Количество уровней узла.
    pub fn level(&self) -> usize {
        self.levels.len()
    }

    /// `true`, если узел стоит строго раньше пары `(score, member)`.
    #[inline]
    fn precedes(
        &self,
        score: f64,
        member: &str,
    ) -> bool {
        self.score < score || (self.score == score && self.member.as_str() < member)
    }

    #[inline]
    fn matches(
        &self,
        score: f64,
        member: &str,
    ) -> bool {
        self.score == score && self.member == member
    }
}

impl ZSkipList<GeometricLevels> {
    /// Создаёт пустой список со случайным сидом генератора уровней.
    pub fn new() -> Self {
        Self::with_sampler(GeometricLevels::new())
    }

    /// Создаёт пустой список с детерминированной раскладкой уровней.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_sampler(GeometricLevels::with_seed(seed))
    }

    pub fn with_config(config: &SkipListConfig) -> Self {
        match config.seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
    }
}

impl<S: LevelSampler> ZSkipList<S> {
    pub fn with_sampler(sampler: S) -> Self {
        Self {
            header: vec![Level::default(); MAX_LEVEL],
            nodes: SlotMap::with_key(),
            tail: None,
            length: 0,
            level: 1,
            sampler,
        }
    }

    /// Вставляет пару `(score, member)` и возвращает созданный узел.
    ///
    /// Повтор пары и NaN отклоняются без изменения списка.
    pub fn insert(
        &mut self,
        score: f64,
        member: String,
    ) -> SkipListResult<&SkipListNode> {
        ensure!(!score.is_nan(), SkipListError::NanScore);

        let mut update: [Option<NodeKey>; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];
        let mut x: Option<NodeKey> = None;

        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            while let Some(next) = self.forward(x, i) {
                if !self.nodes[next].precedes(score, &member) {
                    break;
                }
                rank[i] += self.level_ref(x, i).span;
                x = Some(next);
            }
            update[i] = x;
        }

        if let Some(next) = self.forward(x, 0) {
            ensure!(
                !self.nodes[next].matches(score, &member),
                SkipListError::DuplicateElement { score, member }
            );
        }

        let level = self.sampler.sample_level().clamp(1, MAX_LEVEL);
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = None;
                self.header[i].span = self.length;
            }
            debug!(from = self.level, to = level, "skiplist level grew");
            self.level = level;
        }

        let key = self.nodes.insert(SkipListNode {
            member,
            score,
            backward: update[0],
            levels: vec![Level::default(); level],
        });

        for i in 0..level {
            let pred = *self.level_ref(update[i], i);
            let passed = rank[0] - rank[i];

            self.nodes[key].levels[i] = Level {
                forward: pred.forward,
                span: pred.span - passed,
            };
            *self.level_mut(update[i], i) = Level {
                forward: Some(key),
                span: passed + 1,
            };
        }

        // Уровни выше нового узла перепрыгивают его.
        for i in level..self.level {
            self.level_mut(update[i], i).span += 1;
        }

        match self.nodes[key].levels[0].forward {
            Some(next) => self.nodes[next].backward = Some(key),
            None => self.tail = Some(key),
        }
        self.length += 1;

        Ok(&self.nodes[key])
    }

    /// Удаляет пару `(score, member)`. Возвращает `true`, если она была.
    pub fn delete(
        &mut self,
        score: f64,
        member: &str,
    ) -> bool {
        let (update, x) = self.find_predecessors(score, member);

        match self.forward(x, 0) {
            Some(target) if self.nodes[target].matches(score, member) => {
                self.unlink_node(target, &update);
                self.nodes.remove(target);
                true
            }
            _ => false,
        }
    }

    /// Меняет score существующего элемента.
    ///
    /// Если новый score сохраняет позицию, узел обновляется на месте, иначе
    /// элемент удаляется и вставляется заново.
    pub fn update_score(
        &mut self,
        cur_score: f64,
        member: &str,
        new_score: f64,
    ) -> SkipListResult<&SkipListNode> {
        ensure!(!new_score.is_nan(), SkipListError::NanScore);

        let (update, x) = self.find_predecessors(cur_score, member);
        let target = match self.forward(x, 0) {
            Some(t) if self.nodes[t].matches(cur_score, member) => t,
            _ => {
                return Err(SkipListError::ElementNotFound {
                    score: cur_score,
                    member: member.to_string(),
                })
            }
        };

        let node = &self.nodes[target];
        let after_prev = node
            .backward
            .map_or(true, |b| self.nodes[b].score < new_score);
        let before_next = node.levels[0]
            .forward
            .map_or(true, |f| self.nodes[f].score > new_score);

        if new_score == cur_score || (after_prev && before_next) {
            self.nodes[target].score = new_score;
            return Ok(&self.nodes[target]);
        }

        // Пара с новым score уже есть: отказ до удаления старого узла.
        let (_, dup) = self.find_predecessors(new_score, member);
        if let Some(next) = self.forward(dup, 0) {
            ensure!(
                !self.nodes[next].matches(new_score, member),
                SkipListError::DuplicateElement {
                    score: new_score,
                    member: member.to_string(),
                }
            );
        }

        self.unlink_node(target, &update);
        let member = match self.nodes.remove(target) {
            Some(node) => node.member,
            None => member.to_string(),
        };
        self.insert(new_score, member)
    }

    /// `true`, если хотя бы один элемент может попасть в диапазон.
    pub fn is_in_range(
        &self,
        range: &ScoreRange,
    ) -> bool {
        if range.is_empty() {
            return false;
        }

        let last_ok = self
            .tail
            .is_some_and(|t| range.value_gte_min(self.nodes[t].score));
        let first_ok = self.header[0]
            .forward
            .is_some_and(|f| range.value_lte_max(self.nodes[f].score));

        last_ok && first_ok
    }

    /// Первый узел, score которого попадает в диапазон.
    pub fn first_in_range(
        &self,
        range: &ScoreRange,
    ) -> Option<&SkipListNode> {
        self.first_in_range_key(range).map(|k| &self.nodes[k])
    }

    /// Последний узел, score которого попадает в диапазон.
    pub fn last_in_range(
        &self,
        range: &ScoreRange,
    ) -> Option<&SkipListNode> {
        if !self.is_in_range(range) {
            return None;
        }

        let mut x: Option<NodeKey> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if !range.value_lte_max(self.nodes[next].score) {
                    break;
                }
                x = Some(next);
            }
        }

        let node = &self.nodes[x?];
        range.value_gte_min(node.score).then_some(node)
    }

    /// Ранг элемента (с единицы) или `None`, если его нет.
    pub fn rank_of(
        &self,
        score: f64,
        member: &str,
    ) -> Option<usize> {
        let mut rank = 0;
        let mut x: Option<NodeKey> = None;

        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                let node = &self.nodes[next];
                let not_after =
                    node.score < score || (node.score == score && node.member.as_str() <= member);
                if !not_after {
                    break;
                }
                rank += self.level_ref(x, i).span;
                x = Some(next);
            }

            if let Some(k) = x {
                if self.nodes[k].matches(score, member) {
                    return Some(rank);
                }
            }
        }

        None
    }

    /// Узел с рангом `rank` (с единицы). Для 0 и рангов больше длины
    /// возвращает `None`.
    pub fn element_by_rank(
        &self,
        rank: usize,
    ) -> Option<&SkipListNode> {
        self.key_by_rank(rank).map(|k| &self.nodes[k])
    }

    /// Удаляет все элементы, score которых попадает в диапазон, и
    /// возвращает их по возрастанию.
    pub fn delete_range_by_score(
        &mut self,
        range: &ScoreRange,
    ) -> Vec<(f64, String)> {
        let mut removed = Vec::new();
        if range.is_empty() {
            return removed;
        }

        let mut update: [Option<NodeKey>; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut x: Option<NodeKey> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if range.value_gte_min(self.nodes[next].score) {
                    break;
                }
                x = Some(next);
            }
            update[i] = x;
        }

        let mut cur = self.forward(x, 0);
        while let Some(k) = cur {
            if !range.value_lte_max(self.nodes[k].score) {
                break;
            }
            cur = self.nodes[k].levels[0].forward;
            self.unlink_node(k, &update);
            if let Some(node) = self.nodes.remove(k) {
                removed.push((node.score, node.member));
            }
        }

        removed
    }

    /// Удаляет элементы с рангами `start..=end` (с единицы).
    pub fn delete_range_by_rank(
        &mut self,
        start: usize,
        end: usize,
    ) -> Vec<(f64, String)> {
        let mut removed = Vec::new();
        if start == 0 || start > end {
            return removed;
        }

        let mut update: [Option<NodeKey>; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut traversed = 0;
        let mut x: Option<NodeKey> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                let span = self.level_ref(x, i).span;
                if traversed + span >= start {
                    break;
                }
                traversed += span;
                x = Some(next);
            }
            update[i] = x;
        }

        traversed += 1;
        let mut cur = self.forward(x, 0);
        while let Some(k) = cur {
            if traversed > end {
                break;
            }
            cur = self.nodes[k].levels[0].forward;
            self.unlink_node(k, &update);
            if let Some(node) = self.nodes.remove(k) {
                removed.push((node.score, node.member));
            }
            traversed += 1;
        }

        removed
    }

    pub fn first(&self) -> Option<&SkipListNode> {
        self.header[0].forward.map(|k| &self.nodes[k])
    }

    pub fn last(&self) -> Option<&SkipListNode> {
        self.tail.map(|k| &self.nodes[k])
    }

    pub fn iter(&self) -> SkipListIter<'_> {
        SkipListIter {
            nodes: &self.nodes,
            current: self.header[0].forward,
            remaining: self.length,
        }
    }

    pub fn iter_rev(&self) -> ReverseIter<'_> {
        ReverseIter {
            nodes: &self.nodes,
            current: self.tail,
            remaining: self.length,
        }
    }

    /// Итератор по узлам диапазона в порядке возрастания.
    pub fn range_by_score(
        &self,
        range: &ScoreRange,
    ) -> RangeIter<'_> {
        RangeIter {
            nodes: &self.nodes,
            current: self.first_in_range_key(range),
            range: *range,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Текущий максимальный уровень (от 1 до `MAX_LEVEL`).
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.header.fill(Level::default());
        self.tail = None;
        self.length = 0;
        self.level = 1;
    }

    /// Следующий узел на уровне `i` после `pred` (`None` — заголовок).
    #[inline]
    pub(super) fn forward(
        &self,
        pred: Option<NodeKey>,
        i: usize,
    ) -> Option<NodeKey> {
        self.level_ref(pred, i).forward
    }

    #[inline]
    pub(super) fn level_ref(
        &self,
        pred: Option<NodeKey>,
        i: usize,
    ) -> &Level {
        match pred {
            None => &self.header[i],
            Some(k) => &self.nodes[k].levels[i],
        }
    }

    #[inline]
    fn level_mut(
        &mut self,
        pred: Option<NodeKey>,
        i: usize,
    ) -> &mut Level {
        match pred {
            None => &mut self.header[i],
            Some(k) => &mut self.nodes[k].levels[i],
        }
    }

    /// Последние узлы на каждом уровне, стоящие строго раньше пары.
    fn find_predecessors(
        &self,
        score: f64,
        member: &str,
    ) -> ([Option<NodeKey>; MAX_LEVEL], Option<NodeKey>) {
        let mut update: [Option<NodeKey>; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut x: Option<NodeKey> = None;

        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if !self.nodes[next].precedes(score, member) {
                    break;
                }
                x = Some(next);
            }
            update[i] = x;
        }

        (update, x)
    }

    fn first_in_range_key(
        &self,
        range: &ScoreRange,
    ) -> Option<NodeKey> {
        if !self.is_in_range(range) {
            return None;
        }

        let mut x: Option<NodeKey> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                if range.value_gte_min(self.nodes[next].score) {
                    break;
                }
                x = Some(next);
            }
        }

        let next = self.forward(x, 0)?;
        range.value_lte_max(self.nodes[next].score).then_some(next)
    }

    fn key_by_rank(
        &self,
        rank: usize,
    ) -> Option<NodeKey> {
        if rank == 0 || rank > self.length {
            return None;
        }

        let mut traversed = 0;
        let mut x: Option<NodeKey> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.forward(x, i) {
                let span = self.level_ref(x, i).span;
                if traversed + span > rank {
                    break;
                }
                traversed += span;
                x = Some(next);
            }
            if traversed == rank {
                return x;
            }
        }

        None
    }

    /// Вынимает узел `x` из всех уровней. `update` — предшественники,
    /// найденные спуском.
    fn unlink_node(
        &mut self,
        x: NodeKey,
        update: &[Option<NodeKey>; MAX_LEVEL],
    ) {
        for i in 0..self.level {
            let pred = update[i];
            if self.forward(pred, i) == Some(x) {
                let removed = self.nodes[x].levels[i];
                let link = self.level_mut(pred, i);
                link.span = link.span + removed.span - 1;
                link.forward = removed.forward;
            } else {
                self.level_mut(pred, i).span -= 1;
            }
        }

        let next = self.nodes[x].levels[0].forward;
        let back = self.nodes[x].backward;
        match next {
            Some(n) => self.nodes[n].backward = back,
            None => self.tail = back,
        }

        while self.level > 1 && self.header[self.level - 1].forward.is_none() {
            self.level -= 1;
        }
        self.length -= 1;
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для ZSkipList, итераторов
////////////////////////////////////////////////////////////////////////////////

impl Default for ZSkipList<GeometricLevels> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, S: LevelSampler> IntoIterator for &'a ZSkipList<S> {
    type Item = &'a SkipListNode;
    type IntoIter = SkipListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> Iterator for SkipListIter<'a> {
    type Item = &'a SkipListNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.nodes[self.current?];
        self.current = node.levels[0].forward;
        self.remaining = self.remaining.saturating_sub(1);
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> Iterator for ReverseIter<'a> {
    type Item = &'a SkipListNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.nodes[self.current?];
        self.current = node.backward;
        self.remaining = self.remaining.saturating_sub(1);
        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = &'a SkipListNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.nodes[self.current?];
        if !self.range.value_lte_max(node.score) {
            self.current = None;
            return None;
        }
        self.current = node.levels[0].forward;
        Some(node)
    }
}

impl<S: LevelSampler> PartialEq for ZSkipList<S> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| a.score == b.score && a.member == b.member)
    }
}

impl<S: LevelSampler> fmt::Debug for ZSkipList<S> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ZSkipList")
            .field("length", &self.length)
            .field("level", &self.level)
            .field(
                "elements",
                &self
                    .iter()
                    .map(|n| (n.score, n.member.as_str()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
