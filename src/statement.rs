//! 报表数据模型与科目行模糊匹配。
//!
//! 一张 `StatementTable` 按底稿原始顺序保存科目行（合计行位于其明细行之后，
//! 顺序本身有语义），每行带三期数值（本期、上期、上上期）。科目名不保证唯一，
//! 匹配按"精确匹配严格优先于包含匹配"的规则消歧。

use serde::Serialize;

pub const PERIOD_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRow {
    pub subject: String,
    /// 三期数值，顺序为 [本期, 上期, 上上期]。
    pub values: [f64; PERIOD_COUNT],
}

impl StatementRow {
    pub fn new(subject: impl Into<String>, values: [f64; PERIOD_COUNT]) -> Self {
        Self {
            subject: subject.into(),
            values,
        }
    }

    pub fn zeroed(subject: impl Into<String>) -> Self {
        Self::new(subject, [0.0; PERIOD_COUNT])
    }

    pub fn non_zero_count(&self) -> usize {
        self.values.iter().filter(|v| **v != 0.0).count()
    }
}

/// 三期的表头展示文字，与 `StatementRow::values` 同序。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodLabels(pub [String; PERIOD_COUNT]);

impl PeriodLabels {
    pub fn current(&self) -> &str {
        &self.0[0]
    }
    pub fn prior(&self) -> &str {
        &self.0[1]
    }
    pub fn prior2(&self) -> &str {
        &self.0[2]
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementTable {
    rows: Vec<StatementRow>,
}

/// 一次行查询的带标签结果：唯一命中、多行命中（待消歧）、或未命中。
#[derive(Debug, Clone)]
pub enum RowMatch {
    Resolved(StatementRow),
    Ambiguous(Vec<StatementRow>),
    Missing,
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn normalize_label(text: &str) -> String {
    strip_whitespace(text).to_lowercase()
}

impl StatementTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn push(&mut self, row: StatementRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[StatementRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 匹配候选同义词，返回带标签结果。精确匹配（去空白后相等）严格优先，
    /// 精确命中时包含匹配不参与；仅在无精确命中时收集包含匹配，
    /// `exclude_substrings` 用于剔除被更长科目名串入的行
    /// （例如查"负债合计"时排除"流动负债合计"）。
    pub fn match_rows(&self, candidates: &[&str], exclude_substrings: &[&str]) -> RowMatch {
        let normalized_candidates: Vec<String> =
            candidates.iter().map(|c| normalize_label(c)).collect();
        let normalized_excludes: Vec<String> = exclude_substrings
            .iter()
            .map(|e| normalize_label(e))
            .collect();

        let mut exact = Vec::new();
        for row in &self.rows {
            let label = normalize_label(&row.subject);
            if normalized_candidates.iter().any(|c| *c == label) {
                exact.push(row.clone());
            }
        }
        if !exact.is_empty() {
            return if exact.len() == 1 {
                RowMatch::Resolved(exact.remove(0))
            } else {
                RowMatch::Ambiguous(exact)
            };
        }

        let mut contains = Vec::new();
        for row in &self.rows {
            let label = normalize_label(&row.subject);
            let hit = normalized_candidates
                .iter()
                .any(|c| !c.is_empty() && label.contains(c.as_str()));
            if !hit {
                continue;
            }
            if normalized_excludes
                .iter()
                .any(|e| !e.is_empty() && label.contains(e.as_str()))
            {
                continue;
            }
            contains.push(row.clone());
        }
        match contains.len() {
            0 => RowMatch::Missing,
            1 => RowMatch::Resolved(contains.remove(0)),
            _ => RowMatch::Ambiguous(contains),
        }
    }

    /// 解析出单一行。多行命中时取"三期非零值最多"的一行（底稿中常见
    /// 全零的装饰性重复行，带数的行才是真实数据行）；未命中时返回
    /// `default` 或全零行，从不报错。
    pub fn find_row(
        &self,
        candidates: &[&str],
        exclude_substrings: &[&str],
        default: Option<StatementRow>,
    ) -> StatementRow {
        match self.match_rows(candidates, exclude_substrings) {
            RowMatch::Resolved(row) => row,
            RowMatch::Ambiguous(rows) => pick_most_non_zero(rows),
            RowMatch::Missing => default.unwrap_or_else(|| {
                StatementRow::zeroed(candidates.first().copied().unwrap_or(""))
            }),
        }
    }

    /// 第一个包含匹配行的序号，用于切取连续行区间
    /// （如"活动小节起始行到其小计行之间的全部明细"）。
    pub fn find_row_index(&self, candidates: &[&str]) -> Option<usize> {
        let normalized_candidates: Vec<String> =
            candidates.iter().map(|c| normalize_label(c)).collect();
        self.rows.iter().position(|row| {
            let label = normalize_label(&row.subject);
            normalized_candidates
                .iter()
                .any(|c| !c.is_empty() && label.contains(c.as_str()))
        })
    }

    /// 半开区间 [start, end) 内的行切片。
    pub fn slice(&self, start: usize, end: usize) -> &[StatementRow] {
        let end = end.min(self.rows.len());
        let start = start.min(end);
        &self.rows[start..end]
    }
}

impl FromIterator<StatementRow> for StatementTable {
    fn from_iter<T: IntoIterator<Item = StatementRow>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

fn pick_most_non_zero(mut rows: Vec<StatementRow>) -> StatementRow {
    let mut best = 0usize;
    for (idx, row) in rows.iter().enumerate() {
        if row.non_zero_count() > rows[best].non_zero_count() {
            best = idx;
        }
    }
    rows.remove(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> StatementTable {
        StatementTable::from_iter([
            StatementRow::new("Cash", [100.0, 80.0, 50.0]),
            StatementRow::new("Receivables", [200.0, 220.0, 150.0]),
            StatementRow::new("Total assets", [300.0, 300.0, 200.0]),
        ])
    }

    #[test]
    fn exact_match_resolves_requested_row() {
        let row = sample_table().find_row(&["Total assets"], &[], None);
        assert_eq!(row.values, [300.0, 300.0, 200.0]);
    }

    #[test]
    fn matching_ignores_whitespace_on_both_sides() {
        let mut table = StatementTable::new();
        table.push(StatementRow::new("货币 资金", [10.0, 9.0, 8.0]));
        let a = table.find_row(&["货币资金"], &[], None);
        let b = table.find_row(&[" 货币  资金 "], &[], None);
        assert_eq!(a, b);
        assert_eq!(a.values, [10.0, 9.0, 8.0]);
    }

    #[test]
    fn exact_match_strictly_dominates_substring_match() {
        // 精确命中行即使三期全零，也不得被非零的包含命中行抢走。
        let mut table = StatementTable::new();
        table.push(StatementRow::new("流动负债合计", [500.0, 400.0, 300.0]));
        table.push(StatementRow::new("负债合计", [0.0, 0.0, 0.0]));
        let row = table.find_row(&["负债合计"], &[], None);
        assert_eq!(row.subject, "负债合计");
        assert_eq!(row.values, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn ambiguous_substring_matches_prefer_most_non_zero_values() {
        let mut table = StatementTable::new();
        table.push(StatementRow::new("应收账款（注）", [0.0, 0.0, 0.0]));
        table.push(StatementRow::new("应收账款净额", [120.0, 110.0, 0.0]));
        let row = table.find_row(&["应收账款"], &[], None);
        assert_eq!(row.subject, "应收账款净额");
    }

    #[test]
    fn exclude_substrings_filter_contains_matches() {
        let mut table = StatementTable::new();
        table.push(StatementRow::new("流动负债小计", [500.0, 400.0, 300.0]));
        table.push(StatementRow::new("负债总额", [800.0, 700.0, 600.0]));
        let row = table.find_row(&["负债"], &["流动"], None);
        assert_eq!(row.subject, "负债总额");
    }

    #[test]
    fn missing_row_falls_back_to_zeroed_default() {
        let row = sample_table().find_row(&["Goodwill"], &[], None);
        assert_eq!(row.subject, "Goodwill");
        assert_eq!(row.values, [0.0; PERIOD_COUNT]);

        let with_default = sample_table().find_row(
            &["Goodwill"],
            &[],
            Some(StatementRow::new("商誉", [1.0, 2.0, 3.0])),
        );
        assert_eq!(with_default.subject, "商誉");
    }

    #[test]
    fn match_rows_reports_ambiguity_instead_of_hiding_it() {
        let mut table = StatementTable::new();
        table.push(StatementRow::new("存货", [5.0, 4.0, 3.0]));
        table.push(StatementRow::new("存货", [0.0, 0.0, 0.0]));
        match table.match_rows(&["存货"], &[]) {
            RowMatch::Ambiguous(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected ambiguous match, got {other:?}"),
        }
    }

    #[test]
    fn find_row_index_returns_first_substring_hit() {
        let mut table = StatementTable::new();
        table.push(StatementRow::new("一、经营活动产生的现金流量", [0.0; 3]));
        table.push(StatementRow::new("销售商品收到的现金", [90.0, 80.0, 70.0]));
        table.push(StatementRow::new("经营活动现金流入小计", [90.0, 80.0, 70.0]));
        assert_eq!(table.find_row_index(&["经营活动"]), Some(0));
        assert_eq!(table.find_row_index(&["流入小计"]), Some(2));
        assert_eq!(table.find_row_index(&["筹资活动"]), None);
        assert_eq!(table.slice(1, 2).len(), 1);
    }
}
