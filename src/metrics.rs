//! 占比、变动与衍生比率计算。所有除法统一零分母保护：分母为 0 时结果取
//! 0.0，任何路径都不产出 NaN/Inf。

use serde::Serialize;

use crate::statement::{StatementRow, StatementTable, PERIOD_COUNT};

/// 亿元换算到万元的倍数。
const YI_TO_WAN: f64 = 10_000.0;
/// 元换算到万元的除数。
const YUAN_TO_WAN: f64 = 10_000.0;
/// 无单位标注时按量级判定为"元"的阈值。
const YUAN_MAGNITUDE_THRESHOLD: f64 = 1_000_000.0;

/// 一个科目的三期数值加计算列：各期占比、本期较上期的变动额与变动幅度。
/// 每次请求现算现用，不落盘。
#[derive(Debug, Clone, Serialize)]
pub struct DerivedRow {
    pub subject: String,
    pub values: [f64; PERIOD_COUNT],
    /// 各期占比（0~1），与 values 同序。
    pub shares: [f64; PERIOD_COUNT],
    /// 本期 − 上期。
    pub delta: f64,
    /// 变动幅度（百分数）。
    pub delta_pct: f64,
}

/// 分子/分母 × 100，分母为零时取 0.0。
pub fn safe_pct(num: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        0.0
    } else {
        num / denom * 100.0
    }
}

/// 占比（0~1），分母为零时取 0.0。
pub fn safe_ratio(num: f64, denom: f64) -> f64 {
    if denom == 0.0 {
        0.0
    } else {
        num / denom
    }
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10_f64.powi(digits);
    (value * factor).round() / factor
}

/// 按合计行为每个科目计算各期占比与期间变动。
pub fn derive_rows(table: &StatementTable, total: &StatementRow) -> Vec<DerivedRow> {
    table.rows().iter().map(|row| derive_row(row, total)).collect()
}

pub fn derive_row(row: &StatementRow, total: &StatementRow) -> DerivedRow {
    let mut shares = [0.0; PERIOD_COUNT];
    for i in 0..PERIOD_COUNT {
        shares[i] = safe_ratio(row.values[i], total.values[i]);
    }
    let delta = row.values[0] - row.values[1];
    DerivedRow {
        subject: row.subject.clone(),
        values: row.values,
        shares,
        delta,
        delta_pct: safe_pct(delta, row.values[1]),
    }
}

/// 毛利率（百分数）：(收入 − 成本)/收入 × 100。
pub fn gross_margin(revenue: f64, cost: f64) -> f64 {
    safe_pct(revenue - cost, revenue)
}

/// 期间费用率（百分数）：费用/收入 × 100。
pub fn expense_ratio(expense: f64, revenue: f64) -> f64 {
    safe_pct(expense, revenue)
}

/// 按科目名中的单位标注把三期数值折算到万元口径。
/// 无标注时对大额数值（疑似"元"口径的 EBITDA 之类）按量级折算。
pub fn normalize_to_wan(subject: &str, values: [f64; PERIOD_COUNT]) -> [f64; PERIOD_COUNT] {
    let scale = if subject.contains('亿') {
        YI_TO_WAN
    } else if subject.contains("（元）") || subject.contains("(元)") {
        1.0 / YUAN_TO_WAN
    } else if subject.contains('万') {
        1.0
    } else if values.iter().any(|v| v.abs() >= YUAN_MAGNITUDE_THRESHOLD) {
        1.0 / YUAN_TO_WAN
    } else {
        1.0
    };
    [values[0] * scale, values[1] * scale, values[2] * scale]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::StatementRow;

    #[test]
    fn zero_denominator_never_divides() {
        assert_eq!(safe_pct(10.0, 0.0), 0.0);
        assert_eq!(safe_ratio(10.0, 0.0), 0.0);
        assert_eq!(gross_margin(0.0, 5.0), 0.0);
        assert_eq!(expense_ratio(3.0, 0.0), 0.0);
    }

    #[test]
    fn shares_follow_the_total_row() {
        let mut table = StatementTable::new();
        table.push(StatementRow::new("Cash", [100.0, 80.0, 50.0]));
        table.push(StatementRow::new("Receivables", [200.0, 220.0, 150.0]));
        table.push(StatementRow::new("Total assets", [300.0, 300.0, 200.0]));
        let total = table.find_row(&["Total assets"], &[], None);
        let derived = derive_rows(&table, &total);
        assert_eq!(round_to(derived[0].shares[0] * 100.0, 2), 33.33);
        assert_eq!(round_to(derived[1].shares[1] * 100.0, 2), 73.33);
        // 合计行对自身占比恒为 1。
        assert_eq!(derived[2].shares[0], 1.0);
    }

    #[test]
    fn all_zero_total_yields_zero_shares_everywhere() {
        let row = StatementRow::new("应付债券", [0.0, 0.0, 0.0]);
        let total = StatementRow::new("负债合计", [0.0, 0.0, 0.0]);
        let derived = derive_row(&row, &total);
        assert_eq!(derived.shares, [0.0, 0.0, 0.0]);
        assert_eq!(derived.delta_pct, 0.0);
        assert!(derived.shares.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn delta_and_pct_change_use_prior_period_base() {
        let row = StatementRow::new("存货", [120.0, 100.0, 90.0]);
        let total = StatementRow::new("资产总计", [1000.0, 1000.0, 1000.0]);
        let derived = derive_row(&row, &total);
        assert_eq!(derived.delta, 20.0);
        assert_eq!(derived.delta_pct, 20.0);
    }

    #[test]
    fn margins_match_hand_computation() {
        assert_eq!(gross_margin(200.0, 150.0), 25.0);
        assert_eq!(expense_ratio(30.0, 200.0), 15.0);
    }

    #[test]
    fn unit_normalization_targets_wan_base() {
        assert_eq!(
            normalize_to_wan("总资产（亿元）", [1.2, 1.1, 1.0]),
            [12_000.0, 11_000.0, 10_000.0]
        );
        assert_eq!(
            normalize_to_wan("利息支出（元）", [20_000.0, 10_000.0, 0.0]),
            [2.0, 1.0, 0.0]
        );
        assert_eq!(
            normalize_to_wan("营业收入（万元）", [500.0, 400.0, 300.0]),
            [500.0, 400.0, 300.0]
        );
        // 无标注的大额数按元处理。
        assert_eq!(
            normalize_to_wan("EBITDA", [2_000_000.0, 1_000_000.0, 0.0]),
            [200.0, 100.0, 0.0]
        );
        // 无标注的小额数（比率类）保持原值。
        assert_eq!(normalize_to_wan("资产负债率", [55.0, 52.0, 50.0]), [55.0, 52.0, 50.0]);
    }
}
