//! 文案模板：把算好的数字填进固定中文段落。
//!
//! 模板是纯字符串拼装，唯一的分支是按符号选词（增加/减少、增幅/降幅）。
//! 概念行没匹配到时照常用零值渲染，由界面提示"全零输出不可信"，
//! 文案生成本身从不报错。

use crate::metrics::DerivedRow;
use crate::statement::{PeriodLabels, StatementRow};

/// 结构综述里列示的最大构成项目数。
pub const TOP_SUBJECT_COUNT: usize = 5;

/// 合计/小计类行的标识关键词，选构成项目时剔除。
const AGGREGATE_MARKERS: [&str; 3] = ["合计", "总计", "小计"];

pub fn is_aggregate_subject(subject: &str) -> bool {
    AGGREGATE_MARKERS.iter().any(|m| subject.contains(m))
}

/// 千分位 + 两位小数，对应底稿里的金额展示格式。
pub fn format_amount(value: f64) -> String {
    let raw = format!("{:.2}", value.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));
    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*ch);
    }
    let sign = if value < 0.0 && raw != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

pub fn format_pct(value: f64) -> String {
    format!("{value:.2}")
}

/// 非合计行按本期值降序取前 N 个科目名。
pub fn top_subjects(rows: &[DerivedRow], n: usize) -> Vec<String> {
    let mut details: Vec<&DerivedRow> = rows
        .iter()
        .filter(|r| !is_aggregate_subject(&r.subject))
        .collect();
    details.sort_by(|a, b| {
        b.values[0]
            .partial_cmp(&a.values[0])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    details.iter().take(n).map(|r| r.subject.clone()).collect()
}

/// 结构综述：三期总额（从早到晚）加主要构成项目。
pub fn composition_summary(analysis_name: &str, total: &StatementRow, top: &[String]) -> String {
    format!(
        "报告期内，发行人{analysis_name}总额分别为{}万元、{}万元和{}万元。\n从结构来看，主要构成项目包括：{} 等。",
        format_amount(total.values[2]),
        format_amount(total.values[1]),
        format_amount(total.values[0]),
        top.join("、")
    )
}

/// 单科目的变动分析指令块，附注线索由调用方检索后传入。
pub fn change_prompt(
    row: &DerivedRow,
    labels: &PeriodLabels,
    note_context: &str,
) -> String {
    let direction = if row.delta >= 0.0 { "增加" } else { "减少" };
    let pct_label = if row.delta >= 0.0 { "增幅" } else { "降幅" };
    format!(
        "【任务】分析“{subject}”变动原因。\n\
         【1. 数据趋势】\n\
         {d2}、{d1}及{d0}，余额分别为{v2}万元、{v1}万元和{v0}万元，占比分别为{s2}%、{s1}%和{s0}%。\n\
         【2. 变动情况】\n\
         截至{d0}，较上期{direction}{delta}万元，{pct_label}{pct}%。\n\
         【3. 附注线索】\n\
         {note_context}\n\
         【4. 写作要求】\n\
         结合数据和附注分析原因。如附注未提及，写“主要系业务规模变动所致”。",
        subject = row.subject,
        d0 = labels.current(),
        d1 = labels.prior(),
        d2 = labels.prior2(),
        v0 = format_amount(row.values[0]),
        v1 = format_amount(row.values[1]),
        v2 = format_amount(row.values[2]),
        s0 = format_pct(row.shares[0] * 100.0),
        s1 = format_pct(row.shares[1] * 100.0),
        s2 = format_pct(row.shares[2] * 100.0),
        delta = format_amount(row.delta.abs()),
        pct = format_pct(row.delta_pct.abs()),
    )
}

/// 现金流量单活动综述：流入、流出、净额加主要流出（或流入）构成。
pub fn cash_activity_summary(
    activity_name: &str,
    inflow: &StatementRow,
    outflow: &StatementRow,
    net: &StatementRow,
    top_items: &[String],
) -> String {
    let direction = if net.values[0] >= 0.0 { "净流入" } else { "净流出" };
    let mut text = format!(
        "报告期内，发行人{activity_name}现金流入小计分别为{}万元、{}万元和{}万元，现金流出小计分别为{}万元、{}万元和{}万元，最近一期{direction}{}万元。",
        format_amount(inflow.values[2]),
        format_amount(inflow.values[1]),
        format_amount(inflow.values[0]),
        format_amount(outflow.values[2]),
        format_amount(outflow.values[1]),
        format_amount(outflow.values[0]),
        format_amount(net.values[0].abs()),
    );
    if !top_items.is_empty() {
        text.push_str(&format!("主要构成项目包括：{} 等。", top_items.join("、")));
    }
    text
}

/// 盈利能力综述：收入、毛利率与期间费用率，毛利率按符号选"上升/下降"。
pub fn profitability_summary(
    revenue: &StatementRow,
    margins: [f64; 3],
    expense_ratios: [f64; 3],
) -> String {
    let margin_trend = if margins[0] >= margins[1] { "上升" } else { "下降" };
    format!(
        "报告期内，发行人营业收入分别为{}万元、{}万元和{}万元；毛利率分别为{}%、{}%和{}%，最近一期较上期有所{margin_trend}；期间费用率分别为{}%、{}%和{}%。",
        format_amount(revenue.values[2]),
        format_amount(revenue.values[1]),
        format_amount(revenue.values[0]),
        format_pct(margins[2]),
        format_pct(margins[1]),
        format_pct(margins[0]),
        format_pct(expense_ratios[2]),
        format_pct(expense_ratios[1]),
        format_pct(expense_ratios[0]),
    )
}

/// 偿债指标综述：每个指标一句话，按最近一期与上期的高低选词。
pub fn solvency_summary(rows: &[StatementRow]) -> String {
    let mut sentences = Vec::new();
    for row in rows {
        let trend = if row.values[0] >= row.values[1] { "高于" } else { "低于" };
        sentences.push(format!(
            "{}分别为{}、{}和{}，最近一期{trend}上期水平",
            row.subject,
            format_pct(row.values[2]),
            format_pct(row.values[1]),
            format_pct(row.values[0]),
        ));
    }
    if sentences.is_empty() {
        return "报告期内偿债指标数据缺失。".to_string();
    }
    format!("报告期内，发行人{}。", sentences.join("；"))
}
