//! 分析编排：从一本底稿生成五个互相独立的分析章节。
//!
//! 每个章节各自捕获错误并降级为诊断文字（例如指标表缺失不影响资产、
//! 负债等其余章节），整本底稿打不开才整体失败。边界上所有错误都转成
//! 面向用户的 `String`。

use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::metrics::{
    derive_rows, expense_ratio, gross_margin, normalize_to_wan, round_to, DerivedRow,
};
use crate::narrative::{
    cash_activity_summary, change_prompt, composition_summary, format_amount, format_pct,
    profitability_summary, solvency_summary, top_subjects, TOP_SUBJECT_COUNT,
};
use crate::notes::{find_context, load_note_documents};
use crate::statement::{PeriodLabels, StatementRow, StatementTable};
use crate::workbook::StatementWorkbook;

/// 只有本期占比超过该阈值的科目才生成变动分析指令。
const PROMPT_SHARE_THRESHOLD: f64 = 0.01;

const CASH_ACTIVITIES: [&str; 3] = ["经营活动", "投资活动", "筹资活动"];

pub type SectionResult<T> = Result<T, String>;

#[derive(Debug, Clone, Serialize)]
pub struct SubjectPrompt {
    pub subject: String,
    /// 本期占比（百分数，两位小数）。
    pub share_pct: f64,
    pub prompt: String,
}

/// 资产/负债结构章节：明细、综述与逐科目指令。
#[derive(Debug, Clone, Serialize)]
pub struct CompositionSection {
    pub analysis_name: String,
    pub labels: PeriodLabels,
    pub total: StatementRow,
    pub rows: Vec<DerivedRow>,
    pub summary: String,
    pub prompts: Vec<SubjectPrompt>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityFlow {
    pub name: String,
    pub inflow: StatementRow,
    pub outflow: StatementRow,
    pub net: StatementRow,
    pub top_items: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashflowSection {
    pub labels: PeriodLabels,
    pub activities: Vec<ActivityFlow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfitabilitySection {
    pub labels: PeriodLabels,
    pub revenue: StatementRow,
    pub cost: StatementRow,
    /// 三期毛利率（百分数），与数值列同序。
    pub margins: [f64; 3],
    /// 三期期间费用率（百分数）。
    pub expense_ratios: [f64; 3],
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolvencySection {
    pub labels: PeriodLabels,
    pub ratios: Vec<StatementRow>,
    pub ebitda: StatementRow,
    pub summary: String,
}

#[derive(Debug)]
pub struct AnalysisReport {
    pub note_errors: Vec<String>,
    pub asset: SectionResult<CompositionSection>,
    pub liability: SectionResult<CompositionSection>,
    pub cashflow: SectionResult<CashflowSection>,
    pub profitability: SectionResult<ProfitabilitySection>,
    pub solvency: SectionResult<SolvencySection>,
}

fn subject_prompts(rows: &[DerivedRow], labels: &PeriodLabels, notes_text: &str) -> Vec<SubjectPrompt> {
    rows.iter()
        .filter(|r| r.shares[0] > PROMPT_SHARE_THRESHOLD)
        .map(|r| SubjectPrompt {
            subject: r.subject.clone(),
            share_pct: round_to(r.shares[0] * 100.0, 2),
            prompt: change_prompt(r, labels, &find_context(&r.subject, notes_text)),
        })
        .collect()
}

/// 通用结构分析：解析合计行、算占比、出综述和逐科目指令。
pub fn analyze_composition(
    workbook: &mut StatementWorkbook,
    sheet: &str,
    analysis_name: &str,
    total_candidates: &[&str],
    total_excludes: &[&str],
    config: &AnalysisConfig,
    notes_text: &str,
) -> Result<CompositionSection, AnalysisError> {
    let (table, labels) = workbook.read_statement_table(sheet, config)?;
    let total = table.find_row(total_candidates, total_excludes, None);
    let rows = derive_rows(&table, &total);
    let top = top_subjects(&rows, TOP_SUBJECT_COUNT);
    let summary = composition_summary(analysis_name, &total, &top);
    let prompts = subject_prompts(&rows, &labels, notes_text);
    info!(sheet, analysis_name, rows = rows.len(), "composition section done");
    Ok(CompositionSection {
        analysis_name: analysis_name.to_string(),
        labels,
        total,
        rows,
        summary,
        prompts,
    })
}

/// 现金流量章节：按活动切块，取流入/流出小计与净额，并列主要构成。
pub fn analyze_cashflow(
    workbook: &mut StatementWorkbook,
    config: &AnalysisConfig,
) -> Result<CashflowSection, AnalysisError> {
    let (table, labels) = workbook.read_statement_table(&config.sheet_cashflow, config)?;

    let starts: Vec<Option<usize>> = CASH_ACTIVITIES
        .iter()
        .map(|name| table.find_row_index(&[name]))
        .collect();

    let mut activities = Vec::new();
    for (i, name) in CASH_ACTIVITIES.iter().enumerate() {
        let Some(start) = starts[i] else {
            activities.push(missing_activity(name));
            continue;
        };
        let end = starts
            .iter()
            .skip(i + 1)
            .flatten()
            .copied()
            .find(|next| *next > start)
            .unwrap_or(table.len());
        let section: StatementTable = table.slice(start, end).iter().cloned().collect();

        let inflow = section.find_row(
            &["现金流入小计"],
            &[],
            Some(StatementRow::zeroed(format!("{name}现金流入小计"))),
        );
        let outflow = section.find_row(
            &["现金流出小计"],
            &[],
            Some(StatementRow::zeroed(format!("{name}现金流出小计"))),
        );
        let net_label = format!("{name}产生的现金流量净额");
        let net = section.find_row(
            &[net_label.as_str(), "净额"],
            &[],
            Some(StatementRow::zeroed(net_label.clone())),
        );

        let zero_total = StatementRow::zeroed("");
        let details: Vec<DerivedRow> = section
            .rows()
            .iter()
            .filter(|r| {
                !r.subject.contains("小计")
                    && !r.subject.contains("净额")
                    && r.non_zero_count() > 0
            })
            .map(|r| crate::metrics::derive_row(r, &zero_total))
            .collect();
        let top_items = top_subjects(&details, TOP_SUBJECT_COUNT);

        let summary = cash_activity_summary(name, &inflow, &outflow, &net, &top_items);
        activities.push(ActivityFlow {
            name: name.to_string(),
            inflow,
            outflow,
            net,
            top_items,
            summary,
        });
    }

    Ok(CashflowSection { labels, activities })
}

fn missing_activity(name: &str) -> ActivityFlow {
    let inflow = StatementRow::zeroed(format!("{name}现金流入小计"));
    let outflow = StatementRow::zeroed(format!("{name}现金流出小计"));
    let net = StatementRow::zeroed(format!("{name}产生的现金流量净额"));
    let summary = cash_activity_summary(name, &inflow, &outflow, &net, &[]);
    ActivityFlow {
        name: name.to_string(),
        inflow,
        outflow,
        net,
        top_items: Vec::new(),
        summary,
    }
}

/// 盈利能力章节：收入、成本、四项期间费用，算毛利率和费用率。
pub fn analyze_profitability(
    workbook: &mut StatementWorkbook,
    config: &AnalysisConfig,
) -> Result<ProfitabilitySection, AnalysisError> {
    let (table, labels) = workbook.read_statement_table(&config.sheet_income, config)?;

    let revenue = table.find_row(&["营业收入", "营业总收入"], &[], None);
    let cost = table.find_row(&["营业成本", "营业总成本"], &["税金"], None);
    let expense_subjects = ["销售费用", "管理费用", "研发费用", "财务费用"];
    let mut expenses = [0.0f64; 3];
    for subject in expense_subjects {
        let row = table.find_row(&[subject], &[], None);
        for period in 0..3 {
            expenses[period] += row.values[period];
        }
    }

    let mut margins = [0.0f64; 3];
    let mut expense_ratios = [0.0f64; 3];
    for period in 0..3 {
        margins[period] = gross_margin(revenue.values[period], cost.values[period]);
        expense_ratios[period] = expense_ratio(expenses[period], revenue.values[period]);
    }

    let summary = profitability_summary(&revenue, margins, expense_ratios);
    Ok(ProfitabilitySection {
        labels,
        revenue,
        cost,
        margins,
        expense_ratios,
        summary,
    })
}

/// 偿债指标章节：从指标计算表取常用比率，EBITDA 类大额数先折算万元。
pub fn analyze_solvency(
    workbook: &mut StatementWorkbook,
    config: &AnalysisConfig,
) -> Result<SolvencySection, AnalysisError> {
    let (table, labels) = workbook.read_statement_table(&config.sheet_ratio, config)?;

    let ratio_queries: [&[&str]; 4] = [
        &["资产负债率"],
        &["流动比率"],
        &["速动比率"],
        &["EBITDA利息保障倍数", "利息保障倍数"],
    ];
    let ratios: Vec<StatementRow> = ratio_queries
        .iter()
        .map(|candidates| table.find_row(candidates, &[], None))
        .collect();

    let ebitda_raw = table.find_row(&["EBITDA"], &["保障", "利息"], None);
    let ebitda = StatementRow::new(
        ebitda_raw.subject.clone(),
        normalize_to_wan(&ebitda_raw.subject, ebitda_raw.values),
    );

    let summary = solvency_summary(&ratios);
    Ok(SolvencySection {
        labels,
        ratios,
        ebitda,
        summary,
    })
}

/// 跑完整分析。底稿打不开整体失败；单个章节的错误收在各自的结果里。
pub fn run_analysis(
    excel_path: &Path,
    config: &AnalysisConfig,
    note_paths: &[PathBuf],
) -> Result<AnalysisReport, String> {
    let (notes_text, note_errors) = load_note_documents(note_paths);

    let mut workbook = StatementWorkbook::open(excel_path).map_err(|e| e.to_string())?;
    info!(path = %excel_path.display(), sheets = workbook.sheet_names().len(), "workbook opened");

    let asset = analyze_composition(
        &mut workbook,
        &config.sheet_asset,
        "资产",
        &["资产总计", "资产合计"],
        &["流动", "非流动"],
        config,
        &notes_text,
    )
    .map_err(|e| e.to_string());

    let liability = analyze_composition(
        &mut workbook,
        &config.sheet_liability,
        "负债",
        &["负债合计", "负债总计"],
        &["流动", "所有者权益", "股东权益"],
        config,
        &notes_text,
    )
    .map_err(|e| e.to_string());

    let cashflow = analyze_cashflow(&mut workbook, config).map_err(|e| e.to_string());
    let profitability = analyze_profitability(&mut workbook, config).map_err(|e| e.to_string());
    let solvency = analyze_solvency(&mut workbook, config).map_err(|e| e.to_string());

    Ok(AnalysisReport {
        note_errors,
        asset,
        liability,
        cashflow,
        profitability,
        solvency,
    })
}

/// 明细表的展示行：金额千分位两位小数，占比两位小数百分数。
pub fn display_rows(rows: &[DerivedRow]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            json!({
                "subject": row.subject,
                "cells": [
                    format_amount(row.values[0]),
                    format_pct(row.shares[0] * 100.0),
                    format_amount(row.values[1]),
                    format_pct(row.shares[1] * 100.0),
                    format_amount(row.values[2]),
                    format_pct(row.shares[2] * 100.0),
                ],
            })
        })
        .collect()
}

fn section_value<T: Serialize>(id: &str, name: &str, result: &SectionResult<T>) -> Value {
    match result {
        Ok(payload) => match serde_json::to_value(payload) {
            Ok(value) => json!({"id": id, "name": name, "status": "ok", "payload": value}),
            Err(e) => json!({
                "id": id,
                "name": name,
                "status": "error",
                "error": format!("序列化章节失败: {e}"),
            }),
        },
        Err(message) => json!({"id": id, "name": name, "status": "error", "error": message}),
    }
}

/// 汇总成一个 JSON 负载，供界面或适配器消费。
pub fn report_to_json(report: &AnalysisReport) -> Value {
    let mut sections = vec![
        section_value("asset", "资产结构分析", &report.asset),
        section_value("liability", "负债结构分析", &report.liability),
        section_value("cashflow", "现金流量分析", &report.cashflow),
        section_value("profitability", "盈利能力分析", &report.profitability),
        section_value("solvency", "偿债指标分析", &report.solvency),
    ];

    // 结构章节补充格式化后的展示表格。
    for (section, result) in sections
        .iter_mut()
        .zip([&report.asset, &report.liability])
    {
        if let (Some(obj), Ok(payload)) = (section.as_object_mut(), result) {
            if let Some(payload_obj) = obj
                .get_mut("payload")
                .and_then(|p| p.as_object_mut())
            {
                payload_obj.insert("table".to_string(), Value::Array(display_rows(&payload.rows)));
            }
        }
    }

    json!({
        "note_errors": report.note_errors,
        "sections": sections,
    })
}
