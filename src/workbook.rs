//! 工作簿读取：Sheet 名解析、表头探测、取数列切取与数值清洗。
//!
//! 底稿模板近似固定：标准报表科目在第 0 列，三期数值在固定偏移列；
//! 指标计算表的表头位置和日期列不固定，需要启发式探测。
//! 数值单元格解析失败一律按 0.0 处理（既定策略，坏单元格不中断流程）。

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use crate::config::{AnalysisConfig, RATIO_SHEET_MARKER};
use crate::error::{AnalysisError, Result};
use crate::statement::{PeriodLabels, StatementRow, StatementTable};

/// 表头探测最多扫描的行数。
const HEADER_SCAN_ROWS: usize = 10;
/// 探测失败时指标表的默认表头行。
const RATIO_HEADER_FALLBACK: usize = 1;
/// 表头行中标识"这是表头"的关键词。
const HEADER_MARKERS: [&str; 2] = ["项目", "指标"];

pub struct StatementWorkbook {
    sheets: Sheets<BufReader<File>>,
    sheet_names: Vec<String>,
}

impl StatementWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = open_workbook_auto(path)
            .map_err(|e| AnalysisError::Workbook(format!("打开 {} 失败: {e}", path.display())))?;
        let sheet_names = sheets.sheet_names().to_owned();
        Ok(Self {
            sheets,
            sheet_names,
        })
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// 读取一张报表，产出科目表与三期表头文字。
    ///
    /// 指标类工作表（请求名含 [`RATIO_SHEET_MARKER`]）先探测表头行，
    /// 再按表头文字探测日期列；标准报表用配置的表头行与固定取数列。
    pub fn read_statement_table(
        &mut self,
        requested: &str,
        config: &AnalysisConfig,
    ) -> Result<(StatementTable, PeriodLabels)> {
        let actual = resolve_sheet_name(requested, &self.sheet_names)?;
        let range = self
            .sheets
            .worksheet_range(&actual)
            .map_err(|e| AnalysisError::Workbook(format!("读取工作表「{actual}」失败: {e}")))?;
        let grid: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();

        let is_ratio_sheet = requested.contains(RATIO_SHEET_MARKER);
        let header_idx = if is_ratio_sheet {
            detect_header_row(&grid)
        } else {
            config.header_row
        };
        let header: Vec<String> = grid
            .get(header_idx)
            .map(|row| row.iter().map(cell_text).collect())
            .unwrap_or_default();

        let value_cols = if is_ratio_sheet {
            detect_date_columns(&header).unwrap_or_else(|| config.column_mode.value_columns())
        } else {
            config.column_mode.value_columns()
        };
        debug!(sheet = %actual, header_idx, ?value_cols, "statement sheet resolved");

        let required = value_cols.iter().max().copied().unwrap_or(0) + 1;
        let width = grid.iter().map(|row| row.len()).max().unwrap_or(0);
        if width < required {
            return Err(AnalysisError::ColumnCount {
                sheet: actual,
                found: width,
                required,
            });
        }

        let labels = PeriodLabels([
            extract_date_label(header.get(value_cols[0]).map(String::as_str).unwrap_or("")),
            extract_date_label(header.get(value_cols[1]).map(String::as_str).unwrap_or("")),
            extract_date_label(header.get(value_cols[2]).map(String::as_str).unwrap_or("")),
        ]);

        let mut table = StatementTable::new();
        for row in grid.iter().skip(header_idx + 1) {
            let subject = row.first().map(cell_text).unwrap_or_default();
            if subject.is_empty() {
                continue;
            }
            let values = [
                row.get(value_cols[0]).map(cell_to_f64).unwrap_or(0.0),
                row.get(value_cols[1]).map(cell_to_f64).unwrap_or(0.0),
                row.get(value_cols[2]).map(cell_to_f64).unwrap_or(0.0),
            ];
            table.push(StatementRow::new(subject, values));
        }
        Ok((table, labels))
    }
}

/// Sheet 名解析：先精确相等，再去掉双方全部空白后相等，仍无则报
/// [`AnalysisError::SheetNotFound`] 并带上全部可用表名。
pub fn resolve_sheet_name(requested: &str, available: &[String]) -> Result<String> {
    if let Some(name) = available.iter().find(|n| n.as_str() == requested) {
        return Ok(name.clone());
    }
    let wanted: String = requested.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(name) = available.iter().find(|n| {
        let stripped: String = n.chars().filter(|c| !c.is_whitespace()).collect();
        stripped == wanted
    }) {
        return Ok(name.clone());
    }
    Err(AnalysisError::SheetNotFound {
        requested: requested.to_string(),
        available: available.to_vec(),
    })
}

/// 在前 [`HEADER_SCAN_ROWS`] 行内找第一个含表头关键词的行；找不到则退回
/// 第 [`RATIO_HEADER_FALLBACK`] 行。
fn detect_header_row(grid: &[Vec<Data>]) -> usize {
    for (idx, row) in grid.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let hit = row.iter().any(|cell| {
            let text = cell_text(cell);
            HEADER_MARKERS.iter().any(|m| text.contains(m))
        });
        if hit {
            return idx;
        }
    }
    RATIO_HEADER_FALLBACK
}

/// 按表头文字挑日期列：以 "20" 开头、含 "年"/"期"、或含字面 "T" 的列。
/// 凑满三列按出现顺序取前三，不足三列交回调用方用固定偏移。
fn detect_date_columns(header: &[String]) -> Option<[usize; 3]> {
    let hits: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, text)| {
            let t = text.trim();
            t.starts_with("20") || t.contains('年') || t.contains('期') || t.contains('T')
        })
        .map(|(idx, _)| idx)
        .collect();
    if hits.len() >= 3 {
        Some([hits[0], hits[1], hits[2]])
    } else {
        None
    }
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[【\[](.*?)[】\]]").expect("静态正则"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4})").expect("静态正则"))
}

/// 从日期列表头提取展示标签：优先取【…】/[…] 括注内文字，
/// 其次取首个四位年份拼成 "NNNN年"，都没有则原样返回。
pub fn extract_date_label(header: &str) -> String {
    let text = header.trim();
    if let Some(caps) = bracket_re().captures(text) {
        return caps[1].to_string();
    }
    if let Some(caps) = year_re().captures(text) {
        return format!("{}年", &caps[1]);
    }
    text.to_string()
}

fn cell_text(cell: &Data) -> String {
    cell.to_string().trim().to_string()
}

/// 数值清洗：数字类型直取，文本去千分位后解析，其余（含解析失败）一律 0.0。
fn cell_to_f64(cell: &Data) -> f64 {
    match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => s.trim().replace(',', "").parse::<f64>().unwrap_or(0.0),
        Data::DateTime(dt) => dt.as_f64(),
        _ => 0.0,
    }
}
