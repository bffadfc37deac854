use serde::Deserialize;

pub const DEFAULT_HEADER_ROW: usize = 2;

pub const DEFAULT_SHEET_ASSET: &str = "1.合并资产表";
pub const DEFAULT_SHEET_LIABILITY: &str = "2.合并负债表";
pub const DEFAULT_SHEET_INCOME: &str = "3.合并利润表";
pub const DEFAULT_SHEET_CASHFLOW: &str = "4.合并现金流量表";
pub const DEFAULT_SHEET_RATIO: &str = "5.财务指标计算表";

/// 指标类工作表的识别标记：请求的表名包含该子串时走表头探测逻辑。
pub const RATIO_SHEET_MARKER: &str = "指标";

/// 标准底稿的取数列：科目列 0，三期数值列 4/5/6。
pub const STANDARD_VALUE_COLUMNS: [usize; 3] = [4, 5, 6];

/// 取数列模式：标准模板固定偏移，或用户指定的任意三列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColumnMode {
    Standard,
    Custom { columns: [usize; 3] },
}

impl ColumnMode {
    pub fn value_columns(&self) -> [usize; 3] {
        match self {
            ColumnMode::Standard => STANDARD_VALUE_COLUMNS,
            ColumnMode::Custom { columns } => *columns,
        }
    }
}

impl Default for ColumnMode {
    fn default() -> Self {
        ColumnMode::Standard
    }
}

/// 一次分析请求的全部可配置项。除类型转换外不做校验。
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    #[serde(default = "default_sheet_asset")]
    pub sheet_asset: String,
    #[serde(default = "default_sheet_liability")]
    pub sheet_liability: String,
    #[serde(default = "default_sheet_income")]
    pub sheet_income: String,
    #[serde(default = "default_sheet_cashflow")]
    pub sheet_cashflow: String,
    #[serde(default = "default_sheet_ratio")]
    pub sheet_ratio: String,
    #[serde(default)]
    pub column_mode: ColumnMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            sheet_asset: DEFAULT_SHEET_ASSET.to_string(),
            sheet_liability: DEFAULT_SHEET_LIABILITY.to_string(),
            sheet_income: DEFAULT_SHEET_INCOME.to_string(),
            sheet_cashflow: DEFAULT_SHEET_CASHFLOW.to_string(),
            sheet_ratio: DEFAULT_SHEET_RATIO.to_string(),
            column_mode: ColumnMode::Standard,
        }
    }
}

fn default_header_row() -> usize {
    DEFAULT_HEADER_ROW
}
fn default_sheet_asset() -> String {
    DEFAULT_SHEET_ASSET.to_string()
}
fn default_sheet_liability() -> String {
    DEFAULT_SHEET_LIABILITY.to_string()
}
fn default_sheet_income() -> String {
    DEFAULT_SHEET_INCOME.to_string()
}
fn default_sheet_cashflow() -> String {
    DEFAULT_SHEET_CASHFLOW.to_string()
}
fn default_sheet_ratio() -> String {
    DEFAULT_SHEET_RATIO.to_string()
}
