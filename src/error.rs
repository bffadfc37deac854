use thiserror::Error;

/// 分析流程中的硬错误。软性情况（找不到科目行、单元格无法解析）不在此列：
/// 它们按约定降级为零值，由调用方在界面上提示。
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("未找到工作表「{requested}」。可用工作表: {}", .available.join("、"))]
    SheetNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("工作表「{sheet}」只有 {found} 列，取数至少需要 {required} 列。请在配置中改用自定义取数列。")]
    ColumnCount {
        sheet: String,
        found: usize,
        required: usize,
    },

    #[error("读取工作簿失败: {0}")]
    Workbook(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
