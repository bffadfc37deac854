pub mod config;
pub mod error;
pub mod export_docx;
pub mod export_xlsx;
pub mod metrics;
pub mod narrative;
pub mod notes;
pub mod report;
pub mod statement;
pub mod workbook;

pub use config::{AnalysisConfig, ColumnMode};
pub use error::AnalysisError;
pub use report::{
    analyze_cashflow, analyze_composition, analyze_profitability, analyze_solvency,
    report_to_json, run_analysis, AnalysisReport, CompositionSection,
};
pub use statement::{PeriodLabels, RowMatch, StatementRow, StatementTable};
pub use workbook::{extract_date_label, resolve_sheet_name, StatementWorkbook};
