//! 结构明细表的 Excel 导出。
//!
//! 布局沿用标准底稿的习惯：首行标题，第 3 个物理行是表头，科目在第 0 列，
//! 三期数值与占比交替排在第 1~6 列。数值按数字写入（不是文本），
//! 因此用自定义取数列 [1,3,5] 回读能还原到分位。

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};

use crate::metrics::DerivedRow;
use crate::narrative::is_aggregate_subject;
use crate::statement::PeriodLabels;

pub const EXPORT_SHEET_NAME: &str = "数据明细";
/// 回读导出文件时的取数列（数值列 1/3/5）。
pub const EXPORT_VALUE_COLUMNS: [usize; 3] = [1, 3, 5];

const SUBJECT_COL_WIDTH: f64 = 22.0;
const VALUE_COL_WIDTH: f64 = 14.0;

/// 生成导出工作簿的字节流，调用方负责落盘或下发。
pub fn build_table_workbook(
    title: &str,
    labels: &PeriodLabels,
    rows: &[DerivedRow],
) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(EXPORT_SHEET_NAME)
        .map_err(|e| format!("设置工作表名失败: {e}"))?;

    let title_format = Format::new()
        .set_font_size(14)
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(0xD3D3D3))
        .set_border(FormatBorder::Thin);
    let subject_format = Format::new()
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);
    let subject_bold_format = subject_format.clone().set_bold();
    let number_format = Format::new()
        .set_num_format("#,##0.00")
        .set_align(FormatAlign::Right)
        .set_border(FormatBorder::Thin);
    let number_bold_format = number_format.clone().set_bold();

    (|| -> Result<(), rust_xlsxwriter::XlsxError> {
        worksheet.set_column_width(0, SUBJECT_COL_WIDTH)?;
        for col in 1..=6u16 {
            worksheet.set_column_width(col, VALUE_COL_WIDTH)?;
        }

        worksheet.merge_range(0, 0, 0, 6, title, &title_format)?;
        worksheet.set_row_height(0, 26)?;

        // 日期表头带【】括注，与标准底稿一致，回读时标签能原样提出来。
        let header = [
            "科目".to_string(),
            format!("【{}】", labels.current()),
            "占比(%)".to_string(),
            format!("【{}】", labels.prior()),
            "占比(%)".to_string(),
            format!("【{}】", labels.prior2()),
            "占比(%)".to_string(),
        ];
        for (col, text) in header.iter().enumerate() {
            worksheet.write_with_format(2, col as u16, text, &header_format)?;
        }

        for (idx, row) in rows.iter().enumerate() {
            let r = (idx + 3) as u32;
            let bold = is_aggregate_subject(&row.subject);
            let (s_fmt, n_fmt) = if bold {
                (&subject_bold_format, &number_bold_format)
            } else {
                (&subject_format, &number_format)
            };
            worksheet.write_with_format(r, 0, row.subject.as_str(), s_fmt)?;
            for period in 0..3usize {
                let value_col = (1 + period * 2) as u16;
                worksheet.write_with_format(r, value_col, row.values[period], n_fmt)?;
                worksheet.write_with_format(
                    r,
                    value_col + 1,
                    row.shares[period] * 100.0,
                    n_fmt,
                )?;
            }
        }
        Ok(())
    })()
    .map_err(|e| format!("写入导出表格失败: {e}"))?;

    workbook
        .save_to_buffer()
        .map_err(|e| format!("生成 Excel 失败: {e}"))
}
