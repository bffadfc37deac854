//! 结构明细表的 Word 导出：居中标题加带框线表格，
//! 表头与合计/总计行加粗，科目列居中、数值列右对齐。

use docx_rs::{
    AlignmentType, Docx, Paragraph, Run, Table, TableCell, TableRow,
};

use crate::metrics::DerivedRow;
use crate::narrative::{format_amount, format_pct, is_aggregate_subject};
use crate::statement::PeriodLabels;

/// 半磅字号：标题 16pt，表头 10.5pt，数据 9pt。
const TITLE_SIZE: usize = 32;
const HEADER_SIZE: usize = 21;
const CELL_SIZE: usize = 18;

fn header_cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(
        Paragraph::new()
            .add_run(Run::new().add_text(text).bold().size(HEADER_SIZE))
            .align(AlignmentType::Center),
    )
}

fn body_cell(text: &str, bold: bool, align: AlignmentType) -> TableCell {
    let mut run = Run::new().add_text(text).size(CELL_SIZE);
    if bold {
        run = run.bold();
    }
    TableCell::new().add_paragraph(Paragraph::new().add_run(run).align(align))
}

/// 生成导出文档的字节流，标题通常形如「资产结构情况表」。
pub fn build_table_document(
    title: &str,
    labels: &PeriodLabels,
    rows: &[DerivedRow],
) -> Result<Vec<u8>, String> {
    let mut doc = Docx::new().add_paragraph(
        Paragraph::new()
            .add_run(Run::new().add_text(title).bold().size(TITLE_SIZE))
            .align(AlignmentType::Center),
    );

    let mut table_rows = vec![TableRow::new(vec![
        header_cell("科目"),
        header_cell(labels.current()),
        header_cell("占比(%)"),
        header_cell(labels.prior()),
        header_cell("占比(%)"),
        header_cell(labels.prior2()),
        header_cell("占比(%)"),
    ])];

    for row in rows {
        let bold = is_aggregate_subject(&row.subject);
        let mut cells = vec![body_cell(&row.subject, bold, AlignmentType::Center)];
        for period in 0..3usize {
            cells.push(body_cell(
                &format_amount(row.values[period]),
                bold,
                AlignmentType::Right,
            ));
            cells.push(body_cell(
                &format_pct(row.shares[period] * 100.0),
                bold,
                AlignmentType::Right,
            ));
        }
        table_rows.push(TableRow::new(cells));
    }

    doc = doc.add_table(Table::new(table_rows));

    let mut buf = Vec::new();
    doc.build()
        .pack(&mut std::io::Cursor::new(&mut buf))
        .map_err(|e| format!("生成 Word 失败: {e}"))?;
    Ok(buf)
}
