//! 附注文档处理：读取 .docx 正文并按科目名做关键词取窗。
//!
//! 附注只用于给变动分析指令补充上下文。单个文件坏了就降级成一条
//! 可读的中文提示，不影响其他附注文件，更不影响主底稿的分析。

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::warn;
use zip::ZipArchive;

/// 命中位置向前取的字符数。
const CONTEXT_BEFORE: usize = 600;
/// 命中位置向后取的字符数。
const CONTEXT_AFTER: usize = 1200;
/// 短于该字符数的段落视为噪音，不进全文。
const MIN_PARAGRAPH_CHARS: usize = 5;

pub const NO_CONTEXT_TEXT: &str = "（未检索到相关附注）";

/// 读取一个 .docx 的正文段落，段落间以换行连接。
/// 失败时返回面向用户的中文提示，说明该怎么补救。
pub fn extract_docx_text(path: &Path) -> Result<String, String> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let file =
        File::open(path).map_err(|e| format!("读取失败 {file_name}: {e}"))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|_| format!("格式错误：{file_name} 不是标准 .docx，请另存为后上传。"))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| format!("格式错误：{file_name} 缺少正文部件，请另存为标准 .docx 后上传。"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("读取失败 {file_name}: {e}"))?;

    Ok(document_xml_to_text(&xml))
}

/// 从 document.xml 拼正文：w:t 里的文字进段落，w:p 结束换段。
fn document_xml_to_text(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"w:t" => in_text_run = false,
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => {
                let text = current.trim().to_string();
                if text.chars().count() > MIN_PARAGRAPH_CHARS {
                    paragraphs.push(text);
                }
                current.clear();
            }
            Ok(Event::Text(t)) if in_text_run => {
                if let Ok(text) = t.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }
    paragraphs.join("\n")
}

/// 批量读取附注：成功的拼进全文（带来源标头），失败的收集提示文字。
pub fn load_note_documents(paths: &[impl AsRef<Path>]) -> (String, Vec<String>) {
    let mut full_text = String::new();
    let mut errors = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match extract_docx_text(path) {
            Ok(content) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                full_text.push_str(&format!("\n【来源：{name}】\n{content}"));
            }
            Err(message) => {
                warn!(path = %path.display(), "附注读取失败");
                errors.push(message);
            }
        }
    }
    (full_text, errors)
}

/// 在附注全文中检索科目（去空格后），返回首个命中位置前后各一段窗口，
/// 换行压平成空格。没找到返回占位提示。
pub fn find_context(subject: &str, full_text: &str) -> String {
    if full_text.is_empty() {
        return String::new();
    }
    let clean_subject: String = subject.chars().filter(|c| !c.is_whitespace()).collect();
    if clean_subject.is_empty() {
        return NO_CONTEXT_TEXT.to_string();
    }
    let chars: Vec<char> = full_text.chars().collect();
    let needle: Vec<char> = clean_subject.chars().collect();
    let hit = chars
        .windows(needle.len())
        .position(|window| window == needle.as_slice());
    let Some(idx) = hit else {
        return NO_CONTEXT_TEXT.to_string();
    };
    let start = idx.saturating_sub(CONTEXT_BEFORE);
    let end = (idx + CONTEXT_AFTER).min(chars.len());
    chars[start..end]
        .iter()
        .map(|c| if *c == '\n' { ' ' } else { *c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn create_temp_path(prefix: &str, ext: &str) -> PathBuf {
        let unique = format!(
            "{prefix}_{}_{}.{ext}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        );
        std::env::temp_dir().join(unique)
    }

    fn build_sample_docx(paragraphs: &[&str]) -> Vec<u8> {
        use docx_rs::{Docx, Paragraph, Run};
        let mut doc = Docx::new();
        for p in paragraphs {
            doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*p)));
        }
        let mut buf = Vec::new();
        doc.build()
            .pack(&mut std::io::Cursor::new(&mut buf))
            .expect("pack sample docx");
        buf
    }

    #[test]
    fn docx_text_extraction_keeps_substantial_paragraphs() {
        let path = create_temp_path("finreport_notes", "docx");
        let bytes = build_sample_docx(&[
            "货币资金主要为银行存款，期末余额较上年末增长较快。",
            "短",
        ]);
        fs::write(&path, bytes).expect("write sample docx");

        let text = extract_docx_text(&path).expect("extract docx");
        assert!(text.contains("货币资金主要为银行存款"));
        assert!(!text.contains('短'));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_docx_degrades_to_readable_message() {
        let path = create_temp_path("finreport_notes_bad", "docx");
        fs::write(&path, b"not a zip at all").expect("write garbage");

        let err = extract_docx_text(&path).unwrap_err();
        assert!(err.contains("不是标准 .docx"));

        let (full_text, errors) = load_note_documents(&[&path]);
        assert!(full_text.is_empty());
        assert_eq!(errors.len(), 1);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn context_lookup_windows_around_first_hit() {
        let text = format!("{}货币资金为银行活期存款。{}", "前".repeat(700), "后".repeat(1500));
        let ctx = find_context("货币 资金", &text);
        assert!(ctx.contains("货币资金为银行活期存款"));
        // 窗口不应覆盖全文开头。
        assert!(ctx.chars().count() < text.chars().count());
    }

    #[test]
    fn context_lookup_falls_back_when_missing() {
        assert_eq!(find_context("商誉", "附注全文没有该词"), NO_CONTEXT_TEXT);
        assert_eq!(find_context("商誉", ""), "");
    }

    #[test]
    fn context_flattens_newlines() {
        let ctx = find_context("存货", "上一段\n存货为原材料\n下一段");
        assert!(!ctx.contains('\n'));
        assert!(ctx.contains("存货为原材料"));
    }
}
