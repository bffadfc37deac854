use anyhow::{bail, Context, Result};
use chrono::Local;
use finreport::export_docx::build_table_document;
use finreport::export_xlsx::build_table_workbook;
use finreport::report::{report_to_json, run_analysis, CompositionSection, SectionResult};
use finreport::AnalysisConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "\
用法: finreport --excel <底稿.xlsx> [选项]

选项:
  --excel <path>     Excel 底稿（必填，.xlsx/.xlsm）
  --notes <path>     Word 附注，可重复传入
  --config <path>    分析配置 JSON（表名/表头行/取数列覆盖）
  --out-dir <dir>    导出明细表（Word/Excel）与分析文案到该目录
  --pretty           JSON 输出带缩进
";

struct CliArgs {
    excel: PathBuf,
    notes: Vec<PathBuf>,
    config: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    pretty: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut excel = None;
    let mut notes = Vec::new();
    let mut config = None;
    let mut out_dir = None;
    let mut pretty = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--excel" => excel = Some(PathBuf::from(next_value(&mut iter, "--excel")?)),
            "--notes" => notes.push(PathBuf::from(next_value(&mut iter, "--notes")?)),
            "--config" => config = Some(PathBuf::from(next_value(&mut iter, "--config")?)),
            "--out-dir" => out_dir = Some(PathBuf::from(next_value(&mut iter, "--out-dir")?)),
            "--pretty" => pretty = true,
            "--help" | "-h" => {
                print!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("未知参数: {other}\n{USAGE}"),
        }
    }
    let Some(excel) = excel else {
        bail!("缺少 --excel 参数\n{USAGE}");
    };
    Ok(CliArgs {
        excel,
        notes,
        config,
        out_dir,
        pretty,
    })
}

fn next_value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a String> {
    iter.next().with_context(|| format!("{flag} 缺少取值"))
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("配置文件不合法: {}", path.display()))
}

fn write_composition_exports(
    out_dir: &Path,
    section: &SectionResult<CompositionSection>,
) -> Result<()> {
    let Ok(section) = section else {
        return Ok(());
    };
    let title = format!("{}结构情况表", section.analysis_name);

    let xlsx = build_table_workbook(&title, &section.labels, &section.rows)
        .map_err(anyhow::Error::msg)?;
    let xlsx_path = out_dir.join(format!("{}明细.xlsx", section.analysis_name));
    fs::write(&xlsx_path, xlsx)
        .with_context(|| format!("写入 {} 失败", xlsx_path.display()))?;

    let docx = build_table_document(&title, &section.labels, &section.rows)
        .map_err(anyhow::Error::msg)?;
    let docx_path = out_dir.join(format!("{}明细.docx", section.analysis_name));
    fs::write(&docx_path, docx)
        .with_context(|| format!("写入 {} 失败", docx_path.display()))?;

    info!(name = %section.analysis_name, "exports written");
    Ok(())
}

fn collect_narrative(report: &finreport::AnalysisReport) -> String {
    let mut blocks = Vec::new();
    for section in [&report.asset, &report.liability] {
        if let Ok(s) = section {
            blocks.push(s.summary.clone());
            for prompt in &s.prompts {
                blocks.push(prompt.prompt.clone());
            }
        }
    }
    if let Ok(s) = &report.cashflow {
        for activity in &s.activities {
            blocks.push(activity.summary.clone());
        }
    }
    if let Ok(s) = &report.profitability {
        blocks.push(s.summary.clone());
    }
    if let Ok(s) = &report.solvency {
        blocks.push(s.summary.clone());
    }
    blocks.join("\n\n---\n\n")
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let raw_args = env::args().skip(1).collect::<Vec<_>>();
    let args = parse_args(&raw_args)?;
    let config = load_config(args.config.as_deref())?;

    let report = run_analysis(&args.excel, &config, &args.notes).map_err(anyhow::Error::msg)?;
    for message in &report.note_errors {
        eprintln!("[附注] {message}");
    }

    if let Some(out_dir) = &args.out_dir {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("创建输出目录失败: {}", out_dir.display()))?;
        write_composition_exports(out_dir, &report.asset)?;
        write_composition_exports(out_dir, &report.liability)?;

        let narrative = collect_narrative(&report);
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let text_path = out_dir.join(format!("分析文案_{stamp}.txt"));
        fs::write(&text_path, narrative)
            .with_context(|| format!("写入 {} 失败", text_path.display()))?;
        info!(dir = %out_dir.display(), "narrative written");
    }

    let payload = report_to_json(&report);
    let out = if args.pretty {
        serde_json::to_string_pretty(&payload)
    } else {
        serde_json::to_string(&payload)
    }
    .context("序列化输出失败")?;
    println!("{out}");
    Ok(())
}
