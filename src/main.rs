//! # Iconize 命令行入口
//!
//! 本文件只负责参数解析、配置叠加、进度输出与退出码。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use iconize::error::AppError;
use iconize::icon_pipeline::{BatchResult, BatchRunner, CancelToken, FileOutcome, FileReport, ProgressSink};
use iconize::settings::{self, SETTINGS_FILE_NAME, Settings};

#[derive(Debug, Parser)]
#[command(name = "iconize", version, about = "把 SVG / 位图批量转换为多尺寸 PNG 与 ICO 图标")]
struct Args {
    /// 源图片（SVG、PNG、JPG、BMP、TIFF、WebP ...）
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// 输出根目录（默认 ~/processed_images）
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// 目标尺寸，逗号分隔
    #[arg(short, long, value_delimiter = ',', value_name = "SIZES")]
    sizes: Option<Vec<u32>>,

    /// 不输出 resized/*.png
    #[arg(long)]
    no_resized: bool,

    /// 不输出多尺寸 ico/<name>.ico
    #[arg(long)]
    no_packed: bool,

    /// 不输出单尺寸 ico/<name>_<size>.ico
    #[arg(long)]
    no_single: bool,

    /// 多尺寸 ICO 已存在时跳过该文件（默认关闭，已有输出会被重新生成）
    #[arg(long)]
    skip_existing: bool,

    /// 缩放档位：quality / balanced / speed
    #[arg(long, value_name = "PROFILE")]
    profile: Option<String>,

    /// 并发处理的文件数
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// 设置文件路径（默认读取当前目录的 iconize.json）
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 把最终生效的设置写入该文件
    #[arg(long, value_name = "FILE")]
    write_config: Option<PathBuf>,
}

/// 终端进度输出。
struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn on_started(&mut self, index: usize, total: usize, path: &Path) {
        println!("[{}/{}] 处理中: {}", index + 1, total, path.display());
    }

    fn on_finished(&mut self, completed: usize, total: usize, report: &FileReport) {
        let percent = completed * 100 / total.max(1);
        match &report.outcome {
            FileOutcome::Succeeded { outputs } => {
                println!("  ✔ {}（{} 个文件）[{}%]", report.path.display(), outputs.len(), percent);
            }
            FileOutcome::Skipped { reason } => {
                println!("  ⏭ {}：{} [{}%]", report.path.display(), reason, percent);
            }
            FileOutcome::Failed { error } => {
                println!("  ✘ {}：{} [{}%]", report.path.display(), error, percent);
            }
            FileOutcome::Cancelled => {}
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(result) => exit_code_for(&result),
        Err(err) => {
            log::error!("{err}");
            eprintln!("错误: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<BatchResult, AppError> {
    let settings = resolve_settings(&args)?;

    if let Some(path) = &args.write_config {
        settings::save_settings_to_path(path, &settings)?;
        log::info!("💾 已写入设置文件: {}", path.display());
    }

    let request = settings.output_request()?;
    let runner = BatchRunner::new(settings.pipeline_config()?);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        eprintln!("收到中断信号，正在停止...");
        handler_token.cancel();
    }) {
        log::warn!("注册 Ctrl+C 处理失败，无法中途取消: {err}");
    }

    let result = runner.run(&args.inputs, &request, &cancel, &mut TerminalProgress)?;
    print_summary(&result, &request.output_base().display().to_string());
    Ok(result)
}

/// 默认值 → 设置文件 → 命令行参数。
fn resolve_settings(args: &Args) -> Result<Settings, AppError> {
    let mut settings = match &args.config {
        Some(path) => settings::load_settings_strict(path)?,
        None => settings::load_settings_from_path(Path::new(SETTINGS_FILE_NAME)),
    };

    if let Some(output) = &args.output {
        settings.output_dir = Some(output.to_string_lossy().to_string());
    }
    if let Some(sizes) = &args.sizes {
        if sizes.is_empty() {
            return Err(AppError::Input("--sizes 不能为空".to_string()));
        }
        settings.sizes = sizes.clone();
    }
    if args.no_resized {
        settings.resized = false;
    }
    if args.no_packed {
        settings.packed = false;
    }
    if args.no_single {
        settings.single = false;
    }
    if args.skip_existing {
        settings.skip_existing = true;
    }
    if let Some(profile) = &args.profile {
        settings.profile = profile.clone();
    }
    if let Some(workers) = args.workers {
        settings.workers = Some(workers);
    }

    Ok(settings)
}

fn print_summary(result: &BatchResult, output: &str) {
    println!();
    println!(
        "完成: {} 成功，{} 跳过，{} 失败（共 {} 个）",
        result.succeeded(),
        result.skipped(),
        result.failed(),
        result.total()
    );
    if result.was_cancelled() {
        println!("已取消: {} 个文件未处理", result.cancelled());
    }

    let failures = result.failures();
    if !failures.is_empty() {
        println!("失败列表:");
        for (path, error) in failures {
            println!("  - {} [{}] {}", path.display(), error.code(), error);
        }
    }
    println!("输出目录: {}", output);
}

fn exit_code_for(result: &BatchResult) -> ExitCode {
    if result.was_cancelled() {
        ExitCode::from(130)
    } else if result.failed() > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}
