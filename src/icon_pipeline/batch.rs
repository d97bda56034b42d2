//! # 批处理调度模块
//!
//! ## 设计思路
//!
//! 文件之间完全独立，适合“任务游标 + 结果通道”的工作池：
//! 1. 控制线程先校验、规划（识别格式、检测重名），再派发任务
//! 2. 工作线程通过原子游标领取下一个文件，结果经 `mpsc` 发回
//! 3. 只有控制线程写 `BatchResult`、调用进度回调，工作线程之间无共享可变状态
//!
//! ## 实现思路
//!
//! - 结果按输入下标存放，输出顺序与输入顺序一致，与完成先后无关。
//! - 单文件错误在边界被捕获并记录，整批永远跑完。
//! - `CancelToken` 在领取任务前与单文件各步骤之间检查；未开始的文件记为 `Cancelled`。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Instant;

use super::{IconError, IconHandler, OutputRequest, PipelineConfig, SourceImage, SourceKind};

/// 协作式取消标志。
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 单个源文件的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Succeeded { outputs: Vec<PathBuf> },
    Skipped { reason: String },
    Failed { error: IconError },
    Cancelled,
}

/// 单个源文件的结果记录。
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    /// 格式识别失败时为 `None`。
    pub kind: Option<SourceKind>,
    pub outcome: FileOutcome,
}

/// 整批处理结果，顺序与输入一致。
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    reports: Vec<FileReport>,
}

impl BatchResult {
    pub fn reports(&self) -> &[FileReport] {
        &self.reports
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Cancelled))
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled() > 0
    }

    /// 失败文件及原因。
    pub fn failures(&self) -> Vec<(&Path, &IconError)> {
        self.reports
            .iter()
            .filter_map(|report| match &report.outcome {
                FileOutcome::Failed { error } => Some((report.path.as_path(), error)),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// 进度回调，只在控制线程上被调用。
pub trait ProgressSink {
    /// 某个文件开始处理。`index` 从 0 开始。
    fn on_started(&mut self, _index: usize, _total: usize, _path: &Path) {}

    /// 某个文件处理结束（成功 / 跳过 / 失败）。`completed` 单调递增。
    fn on_finished(&mut self, _completed: usize, _total: usize, _report: &FileReport) {}
}

/// 不关心进度时使用。
pub struct NoProgress;

impl ProgressSink for NoProgress {}

enum WorkerEvent {
    Started { index: usize },
    Finished { index: usize, outcome: FileOutcome },
}

/// 批处理入口。
pub struct BatchRunner {
    handler: IconHandler,
}

impl BatchRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_handler(IconHandler::new(config))
    }

    pub fn with_handler(handler: IconHandler) -> Self {
        Self { handler }
    }

    /// 处理一批输入文件。
    ///
    /// 只有 `Configuration` 错误会从这里返回（且发生在任何文件被触碰之前）；
    /// 单文件错误都记录在 `BatchResult` 中。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use iconize::icon_pipeline::{BatchRunner, CancelToken, NoProgress, OutputRequest, PipelineConfig};
    ///
    /// let request = OutputRequest::builder("out").sizes([16, 32]).build()?;
    /// let runner = BatchRunner::new(PipelineConfig::default());
    /// let result = runner.run(&["logo.svg"], &request, &CancelToken::new(), &mut NoProgress)?;
    /// println!("{} succeeded, {} failed", result.succeeded(), result.failed());
    /// # Ok::<(), iconize::icon_pipeline::IconError>(())
    /// ```
    pub fn run<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        request: &OutputRequest,
        cancel: &CancelToken,
        progress: &mut dyn ProgressSink,
    ) -> Result<BatchResult, IconError> {
        if inputs.is_empty() {
            return Err(IconError::Configuration("未选择任何图片".to_string()));
        }

        let batch_start = Instant::now();
        let total = inputs.len();
        let paths: Vec<PathBuf> = inputs.iter().map(|p| p.as_ref().to_path_buf()).collect();

        let mut settled: BTreeMap<usize, FileReport> = BTreeMap::new();
        let mut completed = 0usize;
        let plan = plan_batch(&paths, request);

        for (index, report) in plan.settled {
            completed += 1;
            progress.on_finished(completed, total, &report);
            settled.insert(index, report);
        }

        let sources = plan.sources;
        let runnable: Vec<usize> = sources.keys().copied().collect();
        let workers = self.handler.config().workers.clamp(1, runnable.len().max(1));
        log::info!(
            "🚀 开始批处理 - 文件 {} 个（可处理 {} 个），工作线程 {} 个，输出目录: {}",
            total,
            runnable.len(),
            workers,
            request.output_base().display()
        );

        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<WorkerEvent>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let runnable = &runnable;
                let sources = &sources;
                scope.spawn(move || {
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let slot = cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(&index) = runnable.get(slot) else {
                            break;
                        };
                        let Some(source) = sources.get(&index) else {
                            break;
                        };
                        if tx.send(WorkerEvent::Started { index }).is_err() {
                            break;
                        }
                        let outcome = self.process_one(source, request, cancel);
                        if tx.send(WorkerEvent::Finished { index, outcome }).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for event in rx {
                match event {
                    WorkerEvent::Started { index } => {
                        progress.on_started(index, total, &paths[index]);
                    }
                    WorkerEvent::Finished { index, outcome } => {
                        let report = FileReport {
                            path: paths[index].clone(),
                            kind: sources.get(&index).map(SourceImage::kind),
                            outcome,
                        };
                        if report.outcome != FileOutcome::Cancelled {
                            completed += 1;
                        }
                        log_outcome(&report);
                        progress.on_finished(completed, total, &report);
                        settled.insert(index, report);
                    }
                }
            }
        });

        let reports = (0..total)
            .map(|index| {
                settled.remove(&index).unwrap_or_else(|| FileReport {
                    path: paths[index].clone(),
                    kind: sources.get(&index).map(SourceImage::kind),
                    outcome: FileOutcome::Cancelled,
                })
            })
            .collect();
        let result = BatchResult { reports };

        if result.was_cancelled() {
            log::warn!(
                "🛑 批处理已取消 - {} 成功，{} 跳过，{} 失败，{} 未处理",
                result.succeeded(),
                result.skipped(),
                result.failed(),
                result.cancelled()
            );
        } else {
            log::info!(
                "🏁 批处理完成 - {} 成功，{} 跳过，{} 失败，耗时 {}ms",
                result.succeeded(),
                result.skipped(),
                result.failed(),
                batch_start.elapsed().as_millis()
            );
        }

        Ok(result)
    }

    fn process_one(&self, source: &SourceImage, request: &OutputRequest, cancel: &CancelToken) -> FileOutcome {
        if request.skip_existing() && request.packed() {
            let existing = request.packed_ico_path(&source.stem());
            if existing.exists() {
                return FileOutcome::Skipped {
                    reason: format!("多尺寸 ICO 已存在：{}", existing.display()),
                };
            }
        }

        match self.handler.process_source(source, request, cancel) {
            Ok(outputs) => FileOutcome::Succeeded { outputs },
            Err(IconError::Cancelled(_)) => FileOutcome::Cancelled,
            Err(error) => FileOutcome::Failed { error },
        }
    }
}

struct BatchPlan {
    sources: BTreeMap<usize, SourceImage>,
    settled: Vec<(usize, FileReport)>,
}

/// 识别格式并检测输出重名。
///
/// 按每个文件在本次请求下会写出的完整路径集合判断（不区分大小写）：
/// `logo` 的单尺寸 ICO `logo_16.ico` 与 `logo_16` 的多尺寸 ICO 同名，同样算冲突。
/// 第一个占用某路径的文件正常处理，之后与其重叠的文件记为 `NameCollision` 失败，绝不静默覆盖。
fn plan_batch(paths: &[PathBuf], request: &OutputRequest) -> BatchPlan {
    let mut sources = BTreeMap::new();
    let mut settled = Vec::new();
    let mut claimed: HashMap<String, usize> = HashMap::new();

    for (index, path) in paths.iter().enumerate() {
        let source = match SourceImage::detect(path) {
            Ok(source) => source,
            Err(error) => {
                let report = FileReport {
                    path: path.clone(),
                    kind: None,
                    outcome: FileOutcome::Failed { error },
                };
                log_outcome(&report);
                settled.push((index, report));
                continue;
            }
        };

        let planned: Vec<(String, PathBuf)> = request
            .planned_outputs(&source.stem())
            .into_iter()
            .map(|output| (output.to_string_lossy().to_lowercase(), output))
            .collect();

        let clash = planned
            .iter()
            .find_map(|(key, output)| claimed.get(key).map(|&first| (first, output)));
        if let Some((first, output)) = clash {
            let report = FileReport {
                path: path.clone(),
                kind: Some(source.kind()),
                outcome: FileOutcome::Failed {
                    error: IconError::NameCollision(format!(
                        "'{}' 与 '{}' 都会写出 {}",
                        path.display(),
                        paths[first].display(),
                        output.display()
                    )),
                },
            };
            log_outcome(&report);
            settled.push((index, report));
            continue;
        }

        for (key, _) in planned {
            claimed.insert(key, index);
        }
        sources.insert(index, source);
    }

    BatchPlan { sources, settled }
}

fn log_outcome(report: &FileReport) {
    match &report.outcome {
        FileOutcome::Succeeded { .. } => {}
        FileOutcome::Skipped { reason } => {
            log::info!("⏭️ 跳过 {} - {}", report.path.display(), reason);
        }
        FileOutcome::Failed { error } => {
            log::warn!("❌ [{}] {} - {}", error.code(), report.path.display(), error);
        }
        FileOutcome::Cancelled => {
            log::debug!("🛑 已取消 {}", report.path.display());
        }
    }
}
