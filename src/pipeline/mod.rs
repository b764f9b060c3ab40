/// 计数流水线 (Counting Pipeline)
///
/// 双线程架构, 通过单槽帧缓存交接:
/// - capture:    采集线程, 按采集速率覆盖最新帧
/// - processing: 读区域配置 → 取最新帧 → 检测跟踪 → 计数 → 渲染 → 输出
///
/// 状态: Idle → Running → Stopping → Stopped (终态, 不可重启)
///
/// 停止顺序: 采集先停并释放设备 → 处理线程退出 → 输出最后关闭
/// (两个线程共用一个停止标志, 任一方退出都会通知另一方)
use crate::counting::{CountingState, EntranceCounter};
use crate::detection::{Detector, MotWriter};
use crate::error::PipelineError;
use crate::input::{Capture, FrameSlot, FrameSource, SlotRead};
use crate::region::RegionStore;
use crate::renderer::{OutputSink, Renderer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 还没有帧时的等待间隔
const PENDING_BACKOFF: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// 处理线程退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// 视频流结束
    SourceExhausted,
    /// 外部停止命令
    StopRequested,
    /// 输出端请求退出
    QuitRequested,
}

/// 流水线组件, 启动时移交给各线程
pub struct PipelineParts {
    pub capture: Box<dyn Capture>,
    pub detector: Box<dyn Detector>,
    pub region: RegionStore,
    pub counter: EntranceCounter,
    pub renderer: Renderer,
    pub sink: OutputSink,
    pub mot_writer: Option<MotWriter>,
}

/// 运行结果
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reason: ExitReason,
    pub frames_processed: u64,
    pub frames_captured: u64,
    pub counts: CountingState,
}

impl RunSummary {
    pub fn total_count(&self) -> usize {
        self.counts.total_count()
    }

    pub fn in_count(&self) -> usize {
        self.counts.in_count()
    }

    pub fn out_count(&self) -> usize {
        self.counts.out_count()
    }
}

/// 可克隆的停止句柄 (Ctrl-C 处理器使用)
///
/// 只置位停止标志: 采集线程在一次读取内释放设备, 处理线程在当前帧结束后退出
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// 处理线程的返回值
struct StageOutcome {
    result: Result<ExitReason, PipelineError>,
    frames_processed: u64,
    counts: CountingState,
    sink: OutputSink,
}

pub struct Pipeline {
    state: PipelineState,
    parts: Option<PipelineParts>,
    stop: Arc<AtomicBool>,
    source: Option<FrameSource>,
    processing: Option<JoinHandle<StageOutcome>>,
}

impl Pipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            state: PipelineState::Idle,
            parts: Some(parts),
            stop: Arc::new(AtomicBool::new(false)),
            source: None,
            processing: None,
        }
    }

    /// 当前状态; 处理线程自行退出后即为 Stopping
    pub fn state(&self) -> PipelineState {
        match self.state {
            PipelineState::Running if self.stop.load(Ordering::Relaxed) => PipelineState::Stopping,
            state => state,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    /// 启动采集线程和处理线程
    pub fn start(&mut self) -> Result<(), PipelineError> {
        match self.state() {
            PipelineState::Running => {
                warn!("⚠️  流水线已在运行, 忽略重复启动");
                return Ok(());
            }
            PipelineState::Stopping | PipelineState::Stopped => {
                return Err(PipelineError::NotRestartable)
            }
            PipelineState::Idle => {}
        }

        let Some(parts) = self.parts.take() else {
            return Err(PipelineError::NotRestartable);
        };
        let PipelineParts {
            capture,
            detector,
            region,
            counter,
            renderer,
            sink,
            mot_writer,
        } = parts;

        info!("🚀 流水线启动: 检测器 {}", detector.name());
        let slot = FrameSlot::new();
        let mut source = FrameSource::with_stop(capture, slot.clone(), Arc::clone(&self.stop))
            .map_err(|e| {
                self.state = PipelineState::Stopped;
                e
            })?;

        let stage = ProcessingStage {
            slot,
            detector,
            region,
            counter,
            renderer,
            sink,
            mot_writer,
            stop: Arc::clone(&self.stop),
            frame_id: 0,
            fps: FpsMeter::new(),
        };
        let spawned = std::thread::Builder::new()
            .name("processing".to_string())
            .spawn(move || stage.run());

        match spawned {
            Ok(handle) => {
                self.source = Some(source);
                self.processing = Some(handle);
                self.state = PipelineState::Running;
                Ok(())
            }
            Err(source_err) => {
                source.stop();
                self.state = PipelineState::Stopped;
                Err(PipelineError::Spawn {
                    stage: "processing",
                    source: source_err,
                })
            }
        }
    }

    /// 请求停止: 先停采集并释放设备, 处理线程在下一个循环边界退出
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.state == PipelineState::Running {
            self.state = PipelineState::Stopping;
        }
        if let Some(source) = self.source.as_mut() {
            source.stop();
        }
    }

    /// 等待处理线程退出, 然后释放采集设备, 最后关闭输出
    pub fn wait(&mut self) -> Result<RunSummary, PipelineError> {
        let Some(processing) = self.processing.take() else {
            return match self.state {
                PipelineState::Idle => Err(PipelineError::NotStarted),
                _ => Err(PipelineError::NotRestartable),
            };
        };

        // 等到有人请求停止 (外部命令, 或处理线程自行退出)
        while !self.stop.load(Ordering::Relaxed) && !processing.is_finished() {
            std::thread::sleep(PENDING_BACKOFF);
        }
        self.stop.store(true, Ordering::Relaxed);
        self.state = PipelineState::Stopping;

        // 采集先停
        let frames_captured = match self.source.take() {
            Some(mut source) => {
                source.stop();
                source.captured()
            }
            None => 0,
        };

        let outcome = processing.join();

        // 输出最后关闭
        let result = match outcome {
            Ok(mut outcome) => {
                outcome.sink.close(outcome.counts.records());
                outcome.result.map(|reason| RunSummary {
                    reason,
                    frames_processed: outcome.frames_processed,
                    frames_captured,
                    counts: outcome.counts,
                })
            }
            Err(_) => {
                error!("❌ 处理线程 panic");
                Err(PipelineError::StagePanicked("processing"))
            }
        };

        self.state = PipelineState::Stopped;
        match &result {
            Ok(summary) => info!(
                "🛑 流水线停止 ({:?}): 处理 {} 帧 / 采集 {} 帧, 总数 {}, 进 {}, 出 {}",
                summary.reason,
                summary.frames_processed,
                summary.frames_captured,
                summary.total_count(),
                summary.in_count(),
                summary.out_count()
            ),
            Err(e) => error!("❌ 流水线异常停止: {}", e),
        }
        result
    }

    /// start + wait
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        self.start()?;
        self.wait()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.processing.is_some() {
            self.stop();
            let _ = self.wait();
        }
    }
}

/// 窗口平均帧率 (每秒更新一次)
struct FpsMeter {
    count: u64,
    last: Instant,
    current_fps: f64,
}

impl FpsMeter {
    fn new() -> Self {
        Self {
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
        }
    }

    fn tick(&mut self) -> f64 {
        self.count += 1;
        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.current_fps = self.count as f64 / elapsed;
            debug!("⚡ 处理帧率: {:.1} fps", self.current_fps);
            self.count = 0;
            self.last = Instant::now();
        }
        self.current_fps
    }
}

struct ProcessingStage {
    slot: FrameSlot,
    detector: Box<dyn Detector>,
    region: RegionStore,
    counter: EntranceCounter,
    renderer: Renderer,
    sink: OutputSink,
    mot_writer: Option<MotWriter>,
    stop: Arc<AtomicBool>,
    frame_id: u64,
    fps: FpsMeter,
}

impl ProcessingStage {
    fn run(mut self) -> StageOutcome {
        info!("🔍 处理线程启动");
        let result = self.run_loop();
        // 通知采集端和监督者
        self.stop.store(true, Ordering::Relaxed);

        if let Some(writer) = self.mot_writer.as_mut() {
            match writer.flush() {
                Ok(()) => info!("💾 跟踪结果已保存: {}", writer.path().display()),
                Err(e) => error!("❌ 保存跟踪结果失败: {}", e),
            }
        }

        match &result {
            Ok(reason) => info!("✅ 处理线程退出: {:?}", reason),
            Err(e) => error!("❌ 处理线程出错: {}", e),
        }

        StageOutcome {
            result,
            frames_processed: self.frame_id,
            counts: self.counter.into_state(),
            sink: self.sink,
        }
    }

    fn run_loop(&mut self) -> Result<ExitReason, PipelineError> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(ExitReason::StopRequested);
            }

            let region = self.region.refresh()?;

            let frame = match self.slot.read() {
                SlotRead::Frame(frame) => frame,
                SlotRead::Pending => {
                    std::thread::sleep(PENDING_BACKOFF);
                    continue;
                }
                SlotRead::Ended if self.stop.load(Ordering::Relaxed) => {
                    return Ok(ExitReason::StopRequested)
                }
                SlotRead::Ended => return Ok(ExitReason::SourceExhausted),
            };

            let objects = self.detector.detect(&frame, &region)?;

            self.frame_id += 1;
            let report =
                self.counter
                    .process_frame(self.frame_id, &region, frame.width(), &objects);
            for event in &report.events {
                info!(
                    "🚪 {} #{} {} (帧 {})",
                    event.door.label(),
                    event.track_id,
                    event.direction,
                    event.frame_id
                );
            }
            if let Some(count) = report.interval_count {
                info!(
                    "📊 {} 秒内 {} 人 | {}",
                    self.counter.settings().interval_secs(),
                    count,
                    report.record
                );
            }

            let fps = self.fps.tick();
            let annotated = self.renderer.render(
                &frame,
                &objects,
                &report.events,
                fps,
                &report.geometry,
                Some(&report.record),
            );

            if let Some(writer) = self.mot_writer.as_mut() {
                writer.write_frame(frame.index, &objects)?;
            }

            if self.sink.present(&annotated)? {
                info!("⏹️  收到退出请求");
                return Ok(ExitReason::QuitRequested);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::CounterSettings;
    use crate::detection::{Tlwh, TrackedObject};
    use crate::error::{AdapterError, CaptureError, ConfigError};
    use crate::input::Frame;
    use crate::region::{RegionConfig, RegionType};
    use crate::renderer::{ImageSequenceWriter, QuitSignal};
    use image::RgbImage;
    use std::path::Path;

    /// 按固定间隔产生帧; 最后一帧保留一段时间再结束
    struct ScriptCapture {
        frames: u64,
        next: u64,
        delay: Duration,
        linger: Duration,
        released: Arc<AtomicBool>,
        log: Option<EventLog>,
    }

    impl ScriptCapture {
        fn new(frames: u64, released: Arc<AtomicBool>) -> Self {
            Self {
                frames,
                next: 0,
                delay: Duration::from_millis(20),
                linger: Duration::from_millis(150),
                released,
                log: None,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn with_log(mut self, log: EventLog) -> Self {
            self.log = Some(log);
            self
        }
    }

    /// 各线程按发生顺序记录事件
    type EventLog = Arc<std::sync::Mutex<Vec<&'static str>>>;

    fn events(log: &EventLog) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }

    impl Capture for ScriptCapture {
        fn read(&mut self) -> Result<Option<RgbImage>, CaptureError> {
            if self.next >= self.frames {
                std::thread::sleep(self.linger);
                return Ok(None);
            }
            if self.next > 0 {
                std::thread::sleep(self.delay);
            }
            self.next += 1;
            Ok(Some(RgbImage::new(64, 48)))
        }

        fn release(&mut self) -> Result<(), CaptureError> {
            self.released.store(true, Ordering::SeqCst);
            if let Some(log) = &self.log {
                log.lock().unwrap().push("capture released");
            }
            Ok(())
        }

        fn describe(&self) -> String {
            "script".to_string()
        }
    }

    /// track 1 从 y=10 向下移动到 y=40, 每帧 +3 (line1 = 24)
    struct WalkingDetector;

    impl Detector for WalkingDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            _region: &RegionConfig,
        ) -> Result<Vec<TrackedObject>, AdapterError> {
            let y = 10.0 + frame.index as f32 * 3.0;
            Ok(vec![
                TrackedObject::new(1, Tlwh::new(20.0, y - 4.0, 8.0, 8.0), 0.9),
                TrackedObject::new(-1, Tlwh::new(0.0, 0.0, 4.0, 4.0), 0.3),
            ])
        }

        fn name(&self) -> String {
            "walking".to_string()
        }
    }

    /// 目标一直停在同一位置
    struct StandingDetector;

    impl Detector for StandingDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _region: &RegionConfig,
        ) -> Result<Vec<TrackedObject>, AdapterError> {
            Ok(vec![TrackedObject::new(5, Tlwh::new(20.0, 20.0, 8.0, 8.0), 0.9)])
        }

        fn name(&self) -> String {
            "standing".to_string()
        }
    }

    /// 每帧耗时 300ms 的检测器
    struct SlowDetector {
        started: Arc<AtomicBool>,
        log: EventLog,
    }

    impl Detector for SlowDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _region: &RegionConfig,
        ) -> Result<Vec<TrackedObject>, AdapterError> {
            self.started.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            self.log.lock().unwrap().push("detection finished");
            Ok(Vec::new())
        }

        fn name(&self) -> String {
            "slow".to_string()
        }
    }

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            _region: &RegionConfig,
        ) -> Result<Vec<TrackedObject>, AdapterError> {
            Err(AdapterError::Failed {
                frame_index: frame.index,
                reason: "model crashed".to_string(),
            })
        }

        fn name(&self) -> String {
            "failing".to_string()
        }
    }

    fn parts(
        dir: &Path,
        frames: u64,
        detector: Box<dyn Detector>,
        quit: QuitSignal,
        released: Arc<AtomicBool>,
    ) -> PipelineParts {
        let region = RegionStore::open(
            dir.join("region_setting.json"),
            RegionConfig::new(RegionType::Upper, 24, 40),
        )
        .unwrap();
        let run_dir = dir.join("exp");
        let writer = ImageSequenceWriter::create(&run_dir.join("frames"), 80).unwrap();
        PipelineParts {
            capture: Box::new(ScriptCapture::new(frames, released)),
            detector,
            region,
            counter: EntranceCounter::new(CounterSettings::default()),
            renderer: Renderer::default(),
            sink: OutputSink::new(Some(run_dir), Some(Box::new(writer)), quit),
            mot_writer: None,
        }
    }

    #[test]
    fn test_counts_until_source_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let released = Arc::new(AtomicBool::new(false));
        let mut pipeline = Pipeline::new(parts(
            dir.path(),
            10,
            Box::new(WalkingDetector),
            QuitSignal::none(),
            Arc::clone(&released),
        ));
        assert_eq!(pipeline.state(), PipelineState::Idle);

        pipeline.start().unwrap();
        let summary = pipeline.wait().unwrap();

        assert_eq!(summary.reason, ExitReason::SourceExhausted);
        assert_eq!(summary.frames_captured, 10);
        assert!(summary.frames_processed >= 2);
        assert_eq!(summary.total_count(), 1);
        assert_eq!(summary.in_count(), 1);
        assert_eq!(summary.out_count(), 0);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(released.load(Ordering::SeqCst));

        let records = std::fs::read_to_string(dir.path().join("exp").join("records.txt")).unwrap();
        assert_eq!(records.lines().count() as u64, summary.frames_processed);
        assert!(records.lines().last().unwrap().contains("In count: 1"));
        assert!(dir.path().join("exp").join("frames").join("000001.jpg").exists());
    }

    #[test]
    fn test_start_is_idempotent_and_not_restartable() {
        let dir = tempfile::tempdir().unwrap();
        let released = Arc::new(AtomicBool::new(false));
        let mut pipeline = Pipeline::new(parts(
            dir.path(),
            u64::MAX,
            Box::new(WalkingDetector),
            QuitSignal::none(),
            released,
        ));
        assert!(matches!(pipeline.wait(), Err(PipelineError::NotStarted)));

        pipeline.start().unwrap();
        pipeline.start().unwrap();
        assert_eq!(pipeline.state(), PipelineState::Running);

        pipeline.stop();
        assert_eq!(pipeline.state(), PipelineState::Stopping);
        let summary = pipeline.wait().unwrap();
        assert_eq!(summary.reason, ExitReason::StopRequested);
        assert_eq!(pipeline.state(), PipelineState::Stopped);

        assert!(matches!(pipeline.start(), Err(PipelineError::NotRestartable)));
    }

    #[test]
    fn test_stop_handle_stops_live_source() {
        let dir = tempfile::tempdir().unwrap();
        let released = Arc::new(AtomicBool::new(false));
        let mut pipeline = Pipeline::new(parts(
            dir.path(),
            u64::MAX,
            Box::new(WalkingDetector),
            QuitSignal::none(),
            Arc::clone(&released),
        ));
        let handle = pipeline.stop_handle();
        pipeline.start().unwrap();

        std::thread::sleep(Duration::from_millis(100));
        handle.stop();
        let summary = pipeline.wait().unwrap();

        assert_eq!(summary.reason, ExitReason::StopRequested);
        assert!(released.load(Ordering::SeqCst));
        assert!(dir.path().join("exp").join("records.txt").exists());
    }

    #[test]
    fn test_quit_signal_stops_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, quit) = QuitSignal::channel();
        tx.send(()).unwrap();
        let mut pipeline = Pipeline::new(parts(
            dir.path(),
            u64::MAX,
            Box::new(WalkingDetector),
            quit,
            Arc::new(AtomicBool::new(false)),
        ));

        let summary = pipeline.run().unwrap();
        assert_eq!(summary.reason, ExitReason::QuitRequested);
        assert_eq!(summary.frames_processed, 1);
    }

    #[test]
    fn test_adapter_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let released = Arc::new(AtomicBool::new(false));
        let mut pipeline = Pipeline::new(parts(
            dir.path(),
            u64::MAX,
            Box::new(FailingDetector),
            QuitSignal::none(),
            Arc::clone(&released),
        ));

        let err = pipeline.run().unwrap_err();
        assert!(matches!(err, PipelineError::Adapter(_)));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(pipeline.state(), PipelineState::Stopped);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unknown_region_type_halts() {
        let dir = tempfile::tempdir().unwrap();
        let parts = parts(
            dir.path(),
            u64::MAX,
            Box::new(WalkingDetector),
            QuitSignal::none(),
            Arc::new(AtomicBool::new(false)),
        );
        std::fs::write(
            dir.path().join("region_setting.json"),
            r#"{"type": "diagonal", "line1": 24, "line2": 40}"#,
        )
        .unwrap();

        let err = Pipeline::new(parts).run().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::UnsupportedRegionType(_))
        ));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_stop_releases_capture_before_processing_exits() {
        let dir = tempfile::tempdir().unwrap();
        let log: EventLog = Arc::default();
        let started = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));
        let mut parts = parts(
            dir.path(),
            u64::MAX,
            Box::new(SlowDetector {
                started: Arc::clone(&started),
                log: Arc::clone(&log),
            }),
            QuitSignal::none(),
            Arc::clone(&released),
        );
        parts.capture =
            Box::new(ScriptCapture::new(u64::MAX, Arc::clone(&released)).with_log(Arc::clone(&log)));

        let mut pipeline = Pipeline::new(parts);
        pipeline.start().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !started.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        // 检测进行中: 设备在 stop() 返回前已释放
        pipeline.stop();
        assert_eq!(events(&log), vec!["capture released"]);
        assert_eq!(pipeline.state(), PipelineState::Stopping);

        let summary = pipeline.wait().unwrap();
        assert_eq!(summary.reason, ExitReason::StopRequested);
        assert_eq!(events(&log), vec!["capture released", "detection finished"]);
        assert!(dir.path().join("exp").join("records.txt").exists());
    }

    #[test]
    fn test_stop_handle_releases_capture_first() {
        let dir = tempfile::tempdir().unwrap();
        let log: EventLog = Arc::default();
        let started = Arc::new(AtomicBool::new(false));
        let released = Arc::new(AtomicBool::new(false));
        let mut parts = parts(
            dir.path(),
            u64::MAX,
            Box::new(SlowDetector {
                started: Arc::clone(&started),
                log: Arc::clone(&log),
            }),
            QuitSignal::none(),
            Arc::clone(&released),
        );
        parts.capture =
            Box::new(ScriptCapture::new(u64::MAX, Arc::clone(&released)).with_log(Arc::clone(&log)));

        let mut pipeline = Pipeline::new(parts);
        let handle = pipeline.stop_handle();
        pipeline.start().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !started.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        handle.stop();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(events(&log), vec!["capture released"]);

        pipeline.wait().unwrap();
        assert_eq!(events(&log), vec!["capture released", "detection finished"]);
    }

    #[test]
    fn test_slow_capture_repeats_frames_without_crossings() {
        let dir = tempfile::tempdir().unwrap();
        let released = Arc::new(AtomicBool::new(false));
        let mut parts = parts(
            dir.path(),
            3,
            Box::new(StandingDetector),
            QuitSignal::none(),
            Arc::clone(&released),
        );
        parts.capture = Box::new(
            ScriptCapture::new(3, Arc::clone(&released)).with_delay(Duration::from_millis(100)),
        );
        parts.sink = OutputSink::new(Some(dir.path().join("exp")), None, QuitSignal::none());

        let summary = Pipeline::new(parts).run().unwrap();

        assert_eq!(summary.reason, ExitReason::SourceExhausted);
        assert_eq!(summary.frames_captured, 3);
        // 同一帧被重复处理, 每次都产生一条记录
        assert!(summary.frames_processed > summary.frames_captured);
        assert_eq!(summary.counts.records().len() as u64, summary.frames_processed);
        assert_eq!(summary.total_count(), 1);
        assert_eq!(summary.in_count(), 0);
        assert_eq!(summary.out_count(), 0);
    }
}
