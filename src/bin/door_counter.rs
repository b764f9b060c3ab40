/// 出入口人数统计 - 主程序入口
///
/// 直接运行: cargo run --release -- run --source <视频源> --detections <跟踪结果>
///
/// 停止: Ctrl-C, 或在终端输入 q 回车
use anyhow::{Context, Result};
use clap::Parser;
use door_counter::config::{Cli, Command, RegionAction, RegionArgs, RunArgs};
use door_counter::detection::{ByteTrackConfig, ByteTrackDetector, Detector, MotReplay, MotWriter};
use door_counter::error::{AdapterError, ConfigError, PipelineError};
use door_counter::renderer::{FrameWriter, ImageSequenceWriter, OutputSink, QuitSignal, Renderer};
#[cfg(feature = "ffmpeg")]
use door_counter::renderer::VideoFileWriter;
use door_counter::utils::{gen_time_string, increment_path};
use door_counter::{EntranceCounter, Pipeline, PipelineParts, RegionConfig, RegionStore, SourceSpec};
use std::io::BufRead;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::Region(args) => region(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// 0 正常, 2 配置错误, 3 检测适配器错误, 1 其他
fn exit_code(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<PipelineError>() {
            return err.exit_code();
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
        if cause.downcast_ref::<AdapterError>().is_some() {
            return 3;
        }
    }
    1
}

fn run(args: RunArgs) -> Result<()> {
    let source = SourceSpec::parse(&args.source);
    info!("📹 视频源: {}", source);

    // 门线配置 (不存在时按命令行参数创建)
    let region = RegionStore::open(&args.region_file, args.initial_region())
        .with_context(|| format!("无法打开门线配置 {}", args.region_file.display()))?;

    // 检测适配器
    let replay = MotReplay::load(&args.detections)
        .with_context(|| format!("无法加载跟踪结果 {}", args.detections.display()))?;
    let detector: Box<dyn Detector> = if args.track {
        let config = match &args.tracker_config {
            Some(path) => ByteTrackConfig::load(path)?,
            None => ByteTrackConfig::default(),
        };
        Box::new(ByteTrackDetector::new(replay, config))
    } else {
        Box::new(replay)
    };

    // 输出目录
    let run_dir = if args.nosave && !args.save_txt {
        None
    } else {
        let name = args.name.clone().unwrap_or_else(|| gen_time_string("-"));
        let dir = increment_path(&args.project.join(name), args.exist_ok);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("无法创建输出目录 {}", dir.display()))?;
        info!("💾 输出目录: {}", dir.display());
        Some(dir)
    };

    let writer = match (&run_dir, args.nosave) {
        (Some(dir), false) => Some(frame_writer(dir, &args)?),
        _ => None,
    };
    let mot_writer = match (&run_dir, args.save_txt) {
        (Some(dir), true) => Some(MotWriter::create(&dir.join("tracks").join("tracks.txt"))?),
        _ => None,
    };

    let quit = if args.no_stdin {
        QuitSignal::none()
    } else {
        spawn_stdin_watcher()
    };

    let font = args.font.as_deref().and_then(Renderer::load_font);
    if font.is_none() {
        info!("💡 未指定字体 (--font), 只绘制框线和门线");
    }

    let counter = EntranceCounter::new(args.counter_settings())
        .with_eviction(args.evict_after)
        .with_dead_band(args.dead_band);

    let capture = source
        .open_capture(args.replay_fps)
        .with_context(|| format!("无法打开视频源 {}", source))?;

    let mut pipeline = Pipeline::new(PipelineParts {
        capture,
        detector,
        region,
        counter,
        renderer: Renderer::new(font, args.line_thickness),
        sink: OutputSink::new(run_dir, writer, quit),
        mot_writer,
    });

    let stop = pipeline.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("🛑 收到 Ctrl-C, 正在停止...");
        stop.stop();
    }) {
        warn!("⚠️  无法注册 Ctrl-C 处理器: {}", e);
    }

    pipeline.start()?;
    let summary = pipeline.wait()?;
    info!(
        "✅ 完成 ({:?}): 总数 {}, 进 {}, 出 {}",
        summary.reason,
        summary.total_count(),
        summary.in_count(),
        summary.out_count()
    );
    if let Some(record) = summary.counts.last_record() {
        info!("📊 {}", record);
    }
    Ok(())
}

/// 标注输出: --save-vid 时为视频文件, 否则为 JPEG 序列
fn frame_writer(run_dir: &Path, args: &RunArgs) -> Result<Box<dyn FrameWriter>> {
    if args.save_vid {
        #[cfg(feature = "ffmpeg")]
        {
            let name = run_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "output".to_string());
            let path = run_dir.join(format!("{}.mp4", name));
            let writer = VideoFileWriter::create(&path, args.video_fps)?;
            info!("📹 标注视频: {}", path.display());
            return Ok(Box::new(writer));
        }
        #[cfg(not(feature = "ffmpeg"))]
        anyhow::bail!("--save-vid 需要启用 ffmpeg 功能 (cargo build --features ffmpeg)");
    }
    Ok(Box::new(ImageSequenceWriter::create(&run_dir.join("frames"), 90)?))
}

/// 终端输入 q 回车 → 退出
fn spawn_stdin_watcher() -> QuitSignal {
    let (tx, quit) = QuitSignal::channel();
    let spawned = std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                        let _ = tx.send(());
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });
    if let Err(e) = spawned {
        warn!("⚠️  无法监听终端输入: {}", e);
    }
    quit
}

fn region(args: RegionArgs) -> Result<()> {
    let path = args.file.as_path();
    match args.action {
        RegionAction::Show => {
            let config = RegionStore::read(path)?;
            println!("{}", config);
        }
        RegionAction::Set {
            region_type,
            line1,
            line2,
        } => {
            let config = RegionConfig::new(region_type, line1, line2);
            RegionStore::write(path, &config)?;
            info!("💾 门线配置已保存: {}", config);
        }
        RegionAction::Adjust { door, delta } => {
            let config = RegionStore::adjust(path, door, delta)?;
            println!("{}", config);
        }
    }
    Ok(())
}
