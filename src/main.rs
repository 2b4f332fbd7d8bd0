use blinkwatch::pipeline::services::SyntheticBlinkDetector;
use blinkwatch::pipeline::types::{PixelBuffer, SourceKind, VideoFrame};
use blinkwatch::{AppError, BlinkPipeline, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 240;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const RUN_FOR: Duration = Duration::from_secs(10);

fn init_logging(settings: &Settings) {
    tracing_subscriber::fmt()
        .with_max_level(settings.max_log_level())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;
    init_logging(&settings);

    let detector = SyntheticBlinkDetector::new(1).with_noise(0.2);
    let pipeline = BlinkPipeline::builder(Arc::new(detector))
        .settings(&settings)
        .build();

    let mut events = BroadcastStream::new(pipeline.subscribe());
    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => match event.to_json() {
                    Ok(json) => println!("{json}"),
                    Err(e) => warn!("Failed to serialize {} event: {}", event.name(), e),
                },
                Err(e) => warn!("Event subscriber lagged: {}", e),
            }
        }
    });

    pipeline.enable(SourceKind::Video, settings.pipeline)?;

    // Flat grey I420 frames; the synthetic detector only reads timestamps.
    let luma = vec![128u8; (FRAME_WIDTH * FRAME_HEIGHT) as usize];
    let chroma = vec![128u8; (FRAME_WIDTH * FRAME_HEIGHT / 4) as usize];
    let start = Instant::now();
    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    while start.elapsed() < RUN_FOR {
        ticker.tick().await;
        let frame = VideoFrame::new(
            FRAME_WIDTH,
            FRAME_HEIGHT,
            start.elapsed(),
            PixelBuffer::I420 {
                y: &luma,
                u: &chroma,
                v: &chroma,
                stride_y: FRAME_WIDTH as usize,
                stride_u: FRAME_WIDTH as usize / 2,
                stride_v: FRAME_WIDTH as usize / 2,
            },
        );
        pipeline.on_frame(&frame);
    }

    pipeline.disable();
    info!("Admission: {:?}", pipeline.admission_stats());
    if let Some(stats) = pipeline.performance_stats() {
        info!("Performance: {:?}", stats);
    }

    drop(pipeline);
    if let Err(e) = printer.await {
        warn!("Event printer task failed: {}", e);
    }
    Ok(())
}
