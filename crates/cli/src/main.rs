use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use rtsp::media::annexb::{self, AnnexBSource};
use rtsp::{FrameSource, Server, ServerConfig, StreamController};
use tracing_subscriber::EnvFilter;

const IDLE_POLL: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(
    name = "rtsp-live",
    about = "Stream an H.264 Annex B file to RTSP clients"
)]
struct Args {
    /// Address to listen on
    #[arg(long, short, default_value = "0.0.0.0")]
    bind: IpAddr,

    #[arg(long, short, default_value_t = 8554)]
    port: u16,

    /// Raw H.264 Annex B elementary stream (.h264)
    #[arg(long, short)]
    file: PathBuf,

    /// Pictures per second, also advertised in the SDP
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Stop at the end of the file instead of looping
    #[arg(long)]
    once: bool,
}

/// Plays the file only while at least one client is watching.
#[derive(Default)]
struct FileController {
    streaming: AtomicBool,
    restart: AtomicBool,
}

impl StreamController for FileController {
    fn start_streaming(&self) {
        self.restart.store(true, Ordering::SeqCst);
        self.streaming.store(true, Ordering::SeqCst);
    }

    fn stop_streaming(&self) {
        self.streaming.store(false, Ordering::SeqCst);
    }
}

fn pump(
    server: &Server,
    controller: &FileController,
    mut source: AnnexBSource,
    interval: Duration,
    done: &AtomicBool,
) {
    while !done.load(Ordering::SeqCst) {
        if !controller.streaming.load(Ordering::SeqCst) {
            thread::sleep(IDLE_POLL);
            continue;
        }
        // New viewers need a keyframe before anything decodes.
        if controller.restart.swap(false, Ordering::SeqCst) {
            source.rewind_to_keyframe();
        }

        let Some(frame) = source.next_frame() else {
            tracing::info!("end of input");
            break;
        };
        let picture = matches!(
            annexb::nal_type(&frame.payload),
            Some(annexb::NAL_SLICE..=annexb::NAL_IDR)
        );

        match server.push_frame(frame.timestamp, frame.is_keyframe, &frame.payload) {
            Ok(sessions) => tracing::trace!(sessions, bytes = frame.payload.len(), "frame sent"),
            Err(e) => tracing::warn!(error = %e, "frame broadcast failed"),
        }

        if picture {
            thread::sleep(interval);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let data = match std::fs::read(&args.file) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to read {}: {}", args.file.display(), e);
            return;
        }
    };
    let fps = args.fps.max(1);
    let source = AnnexBSource::new(&data, fps, !args.once);
    if source.is_empty() {
        eprintln!("{} contains no Annex B NAL units", args.file.display());
        return;
    }
    tracing::info!(file = %args.file.display(), nal_units = source.len(), fps, "input loaded");

    let controller = Arc::new(FileController::default());
    let config = ServerConfig {
        framerate: f64::from(fps),
        ..ServerConfig::default()
    };
    let mut server = Server::with_config(args.bind, args.port, controller.clone(), config);

    if let Err(e) = server.start() {
        eprintln!("Failed to start server: {}", e);
        return;
    }

    let done = AtomicBool::new(false);
    let interval = Duration::from_secs(1) / fps;
    thread::scope(|scope| {
        let (server, controller, done) = (&server, &*controller, &done);
        scope.spawn(move || pump(server, controller, source, interval, done));

        println!(
            "Streaming on rtsp://{}:{}/stream/1, press Enter to stop",
            args.bind, args.port
        );
        let mut input = String::new();
        if let Err(e) = io::stdin().read_line(&mut input) {
            tracing::warn!(error = %e, "failed to read stdin");
        }
        done.store(true, Ordering::SeqCst);
    });

    server.stop();
}
