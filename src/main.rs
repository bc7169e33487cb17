use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telearm::capture::CaptureConfig;
use telearm::command::JointCommand;
use telearm::config::SessionConfig;
use telearm::session::{ControllerSession, ReceiverSession, StreamerSession};

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// telearm command line arguments
#[derive(Parser, Debug)]
#[command(name = "telearm")]
#[command(version, about = "Robot-arm teleoperation over WebRTC", long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    role: RoleCommand,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Rendezvous and pairing flags shared by every role
#[derive(Args, Debug, Clone)]
struct ConnectArgs {
    /// Rendezvous offer endpoint
    #[arg(
        short = 's',
        long,
        value_name = "URL",
        default_value = telearm::config::DEFAULT_SERVER_URL
    )]
    server: String,

    /// Robot identifier used to pair endpoints
    #[arg(
        short = 'r',
        long,
        value_name = "ID",
        default_value = telearm::config::DEFAULT_ROBOT_ID
    )]
    robot: String,

    /// STUN server URL (repeatable)
    #[arg(long, value_name = "URL")]
    stun: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    /// Drive the arm: send joint-angle commands over the control channel
    Controller {
        #[command(flatten)]
        connect: ConnectArgs,
    },
    /// Receive joint-angle commands and hand them to the actuation callback
    Receiver {
        #[command(flatten)]
        connect: ConnectArgs,
    },
    /// Stream the local camera to the paired peer
    Streamer {
        #[command(flatten)]
        connect: ConnectArgs,

        /// Capture device path
        #[arg(short = 'd', long, value_name = "PATH", default_value = "/dev/video0")]
        device: PathBuf,

        /// Frame width
        #[arg(long, value_name = "PIXELS", default_value_t = 1280)]
        width: u32,

        /// Frame height
        #[arg(long, value_name = "PIXELS", default_value_t = 720)]
        height: u32,

        /// Frame rate
        #[arg(long, value_name = "FPS", default_value_t = 30)]
        fps: u32,

        /// Server-side video transform (cartoon, edges, rotate, none)
        #[arg(long, value_name = "NAME", default_value = "none")]
        transform: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    info!("Starting telearm v{}", env!("CARGO_PKG_VERSION"));

    match args.role {
        RoleCommand::Controller { connect } => run_controller(session_config(&connect)).await,
        RoleCommand::Receiver { connect } => run_receiver(session_config(&connect)).await,
        RoleCommand::Streamer {
            connect,
            device,
            width,
            height,
            fps,
            transform,
        } => {
            let config = session_config(&connect).with_video_transform(transform);
            let capture = CaptureConfig::for_device(device)
                .with_resolution(width, height)
                .with_fps(fps);
            run_streamer(config, capture).await
        }
    }
}

fn session_config(args: &ConnectArgs) -> SessionConfig {
    let mut config = SessionConfig::for_server(args.server.as_str()).with_robot(args.robot.as_str());
    for url in &args.stun {
        config = config.with_stun_server(url.as_str());
    }
    config
}

async fn run_controller(config: SessionConfig) -> anyhow::Result<()> {
    let session = ControllerSession::connect(config).await?;
    info!("Controller connected; waiting for the control channel...");

    tokio::select! {
        result = drive_demo(&session) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    session.close().await?;
    Ok(())
}

/// Scripted jog mirroring a manual test drive: five poses at 1 Hz, then
/// hold the session open
async fn drive_demo(session: &ControllerSession) -> telearm::Result<()> {
    session.wait_channel_open().await?;

    for step in 0..5i64 {
        let command = JointCommand::new()
            .with_field("timestamp", step)
            .with_field("joint1", 90 + step * 10)
            .with_field("joint2", 45 - step * 5)
            .with_field("joint3", 180)
            .with_field("gripper", 0.5 + step as f64 * 0.1);

        match session.send(&command).await {
            Ok(()) => info!("Sent joint command: {}", command),
            Err(e) => warn!("Failed to send joint command: {}", e),
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    info!("Demo drive complete; holding session open (ctrl-c to exit)");
    std::future::pending().await
}

async fn run_receiver(config: SessionConfig) -> anyhow::Result<()> {
    let session = ReceiverSession::connect(config, |command| {
        // Actuation hooks in here; for now the pose is just reported
        info!("Joint command: {}", command);
    })
    .await?;
    info!("Receiver connected; waiting for joint commands (ctrl-c to exit)");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    session.close().await?;
    Ok(())
}

async fn run_streamer(config: SessionConfig, capture: CaptureConfig) -> anyhow::Result<()> {
    let session = StreamerSession::connect(config, capture).await?;
    info!("Streamer connected; sending camera frames (ctrl-c to exit)");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    session.close().await?;
    Ok(())
}

fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    // Build filter string based on effective level
    let filter = match effective_level {
        LogLevel::Error => "telearm=error,webrtc=error",
        LogLevel::Warn => "telearm=warn,webrtc=warn",
        LogLevel::Info => "telearm=info,webrtc=error",
        LogLevel::Verbose => "telearm=debug,webrtc=warn",
        LogLevel::Debug => "telearm=debug,webrtc=debug",
        LogLevel::Trace => "telearm=trace,webrtc=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
