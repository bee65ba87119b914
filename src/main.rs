//! Pitch Sync demo - an in-process host with followers
//!
//! Runs one host session and `DEMO_FOLLOWERS` follower sessions connected by
//! in-memory peer channels, drives the followers with random inputs for
//! `DEMO_TICKS` host ticks, then tears everything down.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::interval;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pitch_sync::control::{ChannelControl, ControlChannel, ControlEvent, ControlRequest};
use pitch_sync::link::PeerChannel;
use pitch_sync::notify::LogSink;
use pitch_sync::protocol::{PeerId, PlayerInput};
use pitch_sync::sync::renderables;
use pitch_sync::util::time::tick_duration;
use pitch_sync::{Config, Session, SessionCommand, SessionHandle, SessionParams};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Pitch Sync demo");
    info!(
        followers = config.demo_followers,
        ticks = config.demo_ticks,
        tick_rate = config.tick_rate,
        "Demo configuration"
    );

    let game_id = PeerId::random().to_string();
    let host_id = PeerId::random();

    // Host session
    let (mut host_control, host_requests) = ChannelControl::new();
    spawn_directory_log(config.player_name.clone(), host_requests);
    host_control.create(&config.player_name)?;

    let (host, host_handle) = Session::new(
        config.clone(),
        SessionParams {
            local_id: host_id.clone(),
            host_id: host_id.clone(),
            name: config.player_name.clone(),
        },
        Box::new(host_control),
        Arc::new(LogSink),
    );
    let host_task = tokio::spawn(host.run());

    // Follower sessions
    let mut followers = Vec::with_capacity(config.demo_followers);
    for n in 1..=config.demo_followers {
        let id = PeerId::random();
        let name = format!("Follower {n}");

        let (mut control, requests) = ChannelControl::new();
        spawn_directory_log(name.clone(), requests);
        control.join(&name, &game_id)?;

        let (session, handle) = Session::new(
            config.clone(),
            SessionParams {
                local_id: id.clone(),
                host_id: host_id.clone(),
                name: name.clone(),
            },
            Box::new(control),
            Arc::new(LogSink),
        );
        let task = tokio::spawn(session.run());

        let (host_end, follower_end) = PeerChannel::pair(config.link_capacity);
        handle
            .send(SessionCommand::Control(ControlEvent::Joined {
                game_id: game_id.clone(),
                assigned_id: id.clone(),
            }))
            .await?;
        handle
            .send(SessionCommand::AttachPeer {
                peer: host_id.clone(),
                channel: follower_end,
            })
            .await?;
        host_handle
            .send(SessionCommand::AttachPeer {
                peer: id.clone(),
                channel: host_end,
            })
            .await?;
        host_handle
            .send(SessionCommand::Control(ControlEvent::ParticipantJoined { id, name }))
            .await?;

        followers.push((handle, task));
    }

    let run_for = tick_duration(config.tick_rate) * config.demo_ticks;
    let steer = async {
        let mut ticker = interval(Duration::from_millis(250));
        loop {
            ticker.tick().await;
            for (handle, _) in &followers {
                let input = PlayerInput {
                    direction: [
                        rand::random::<f32>() * 2.0 - 1.0,
                        rand::random::<f32>() * 2.0 - 1.0,
                    ],
                    shooting: rand::random(),
                };
                if let Err(e) = handle.send(SessionCommand::Input(input)).await {
                    debug!(error = %e, "Follower no longer accepts input");
                }
            }
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(run_for) => info!("Demo run complete"),
        _ = shutdown_signal() => info!("Interrupted, tearing down"),
        _ = steer => {}
    }

    report(&host_handle);
    for (handle, _) in &followers {
        report(handle);
    }

    // Followers leave first so the host sees every departure
    let (handles, tasks): (Vec<_>, Vec<_>) = followers.into_iter().unzip();
    for handle in &handles {
        let _ = handle.send(SessionCommand::Shutdown).await;
    }
    for (handle, status) in handles.iter().zip(join_all(tasks).await) {
        let status = status?;
        info!(peer = %handle.local_id(), status = ?status, "Follower stopped");
    }

    let _ = host_handle.send(SessionCommand::Shutdown).await;
    let status = host_task.await?;
    info!(status = ?status, "Host stopped");

    info!("Demo shutdown complete");
    Ok(())
}

/// Log what a session currently shows
fn report(handle: &SessionHandle) {
    let game = handle.source().game();
    let positions = handle.source().positions();
    let origin = handle.origin();
    info!(
        peer = %handle.local_id(),
        participants = game.participants.len(),
        visible = renderables(&game, &positions).len(),
        camera_x = origin.x,
        camera_y = origin.y,
        "Session view"
    );
}

/// Log directory requests in place of a real directory service
fn spawn_directory_log(
    participant: String,
    mut requests: tokio::sync::mpsc::UnboundedReceiver<ControlRequest>,
) {
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            debug!(participant = %participant, request = ?request, "Directory request");
        }
    });
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Ctrl+C / terminate signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
