//! # Desktop Player Example
//!
//! Boots the player with the desktop bridges, plays the default track for a
//! few seconds while printing progress, seeks, pauses and shuts down.
//!
//! Run with: `cargo run --example desktop_player --package core-service`

use bridge_traits::NotificationAction;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let service = core_service::bootstrap_desktop()?;
    service.notifier().on_play_pause(|playing| {
        println!("▶ playing: {playing}");
    });
    service.notifier().on_seek_completed(|position_ms| {
        println!("⏩ seek confirmed at {position_ms} ms");
    });

    service.handle_action(NotificationAction::PlayPause).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let poller = service.track_progress();
    let mut progress = poller.progress();
    for _ in 0..5 {
        if progress.changed().await.is_err() {
            break;
        }
        let sample = *progress.borrow();
        println!(
            "  {} / {:?} ms",
            sample.position_ms, sample.duration_ms
        );
        tokio::time::sleep(Duration::from_millis(400)).await;
    }

    service.seek_to(90_000).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    service.handle_action(NotificationAction::PlayPause).await?;
    println!("Final state: {:?}", service.snapshot());

    poller.stop().await;
    service.shutdown().await?;
    Ok(())
}
