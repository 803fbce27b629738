mod support;

use core_playback::{PlaybackProgress, PositionPoller};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use std::time::Duration;
use support::{Harness, FIXED_DURATION_MS, SONG};

const TICK: Duration = Duration::from_millis(100);

async fn playing() -> Harness {
    let mut harness = Harness::new();
    harness.controller.initialize(SONG).await.unwrap();
    harness.settle().await;
    harness
}

#[tokio::test(start_paused = true)]
async fn samples_while_playing() {
    let harness = playing().await;
    let mut rx = harness.bus.subscribe();
    let poller = PositionPoller::spawn(harness.controller.clone(), TICK, harness.bus.clone());
    let progress = poller.progress();

    harness.factory.last().set_position(1_500);
    tokio::time::sleep(TICK * 3).await;

    assert!(poller.is_running());
    assert_eq!(
        *progress.borrow(),
        PlaybackProgress {
            position_ms: 1_500,
            duration_ms: Some(FIXED_DURATION_MS),
        }
    );

    let mut samples = 0;
    while let Ok(event) = rx.try_recv() {
        if let CoreEvent::Playback(PlaybackEvent::PositionChanged { position_ms, .. }) = event {
            assert!(position_ms <= 1_500);
            samples += 1;
        }
    }
    assert!(samples >= 2);

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stops_by_itself_after_pause() {
    let harness = playing().await;
    let poller = PositionPoller::spawn(harness.controller.clone(), TICK, harness.bus.clone());

    tokio::time::sleep(TICK * 2).await;
    assert!(poller.is_running());

    harness.controller.toggle_play_pause().await.unwrap();
    tokio::time::sleep(TICK * 2).await;

    assert!(!poller.is_running());
}

#[tokio::test(start_paused = true)]
async fn stops_when_handle_is_released() {
    let harness = playing().await;
    let poller = PositionPoller::spawn(harness.controller.clone(), TICK, harness.bus.clone());

    harness.controller.release().await.unwrap();
    tokio::time::sleep(TICK * 2).await;

    assert!(!poller.is_running());
}

#[tokio::test(start_paused = true)]
async fn keeps_running_while_preparing() {
    let harness = Harness::new();
    harness.controller.initialize(SONG).await.unwrap();
    let poller = PositionPoller::spawn(harness.controller.clone(), TICK, harness.bus.clone());

    tokio::time::sleep(TICK * 3).await;

    assert!(poller.is_running());
    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn idle_controller_ends_immediately() {
    let harness = Harness::new();
    let poller = PositionPoller::spawn(harness.controller.clone(), TICK, harness.bus.clone());

    tokio::time::sleep(TICK).await;

    assert!(!poller.is_running());
    assert_eq!(*poller.progress().borrow(), PlaybackProgress::default());
}
