//! Integration tests for the channel registry.

mod common;

use std::sync::Arc;
use std::thread;

use common::{RecordingPin, wired_registry};
use myrtio_engine::channels::{Channel, ChannelError, ChannelRegistry};
use myrtio_engine::command::CommandProcessor;

#[test]
fn wire_names_round_trip() {
    for channel in Channel::ALL {
        assert_eq!(Channel::from_name(channel.name()), Some(channel));
    }
    assert_eq!(Channel::FarRed.name(), "FAR_RED");
    assert_eq!(Channel::from_name("rgb"), None);
    assert_eq!(Channel::from_name("BLUE"), None);
}

#[test]
fn initialize_drives_every_line_low() {
    let (registry, pins) = wired_registry();
    registry.set(Channel::White, true).unwrap();

    registry.initialize();

    for (channel, pin) in Channel::ALL.into_iter().zip(&pins) {
        assert!(!registry.get(channel));
        assert_eq!(pin.level(), Some(false));
    }
}

#[test]
fn initialize_is_idempotent() {
    let (registry, pins) = wired_registry();

    registry.initialize();
    let first = registry.snapshot();
    registry.initialize();

    assert_eq!(registry.snapshot(), first);
    assert_eq!(pins[0].writes(), vec![false, false]);
}

#[test]
fn set_updates_line_and_level() {
    let (registry, pins) = wired_registry();
    registry.initialize();

    registry.set(Channel::Verde, true).unwrap();

    assert!(registry.get(Channel::Verde));
    assert_eq!(pins[2].level(), Some(true));
    assert!(!registry.get(Channel::Rgb));
    assert_eq!(pins[0].writes(), vec![false]);
}

#[test]
fn set_is_idempotent() {
    let (registry, pins) = wired_registry();

    registry.set(Channel::Rgb, true).unwrap();
    registry.set(Channel::Rgb, true).unwrap();

    assert!(registry.get(Channel::Rgb));
    assert_eq!(pins[0].writes(), vec![true, true]);
}

#[test]
fn set_without_line_reports_unknown_channel() {
    let pin = RecordingPin::default();
    let registry = ChannelRegistry::new().with_line(Channel::Rgb, pin);

    assert!(registry.is_attached(Channel::Rgb));
    assert!(!registry.is_attached(Channel::FarRed));
    assert_eq!(
        registry.set(Channel::FarRed, true),
        Err(ChannelError::UnknownChannel(Channel::FarRed))
    );
    assert!(!registry.get(Channel::FarRed));
}

#[test]
fn line_fault_keeps_previous_level() {
    let (registry, pins) = wired_registry();
    registry.set(Channel::White, true).unwrap();
    pins[1].set_faulty(true);

    assert_eq!(
        registry.set(Channel::White, false),
        Err(ChannelError::LineFault(Channel::White))
    );
    assert!(registry.get(Channel::White));
}

#[test]
fn snapshot_reports_all_levels_in_wire_order() {
    let (registry, _pins) = wired_registry();
    registry.initialize();
    registry.set(Channel::Rgb, true).unwrap();
    registry.set(Channel::FarRed, true).unwrap();

    let snapshot = registry.snapshot();

    let levels: Vec<_> = snapshot.iter().collect();
    assert_eq!(
        levels,
        vec![
            (Channel::Rgb, true),
            (Channel::White, false),
            (Channel::Verde, false),
            (Channel::FarRed, true),
        ]
    );
}

#[test]
fn concurrent_writers_leave_consistent_state() {
    let (registry, pins) = wired_registry();
    let registry = Arc::new(registry);

    let workers: Vec<_> = Channel::ALL
        .into_iter()
        .map(|channel| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..200 {
                    registry.set(channel, i % 2 == 0).unwrap();
                    let _ = registry.snapshot();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for (channel, pin) in Channel::ALL.into_iter().zip(&pins) {
        // The last write of every worker is `i = 199`, an odd index
        assert!(!registry.get(channel));
        assert_eq!(pin.level(), Some(false));
        assert_eq!(pin.writes().len(), 200);
    }
}

#[test]
fn racing_writers_on_one_channel_settle_on_one_level() {
    let (registry, pins) = wired_registry();
    registry.initialize();
    let processor = CommandProcessor::new(&registry);

    for _ in 0..50 {
        thread::scope(|scope| {
            scope.spawn(|| processor.process(b"WHITE:ON").unwrap());
            scope.spawn(|| registry.set(Channel::White, false).unwrap());
        });

        let level = registry.get(Channel::White);
        assert_eq!(pins[1].level(), Some(level));
        assert_eq!(registry.snapshot().iter().nth(1), Some((Channel::White, level)));
    }
    // Initialization plus two writes per round, none lost
    assert_eq!(pins[1].writes().len(), 1 + 2 * 50);
}
