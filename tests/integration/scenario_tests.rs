//! End-to-end scenarios for the store, sampler, policy and LED scheduler,
//! driven tick by tick against mock adapters.

use std::sync::Arc;

use supervisor::app::commands::ControlCommand;
use supervisor::app::events::{ChangeSource, SupervisorEvent};
use supervisor::app::ports::Clock;
use supervisor::app::service::{ControlService, Reply};
use supervisor::control::PolicyEngine;
use supervisor::drivers::{ButtonPanel, LedScheduler, LedState, Timing};
use supervisor::error::{Error, HealthFault};
use supervisor::health::HealthMonitor;
use supervisor::sensors::TemperatureSampler;
use supervisor::store::{Attribute, AttributeStore, ControlOutcome, Mode};

use crate::mock_hw::{ManualClock, MockButton, MockLed, MockThermal, RecordingSink};

fn core() -> (Arc<AttributeStore>, Arc<HealthMonitor>, RecordingSink) {
    (
        Arc::new(AttributeStore::new()),
        Arc::new(HealthMonitor::default()),
        RecordingSink::new(),
    )
}

// ── Policy ────────────────────────────────────────────────────

#[test]
fn auto_mode_is_idempotent_at_band_edges() {
    let (store, health, mut sink) = core();
    let thermal = MockThermal::steady(0);
    let mut sampler = TemperatureSampler::new(thermal.clone());
    let mut policy = PolicyEngine::new();

    for (celsius, expected) in [(34, 2), (35, 5), (39, 5), (40, 10), (44, 10), (45, 20)] {
        thermal.set(celsius);
        sampler.tick(&store, &health, &mut sink);
        for _ in 0..5 {
            policy.tick(&store, &mut sink);
            assert_eq!(store.frequency(), expected, "at {celsius}°C");
        }
    }
}

#[test]
fn policy_changes_are_reported_once() {
    let (store, health, mut sink) = core();
    let mut sampler = TemperatureSampler::new(MockThermal::steady(42));
    let mut policy = PolicyEngine::new();
    sampler.tick(&store, &health, &mut sink);
    for _ in 0..3 {
        policy.tick(&store, &mut sink);
    }
    assert_eq!(
        sink.count(|e| matches!(
            e,
            SupervisorEvent::FrequencyChanged {
                from: 2,
                to: 10,
                source: ChangeSource::Policy
            }
        )),
        1
    );
}

// ── Manual control ────────────────────────────────────────────

#[test]
fn manual_increase_caps_at_twenty() {
    let store = AttributeStore::new();
    store.set(Attribute::Mode, Mode::Manual.value()).unwrap();
    store.set(Attribute::Frequency, 10).unwrap();
    for _ in 0..11 {
        store.increase_frequency();
    }
    assert_eq!(store.frequency(), 20);
    assert_eq!(store.increase_frequency(), ControlOutcome::Unchanged(20));
}

#[test]
fn manual_decrease_floors_at_one() {
    let store = AttributeStore::new();
    store.toggle_mode();
    for _ in 0..5 {
        store.decrease_frequency();
    }
    assert_eq!(store.frequency(), 1);
}

#[test]
fn toggle_in_auto_keeps_current_frequency() {
    let (store, health, mut sink) = core();
    let thermal = MockThermal::steady(50);
    let mut sampler = TemperatureSampler::new(thermal.clone());
    let mut policy = PolicyEngine::new();
    sampler.tick(&store, &health, &mut sink);
    policy.tick(&store, &mut sink);
    assert_eq!(store.frequency(), 20);

    assert_eq!(store.toggle_mode(), Mode::Manual);
    assert_eq!(store.frequency(), 20);

    // Cooler now, but MANUAL keeps the policy out.
    thermal.set(20);
    sampler.tick(&store, &health, &mut sink);
    assert_eq!(
        policy.tick(&store, &mut sink),
        ControlOutcome::Ignored(Mode::Manual)
    );
    assert_eq!(store.frequency(), 20);
}

#[test]
fn set_get_roundtrip_and_rejections() {
    let store = AttributeStore::new();
    store.set(Attribute::Frequency, 7).unwrap();
    assert_eq!(store.get(Attribute::Frequency), 7);
    assert_eq!(store.get_by_name("frequency"), Ok(7));

    assert_eq!(store.set(Attribute::Frequency, 21), Err(Error::OutOfRange("frequency")));
    assert_eq!(
        store.set_by_name("temperature", 30),
        Err(Error::AccessDenied("temperature"))
    );
    assert_eq!(store.set_by_name("brightness", 1), Err(Error::UnknownAttribute));
    assert_eq!(store.frequency(), 7);
}

// ── Sampler failure ───────────────────────────────────────────

#[test]
fn thermal_dropout_keeps_temperature_and_policy_recovers() {
    let (store, health, mut sink) = core();
    let thermal = MockThermal::scripted(
        [Ok(41), Err(Error::ThermalSourceUnavailable)],
        36,
    );
    let mut sampler = TemperatureSampler::new(thermal);
    let mut policy = PolicyEngine::new();

    assert_eq!(sampler.tick(&store, &health, &mut sink), Some(41));
    policy.tick(&store, &mut sink);
    assert_eq!(store.frequency(), 10);

    assert_eq!(sampler.tick(&store, &health, &mut sink), None);
    assert_eq!(store.temperature(), 41);
    assert_eq!(policy.tick(&store, &mut sink), ControlOutcome::Unchanged(10));

    assert_eq!(sampler.tick(&store, &health, &mut sink), Some(36));
    assert_eq!(
        policy.tick(&store, &mut sink),
        ControlOutcome::Changed { from: 10, to: 5 }
    );
    assert!(!health.is_degraded());
}

#[test]
fn persistent_thermal_failure_degrades_then_recovers() {
    let (store, health, mut sink) = core();
    let thermal = MockThermal::steady(30);
    thermal.fail();
    let mut sampler = TemperatureSampler::new(thermal.clone());

    for _ in 0..3 {
        sampler.tick(&store, &health, &mut sink);
    }
    assert!(health.has_fault(HealthFault::ThermalDegraded));
    assert_eq!(
        sink.count(|e| *e == SupervisorEvent::Degraded(HealthFault::ThermalDegraded)),
        1
    );

    thermal.set(30);
    sampler.tick(&store, &health, &mut sink);
    assert!(!health.is_degraded());
    assert_eq!(
        sink.count(|e| *e == SupervisorEvent::Recovered(HealthFault::ThermalDegraded)),
        1
    );
}

// ── LED scheduler ─────────────────────────────────────────────

/// Drive the scheduler for two full periods at `tick_ms` resolution and
/// return the measured (high, low) durations of the second period.
fn measure(frequency: i32, tick_ms: u64) -> (u64, u64) {
    let (store, health, mut sink) = core();
    store.toggle_mode();
    store.set(Attribute::Frequency, frequency).unwrap();

    let clock = ManualClock::new();
    let mut led = LedScheduler::new(MockLed::new(), 50);
    led.start(clock.now_ms(), &store, &health, &mut sink);

    let mut edges = vec![(clock.now_ms(), LedState::High)];
    while edges.len() < 5 {
        clock.advance(tick_ms);
        if let Some(state) = led.poll(clock.now_ms(), &store, &health, &mut sink) {
            edges.push((clock.now_ms(), state));
        }
    }
    // edges: High, Low, High, Low, High
    (edges[3].0 - edges[2].0, edges[4].0 - edges[3].0)
}

#[test]
fn duty_is_fifty_percent_within_one_tick_for_every_frequency() {
    for tick_ms in [1, 10] {
        for frequency in 1..=20 {
            let (high, low) = measure(frequency, tick_ms);
            let period = high + low;
            let diff = (2 * high).abs_diff(period);
            assert!(
                diff <= 2 * tick_ms,
                "f={frequency} tick={tick_ms}: high={high} low={low}"
            );
        }
    }
}

#[test]
fn led_picks_up_new_frequency_on_next_transition() {
    let (store, health, mut sink) = core();
    store.toggle_mode();
    let clock = ManualClock::new();
    let mut led = LedScheduler::new(MockLed::new(), 50);
    led.start(0, &store, &health, &mut sink);
    assert_eq!(led.timing(), Timing::for_frequency(2, 50));

    store.set(Attribute::Frequency, 10).unwrap();
    clock.advance(250);
    assert_eq!(
        led.poll(clock.now_ms(), &store, &health, &mut sink),
        Some(LedState::Low)
    );
    assert_eq!(led.timing().period_ms, 100);
    clock.advance(50);
    assert_eq!(
        led.poll(clock.now_ms(), &store, &health, &mut sink),
        Some(LedState::High)
    );
}

#[test]
fn failing_led_keeps_cadence_and_degrades() {
    let (store, health, mut sink) = core();
    let pin = MockLed::new();
    let mut led = LedScheduler::new(pin.clone(), 50);
    pin.fail_next(3);

    led.start(0, &store, &health, &mut sink);
    assert_eq!(led.poll(250, &store, &health, &mut sink), Some(LedState::Low));
    assert_eq!(led.poll(500, &store, &health, &mut sink), Some(LedState::High));
    assert!(health.has_fault(HealthFault::OutputDegraded));
    assert!(pin.writes().is_empty());

    assert_eq!(led.poll(750, &store, &health, &mut sink), Some(LedState::Low));
    assert!(!health.is_degraded());
    assert_eq!(pin.writes(), vec![false]);
    assert_eq!(
        sink.events(),
        vec![
            SupervisorEvent::Degraded(HealthFault::OutputDegraded),
            SupervisorEvent::Recovered(HealthFault::OutputDegraded),
        ]
    );
}

// ── Buttons ───────────────────────────────────────────────────

#[test]
fn buttons_drive_the_control_service() {
    let (store, health, mut sink) = core();
    let control = ControlService::new(store.clone(), health.clone());
    let (s1, s2, s3) = (MockButton::new(), MockButton::new(), MockButton::new());
    let mut panel = ButtonPanel::new([s1.clone(), s2.clone(), s3.clone()]);
    panel.poll(&health, &mut sink);

    let mut press = |button: &MockButton| -> Vec<Reply> {
        button.set(true);
        let replies = panel
            .poll(&health, &mut sink)
            .into_iter()
            .map(|event| {
                control
                    .handle(ControlCommand::from(event), ChangeSource::Button, &mut sink)
                    .unwrap()
            })
            .collect();
        button.set(false);
        panel.poll(&health, &mut sink);
        replies
    };

    // AUTO: S1 is ignored.
    assert_eq!(press(&s1), vec![Reply::Ignored(Mode::Auto)]);
    // S3 switches to MANUAL, then S1/S2 step the frequency.
    assert_eq!(press(&s3), vec![Reply::Value(Attribute::Mode, 0)]);
    assert_eq!(press(&s1), vec![Reply::Value(Attribute::Frequency, 3)]);
    assert_eq!(press(&s2), vec![Reply::Value(Attribute::Frequency, 2)]);
    assert_eq!(store.mode(), Mode::Manual);
}
