//! Full runtime runs with mock pins, a mock thermal source and short
//! intervals.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use supervisor::adapters::hardware::Hardware;
use supervisor::adapters::time::MonotonicClock;
use supervisor::app::events::SupervisorEvent;
use supervisor::app::service::ControlService;
use supervisor::config::SupervisorConfig;
use supervisor::health::HealthMonitor;
use supervisor::rpc::{ControlServer, client};
use supervisor::scheduler::{Runtime, Shutdown};
use supervisor::store::{AttributeStore, Mode};

use crate::mock_hw::{MockButton, MockLed, MockThermal, RecordingSink};

fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        sample_interval_ms: 10,
        policy_interval_ms: 10,
        led_poll_interval_ms: 1,
        button_poll_interval_ms: 10,
        control_poll_interval_ms: 2,
        telemetry_interval_secs: 0,
        ..SupervisorConfig::default()
    }
}

fn stop_after(shutdown: &Arc<Shutdown>, after: Duration) -> thread::JoinHandle<()> {
    let shutdown = shutdown.clone();
    thread::spawn(move || {
        thread::sleep(after);
        shutdown.trigger();
    })
}

#[test]
fn hot_cpu_blinks_fast_and_stops_cleanly() {
    let store = Arc::new(AttributeStore::new());
    let control = ControlService::new(store.clone(), Arc::new(HealthMonitor::default()));
    let led = MockLed::new();
    let sink = RecordingSink::new();
    let hardware = Hardware {
        led: led.clone(),
        buttons: None::<[MockButton; 3]>,
        thermal: MockThermal::steady(47),
    };

    let shutdown = Arc::new(Shutdown::new());
    let stopper = stop_after(&shutdown, Duration::from_millis(400));
    let report = Runtime::new(fast_config(), control, hardware, MonotonicClock::new(), sink.clone())
        .run(&shutdown);
    stopper.join().unwrap();

    assert_eq!(store.frequency(), 20);
    assert_eq!(store.temperature(), 47);
    assert!(report.samples >= 5, "{report:?}");
    assert!(report.policy_ticks >= 5, "{report:?}");
    // 20 Hz toggles every 25 ms; allow plenty of scheduling slack.
    assert!(report.led_transitions >= 6, "{report:?}");
    assert!(!led.is_high(), "LED must be off after shutdown");

    let events = sink.events();
    assert!(matches!(events.first(), Some(SupervisorEvent::Started(_))));
    assert_eq!(events.last(), Some(&SupervisorEvent::Stopped));
}

#[test]
fn buttons_and_remote_control_during_a_run() {
    let store = Arc::new(AttributeStore::new());
    let control = ControlService::new(store.clone(), Arc::new(HealthMonitor::default()));
    let s3 = MockButton::new();
    let hardware = Hardware {
        led: MockLed::new(),
        buttons: Some([MockButton::new(), MockButton::new(), s3.clone()]),
        thermal: MockThermal::steady(30),
    };
    let server = ControlServer::bind("127.0.0.1:0").unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let shutdown = Arc::new(Shutdown::new());
    let driver = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            // S3 press: AUTO → MANUAL.
            s3.set(true);
            thread::sleep(Duration::from_millis(50));
            s3.set(false);
            let replies = [
                client::send(&addr, "get:mode", Duration::from_secs(2)),
                client::send(&addr, "frequency:12", Duration::from_secs(2)),
            ];
            shutdown.trigger();
            replies.map(|r| r.unwrap())
        })
    };

    let report = Runtime::new(
        fast_config(),
        control,
        hardware,
        MonotonicClock::new(),
        RecordingSink::new(),
    )
    .with_server(server)
    .run(&shutdown);
    let replies = driver.join().unwrap();

    assert_eq!(replies, ["ok mode=manual".to_owned(), "ok frequency=12".to_owned()]);
    assert_eq!(report.button_presses, 1);
    assert_eq!(store.mode(), Mode::Manual);
    assert_eq!(store.frequency(), 12);
}

#[test]
fn shutdown_requested_before_run_returns_immediately() {
    let control = ControlService::new(
        Arc::new(AttributeStore::new()),
        Arc::new(HealthMonitor::default()),
    );
    let led = MockLed::new();
    let hardware = Hardware {
        led: led.clone(),
        buttons: None::<[MockButton; 3]>,
        thermal: MockThermal::steady(20),
    };
    let shutdown = Shutdown::new();
    shutdown.trigger();
    let sink = RecordingSink::new();
    Runtime::new(fast_config(), control, hardware, MonotonicClock::new(), sink.clone())
        .run(&shutdown);
    assert!(!led.is_high());
    assert_eq!(sink.events().last(), Some(&SupervisorEvent::Stopped));
}
