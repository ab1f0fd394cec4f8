//! Runtime: cooperative scheduler for the periodic control loops.
//!
//! Runs on the calling thread using `edge-executor` for cooperative
//! multi-task scheduling and `async-io-mini` for reactor-driven timers
//! (no busy-spinning).  One task per periodic activity; each task runs its
//! tick to completion, then re-arms its timer.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │  block_on(executor.run(shutdown.wait()))                     │
//!  │  ┌────────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                          │  │
//!  │  │                                                        │  │
//!  │  │  ┌─────────┐ ┌────────┐ ┌───────┐ ┌─────────┐          │  │
//!  │  │  │ Sampler │ │ Policy │ │  LED  │ │ Buttons │          │  │
//!  │  │  │ 1000ms ⏱│ │1000ms ⏱│ │ 10ms ⏱│ │ 100ms ⏱ │          │  │
//!  │  │  └─────────┘ └────────┘ └───────┘ └─────────┘          │  │
//!  │  │  ┌─────────┐ ┌───────────┐                             │  │
//!  │  │  │ Control │ │ Telemetry │                             │  │
//!  │  │  │  20ms ⏱ │ │   60s ⏱   │                             │  │
//!  │  │  └─────────┘ └───────────┘                             │  │
//!  │  └────────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! When [`Shutdown`] fires, `executor.run` returns and the executor is
//! dropped together with every task and pending timer.  The LED is then
//! driven low and the pins are released (sysfs unexport on drop).

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info};

use crate::adapters::hardware::Hardware;
use crate::app::events::{ChangeSource, SupervisorEvent, TelemetryData};
use crate::app::ports::{Clock, EventSink, ThermalSource};
use crate::app::service::{ControlService, Reply};
use crate::config::SupervisorConfig;
use crate::control::PolicyEngine;
use crate::drivers::{ButtonPanel, LedScheduler};
use crate::rpc::ControlServer;
use crate::sensors::TemperatureSampler;

// ═══════════════════════════════════════════════════════════════
//  Shutdown
// ═══════════════════════════════════════════════════════════════

/// One-shot stop request, safe to trigger from a signal handler thread.
pub struct Shutdown {
    signal: Signal<CriticalSectionRawMutex, ()>,
    triggered: AtomicBool,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub const fn new() -> Self {
        Self {
            signal: Signal::new(),
            triggered: AtomicBool::new(false),
        }
    }

    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::AcqRel) {
            info!("Runtime: shutdown requested");
        }
        self.signal.signal(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        if self.is_triggered() {
            return;
        }
        self.signal.wait().await;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared event sink
// ═══════════════════════════════════════════════════════════════

/// Every task holds a clone; events are forwarded one at a time.
impl<S: EventSink> EventSink for Rc<RefCell<S>> {
    fn emit(&mut self, event: &SupervisorEvent) {
        self.borrow_mut().emit(event);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Runtime
// ═══════════════════════════════════════════════════════════════

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub samples: u64,
    pub policy_ticks: u64,
    pub led_transitions: u64,
    pub button_presses: u64,
}

/// Owns everything the control loops need for one run.
pub struct Runtime<O, I, T, C, S>
where
    O: OutputPin,
    I: InputPin,
    T: ThermalSource,
    C: Clock,
    S: EventSink,
{
    config: SupervisorConfig,
    control: ControlService,
    hardware: Hardware<O, I, T>,
    clock: C,
    sink: S,
    server: Option<ControlServer>,
}

impl<O, I, T, C, S> Runtime<O, I, T, C, S>
where
    O: OutputPin,
    I: InputPin,
    T: ThermalSource,
    C: Clock,
    S: EventSink,
{
    pub fn new(
        config: SupervisorConfig,
        control: ControlService,
        hardware: Hardware<O, I, T>,
        clock: C,
        sink: S,
    ) -> Self {
        Self {
            config,
            control,
            hardware,
            clock,
            sink,
            server: None,
        }
    }

    /// Serve the TCP control endpoint from the runtime loop.
    pub fn with_server(mut self, server: ControlServer) -> Self {
        self.server = Some(server);
        self
    }

    /// Run every loop until `shutdown` fires.
    pub fn run(self, shutdown: &Shutdown) -> RunReport {
        let Self {
            config,
            control,
            hardware,
            clock,
            sink,
            server,
        } = self;

        let sink = Rc::new(RefCell::new(sink));
        let clock = Rc::new(clock);
        let report = Rc::new(RefCell::new(RunReport::default()));
        let led = Rc::new(RefCell::new(LedScheduler::new(hardware.led, config.duty_percent)));

        sink.borrow_mut()
            .emit(&SupervisorEvent::Started(control.store().snapshot()));

        let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

        executor
            .spawn(sampler_loop(
                TemperatureSampler::new(hardware.thermal),
                control.clone(),
                sink.clone(),
                report.clone(),
                millis(config.sample_interval_ms),
            ))
            .detach();
        executor
            .spawn(policy_loop(
                control.clone(),
                sink.clone(),
                report.clone(),
                millis(config.policy_interval_ms),
            ))
            .detach();
        executor
            .spawn(led_loop(
                led.clone(),
                control.clone(),
                clock.clone(),
                sink.clone(),
                millis(config.led_poll_interval_ms),
            ))
            .detach();
        if let Some(pins) = hardware.buttons {
            executor
                .spawn(button_loop(
                    ButtonPanel::new(pins),
                    control.clone(),
                    sink.clone(),
                    report.clone(),
                    millis(config.button_poll_interval_ms),
                ))
                .detach();
        }
        if let Some(server) = server {
            executor
                .spawn(control_loop(
                    server,
                    control.clone(),
                    sink.clone(),
                    millis(config.control_poll_interval_ms),
                ))
                .detach();
        }
        if config.telemetry_interval_secs > 0 {
            executor
                .spawn(telemetry_loop(
                    control.clone(),
                    clock.clone(),
                    sink.clone(),
                    Duration::from_secs(u64::from(config.telemetry_interval_secs)),
                ))
                .detach();
        }

        info!("Runtime: started");
        futures_lite::future::block_on(executor.run(shutdown.wait()));
        drop(executor);

        led.borrow_mut().stop();
        let mut report = *report.borrow();
        report.led_transitions = led.borrow().transitions();
        sink.borrow_mut().emit(&SupervisorEvent::Stopped);
        info!("Runtime: stopped ({:?})", report);
        report
    }
}

fn millis(ms: u32) -> Duration {
    Duration::from_millis(u64::from(ms))
}

// ── Tasks ────────────────────────────────────────────────────

type SharedReport = Rc<RefCell<RunReport>>;

async fn sampler_loop<T: ThermalSource, S: EventSink>(
    mut sampler: TemperatureSampler<T>,
    control: ControlService,
    mut sink: Rc<RefCell<S>>,
    report: SharedReport,
    period: Duration,
) {
    loop {
        sampler.tick(control.store(), control.health(), &mut sink);
        report.borrow_mut().samples += 1;
        async_io_mini::Timer::after(period).await;
    }
}

async fn policy_loop<S: EventSink>(
    control: ControlService,
    mut sink: Rc<RefCell<S>>,
    report: SharedReport,
    period: Duration,
) {
    let mut policy = PolicyEngine::new();
    loop {
        policy.tick(control.store(), &mut sink);
        report.borrow_mut().policy_ticks = policy.ticks();
        async_io_mini::Timer::after(period).await;
    }
}

async fn led_loop<O: OutputPin, C: Clock, S: EventSink>(
    led: Rc<RefCell<LedScheduler<O>>>,
    control: ControlService,
    clock: Rc<C>,
    mut sink: Rc<RefCell<S>>,
    period: Duration,
) {
    led.borrow_mut()
        .start(clock.now_ms(), control.store(), control.health(), &mut sink);
    loop {
        async_io_mini::Timer::after(period).await;
        led.borrow_mut()
            .poll(clock.now_ms(), control.store(), control.health(), &mut sink);
    }
}

async fn button_loop<I: InputPin, S: EventSink>(
    mut panel: ButtonPanel<I>,
    control: ControlService,
    mut sink: Rc<RefCell<S>>,
    report: SharedReport,
    period: Duration,
) {
    loop {
        for event in panel.poll(control.health(), &mut sink) {
            report.borrow_mut().button_presses += 1;
            // Rejections are already reported through the sink.
            if let Ok(Reply::Ignored(mode)) =
                control.handle(event.into(), ChangeSource::Button, &mut sink)
            {
                debug!("Buttons: {:?} ignored in {} mode", event, mode);
            }
        }
        async_io_mini::Timer::after(period).await;
    }
}

async fn control_loop<S: EventSink>(
    mut server: ControlServer,
    control: ControlService,
    mut sink: Rc<RefCell<S>>,
    period: Duration,
) {
    loop {
        server.poll(&control, &mut sink);
        async_io_mini::Timer::after(period).await;
    }
}

async fn telemetry_loop<C: Clock, S: EventSink>(
    control: ControlService,
    clock: Rc<C>,
    mut sink: Rc<RefCell<S>>,
    period: Duration,
) {
    loop {
        async_io_mini::Timer::after(period).await;
        sink.emit(&SupervisorEvent::Telemetry(TelemetryData {
            snapshot: control.store().snapshot(),
            health_flags: control.health().faults(),
            uptime_secs: clock.now_ms() / 1000,
        }));
    }
}
