//! # Telemetry Publisher Module
//!
//! Periodic round-robin publication of the sensor snapshot over CAN.
//!
//! This module handles:
//! - Sending at most one frame per scheduler tick, fields in fixed order
//! - Retrying in place when the bus rejects a frame
//! - Halting publication after persistent failure (error breaker)
//! - Gating snapshot replacement so a cycle never mixes two generations
//!   of readings

pub mod snapshot;

use std::time::{Duration, Instant};

use tracing::{error, warn};

use crate::bus::sink::FrameSink;
use crate::can::protocol::{CanFrame, FrameValue, SensorIds};
use crate::clock::MonotonicClock;

pub use snapshot::TelemetrySnapshot;

/// Default publish period: one cycle per second
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Failed-send ceiling; once the counter exceeds this, the breaker trips
pub const ERROR_CEILING: u32 = 1000;

/// Publisher phase. Each send state covers exactly one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Reset,
    Idle,
    SendTemperature,
    SendRelHumidity,
    SendAbsHumidity,
    SendAirQualityVoc,
    SendAirQualityCo2,
    SendLight,
    SendAirPressure,
    Fault,
}

/// Round-robin telemetry publisher.
///
/// The host loop calls [`update`](Self::update) to hand over fresh readings
/// and [`tick`](Self::tick) once per loop iteration to advance the state
/// machine by exactly one step. Both run on the same thread of control;
/// snapshot ownership is gated by the busy flag, not a lock.
pub struct TelemetryPublisher<B, C> {
    bus: B,
    clock: C,
    ids: SensorIds,
    send_interval: Duration,

    snapshot: TelemetrySnapshot,
    state: PublishState,
    busy: bool,
    deadline: Instant,
    error_counter: u32,
    frames_sent: u64,
}

impl<B: FrameSink, C: MonotonicClock> TelemetryPublisher<B, C> {
    /// Create a publisher with the default one-second publish period
    pub fn new(bus: B, clock: C, ids: SensorIds) -> Self {
        Self::with_interval(bus, clock, ids, DEFAULT_SEND_INTERVAL)
    }

    /// Create a publisher with a custom publish period
    pub fn with_interval(bus: B, clock: C, ids: SensorIds, send_interval: Duration) -> Self {
        let now = clock.now();

        Self {
            bus,
            clock,
            ids,
            send_interval,
            snapshot: TelemetrySnapshot::default(),
            state: PublishState::Reset,
            busy: false,
            // Already elapsed, so the first cycle starts without waiting
            deadline: now.checked_sub(send_interval).unwrap_or(now),
            error_counter: 0,
            frames_sent: 0,
        }
    }

    /// Hand over a fresh snapshot
    ///
    /// Accepted only while no cycle is in flight; otherwise a silent no-op,
    /// so the running cycle always finishes against the snapshot it started
    /// with.
    pub fn update(&mut self, snapshot: TelemetrySnapshot) {
        if !self.busy {
            self.snapshot = snapshot;
        }
    }

    /// Advance the state machine by exactly one transition
    ///
    /// Never blocks and never panics; every failure is a state transition.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        // Breaker guard runs before the state switch and supersedes it
        if self.error_counter > ERROR_CEILING && self.state != PublishState::Fault {
            error!("CAN bus is not accepting frames, shutting telemetry publishing down");
            self.state = PublishState::Fault;
        }

        match self.state {
            PublishState::Reset => {
                self.error_counter = 0;
                self.snapshot = TelemetrySnapshot::default();
                self.state = PublishState::Idle;
            }

            PublishState::Idle => {
                self.busy = false;
                self.error_counter = 0;
                if now > self.deadline {
                    self.busy = true;
                    self.state = PublishState::SendTemperature;
                }
            }

            PublishState::SendTemperature => {
                self.attempt_send(
                    self.snapshot.temperature,
                    self.ids.temperature,
                    PublishState::SendTemperature,
                    PublishState::SendRelHumidity,
                    "temperature",
                );
            }

            PublishState::SendRelHumidity => {
                self.attempt_send(
                    self.snapshot.relative_humidity,
                    self.ids.rel_humidity,
                    PublishState::SendRelHumidity,
                    PublishState::SendAbsHumidity,
                    "relative humidity",
                );
            }

            PublishState::SendAbsHumidity => {
                self.attempt_send(
                    self.snapshot.absolute_humidity,
                    self.ids.abs_humidity,
                    PublishState::SendAbsHumidity,
                    PublishState::SendAirQualityVoc,
                    "absolute humidity",
                );
            }

            PublishState::SendAirQualityVoc => {
                self.attempt_send(
                    self.snapshot.air_quality_voc,
                    self.ids.air_quality_voc,
                    PublishState::SendAirQualityVoc,
                    PublishState::SendAirQualityCo2,
                    "VOC",
                );
            }

            PublishState::SendAirQualityCo2 => {
                self.attempt_send(
                    self.snapshot.air_quality_co2eq,
                    self.ids.air_quality_co2eq,
                    PublishState::SendAirQualityCo2,
                    PublishState::SendLight,
                    "CO2",
                );
            }

            PublishState::SendLight => {
                self.attempt_send(
                    self.snapshot.light,
                    self.ids.light,
                    PublishState::SendLight,
                    PublishState::SendAirPressure,
                    "light",
                );
            }

            PublishState::SendAirPressure => {
                self.attempt_send(
                    self.snapshot.air_pressure,
                    self.ids.air_pressure,
                    PublishState::SendAirPressure,
                    PublishState::Idle,
                    "air pressure",
                );
                // Rearmed from the time this state ran, not from cycle start
                self.deadline = now + self.send_interval;
            }

            PublishState::Fault => {}
        }
    }

    /// Current publisher phase
    ///
    /// A host wishing to react to [`PublishState::Fault`] polls this.
    pub fn state(&self) -> PublishState {
        self.state
    }

    /// Whether a publish cycle is in flight
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Failed sends since the last counter reset
    pub fn error_count(&self) -> u32 {
        self.error_counter
    }

    /// Frames accepted by the bus over the publisher's lifetime
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Try to publish one field
    ///
    /// The next state is committed first, so an absent field is skipped at
    /// zero cost. A rejected send reverts to `retry` and bumps the error
    /// counter; the same field is attempted again next tick.
    fn attempt_send<V: FrameValue>(
        &mut self,
        value: Option<V>,
        id: u16,
        retry: PublishState,
        next: PublishState,
        label: &'static str,
    ) {
        self.state = next;

        if let Some(value) = value {
            let frame = CanFrame::from_value(id, value);
            if self.bus.try_send(&frame) {
                self.frames_sent += 1;
            } else {
                self.state = retry;
                self.error_counter += 1;
                warn!("Could not send {}", label);
            }
        }
    }
}
