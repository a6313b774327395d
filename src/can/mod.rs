//! # CAN Frame Module
//!
//! Telemetry frame definitions for the sensor bus.
//!
//! This module handles:
//! - CAN frame construction with bounds-checked identifiers and lengths
//! - Little-endian encoding of sensor values into frame payloads
//! - Sensor ID block resolution from the configured base address
//! - SLCAN (Lawicel) ASCII command encoding for serial CAN adapters

pub mod protocol;
pub mod slcan;
