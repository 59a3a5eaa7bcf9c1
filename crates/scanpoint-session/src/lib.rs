//! # scanpoint-session: The Scanning Session State Machine
//!
//! A scanning session acquires an exclusive camera stream, drives an opaque
//! frame-decoding engine, and forwards the first accepted barcode to the
//! dispatch pipeline. The hard part is not decoding — it is guaranteeing
//! that the camera is released on **every** possible exit path and that
//! decode callbacks arriving after a transition are ignored rather than
//! trusted to stop.
//!
//! ## Session Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScanSession Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        ScanSession task                          │  │
//! │  │                                                                  │  │
//! │  │  • Owns CameraResource and the decode engine lifecycle           │  │
//! │  │  • Runs the Idle → Initializing → Active → Stopped machine       │  │
//! │  │  • Filters decode deliveries by generation + current state       │  │
//! │  │  • Publishes SessionStatus through a watch channel               │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼──────────────────────┐                 │
//! │         ▼                     ▼                      ▼                  │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ CameraDriver   │  │ DecodeEngine   │  │ SessionHandle          │    │
//! │  │ (trait)        │  │ (trait)        │  │                        │    │
//! │  │                │  │                │  │ start / stop /         │    │
//! │  │ Platform opens │  │ Decodes frames │  │ shutdown commands,     │    │
//! │  │ the stream     │  │ off-thread     │  │ status observation     │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  EXIT PATHS (all release the camera in the same transition):           │
//! │  ──────────────────────────────────────────────────────────            │
//! │  explicit stop • accepted scan • page hidden • shutdown •              │
//! │  permission denied • device busy after the single retry                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod camera;
pub mod config;
pub mod decode;
pub mod error;
pub mod session;
pub mod visibility;

pub use camera::{CameraDriver, CameraHandle, CameraResource, FacingMode, MediaTrack, StreamConstraints};
pub use config::ScannerConfig;
pub use decode::{BarcodeReader, DecodeEngine, DecodeSender, DecoderConfig};
pub use error::{CameraError, DecodeError, SessionError, SessionResult};
pub use session::{ScanSession, SessionHandle, SessionStatus};
pub use visibility::VisibilityGuard;

#[cfg(test)]
pub(crate) mod testing;
