//! Location tracking, radar state, and marker reconciliation for Third Eye.
//!
//! This crate turns device fixes, radius requests, and a supplied entity set
//! into markers on a map. A [`RadarSession`] owns all of it and runs every
//! trigger to completion: fix or radius change, proximity compute,
//! reconcile, selection refresh.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `thirdeye-config.yaml` into
//!   strongly-typed structs.
//! - [`sensor`] -- [`LocationSensor`] trait and stub sensors.
//! - [`tracker`] -- [`LocationTracker`], the owner of the current location.
//! - [`radar`] -- The `Off`/`Active` activation state machine and radius
//!   parsing.
//! - [`surface`] -- [`RenderingSurface`] trait and [`InMemorySurface`].
//! - [`reconciler`] -- [`MarkerReconciler`], which keeps the surface in step
//!   with the proximity result.
//! - [`selection`] -- The entity shown in the detail popover.
//! - [`session`] -- [`RadarSession`], the context object tying it together.
//!
//! [`LocationSensor`]: sensor::LocationSensor
//! [`LocationTracker`]: tracker::LocationTracker
//! [`RenderingSurface`]: surface::RenderingSurface
//! [`InMemorySurface`]: surface::InMemorySurface
//! [`MarkerReconciler`]: reconciler::MarkerReconciler
//! [`RadarSession`]: session::RadarSession

pub mod config;
pub mod radar;
pub mod reconciler;
pub mod selection;
pub mod sensor;
pub mod session;
pub mod surface;
pub mod tracker;
