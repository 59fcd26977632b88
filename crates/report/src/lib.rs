//! Curators Report
//!
//! Result sink for named projections of simulation state. A caller declares the
//! projections once, then repeatedly fills one row per point and renders:
//!
//! - **ConsoleSummary**: logs the mean of every coordinate
//! - **Plot**: writes one tab-separated data table per projection
//!
//! Rendering of the plot tables themselves is left to external tooling.

mod projected;

pub use projected::{Projection, ProjectionSpec, ProjectedData, SinkKind};
