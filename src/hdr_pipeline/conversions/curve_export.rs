use std::path::Path;

use tracing::{info, instrument};

use crate::hdr_pipeline::common::error::{HdrError, Result};
use crate::hdr_pipeline::conversions::types::{CurveKind, CurveSelection};
use crate::hdr_pipeline::curve::ResponseCurve;

/// Writes the curve `curves` selects for `kind`, with `bins` bins, to
/// `path` under the kind's display name. Returns the written curve.
#[instrument(skip(curves, path), fields(path = %path.as_ref().display()))]
pub fn export_curve<P: AsRef<Path>>(
    kind: CurveKind,
    curves: &CurveSelection,
    bins: usize,
    path: P,
) -> Result<ResponseCurve> {
    let curve = match kind {
        CurveKind::Response => curves.response_curve(bins)?,
        CurveKind::Weight => curves.weight_curve(bins)?,
    }
    .ok_or_else(|| HdrError::MissingCurve(kind.to_string()))?;

    curve.write(path.as_ref(), &kind.to_string())?;
    info!(bins = curve.bins(), "Exported {}", kind);
    Ok(curve)
}
