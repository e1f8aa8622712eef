//! Resampling of structure nodes against their reference surfaces, and the
//! blend that stitches two resamplings into one mesh.
//!
//! Data flows one way: [`blend`] resamples through [`resample_curve`] /
//! [`resample_sheet`], which sweep rays with the [`sampler`] functions
//! through a [`RayCaster`] over a [`SpatialIndex`]. The [`stitch`] emitters
//! turn the blended grids into an [`OutputMesh`](crate::geom::OutputMesh).

mod blend;
mod error;
mod grid;
mod raycast;
mod resample;
pub mod sampler;
pub mod stitch;

pub use blend::{BlendSource, blend, blend_resampled};
pub use error::{StitchError, SynthError, SynthResult};
pub use grid::{Grid, Sample};
pub use raycast::{RayCast, RayCaster, ReferenceSurface, SpatialIndex, SurfaceHit};
pub use resample::{
    CurveResampling, ResampleOptions, Resampling, SheetResampling, resample_curve, resample_node,
    resample_sheet,
};
pub use sampler::{PlaneGrid, PlaneSide, SamplerOptions, SamplingStats};

#[cfg(test)]
mod tests;
