//! # ripple_field
//!
//! A small particle system: every pluck leaves a rotating, multi-armed
//! spiral that fades to nothing over a fixed number of frames.
//!
//! Drawing goes through the [`Surface`] trait so the same ripples render
//! into a window, an offscreen buffer, or a [`RecordingSurface`] in tests.
//!
//! ## Per-frame contract
//!
//! | Call | When | Effect |
//! |---|---|---|
//! | [`RippleField::spawn`] | once per pluck | new ripple, `age = 0` |
//! | [`RippleField::advance`] | exactly once per frame | `age += 1`, expired ripples removed |
//! | [`RippleField::render`] | once per frame | one spiral per live ripple |

pub mod surface;
pub mod ripple;

pub use surface::{Rgba, Stroke, Surface, RecordingSurface, DrawCall};
pub use ripple::{Ripple, RippleId, RippleConfig, RippleField, SpiralStyle};
