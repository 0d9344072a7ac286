//! Data model for glyph annotation.

pub mod annotation;
pub mod geometry;
pub mod helper;

pub use annotation::{BlockAnnotation, BlockHelper, CharacterAnnotation, ImageAnnotation};
pub use geometry::{BoundingBox, Point, Polygon, Segment};
pub use helper::{
    CommitHint, Effect, HelperEvent, PerspectiveHelper, TextDirection, Transition,
};
