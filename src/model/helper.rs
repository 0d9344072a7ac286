//! Perspective frame construction.
//!
//! This module implements the incremental state machine that turns a short
//! sequence of pointer events into a perspective-corrected quadrilateral
//! frame for one text line, then cuts that frame into one quadrilateral per
//! character as the user strokes across it.
//!
//! The machine is expressed as an explicit transition function:
//! [`PerspectiveHelper::apply`] consumes one [`HelperEvent`] and returns a
//! [`Transition`] carrying a commit hint for the history manager and the
//! effects observers need (characters emitted, characters cleared,
//! validation messages). Nothing in here knows about a presentation layer.

use serde::{Deserialize, Serialize};

use crate::constants::{ALONG_BASE_BIAS, HORIZONTAL_TEXT_THRESHOLD, JITTER_REJECT_DISTANCE};
use crate::model::annotation::CharacterAnnotation;
use crate::model::geometry::{Point, Polygon, Segment};

/// Reading direction of the text relative to the frame's base edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextDirection {
    /// Not resolved yet; detected from the first stroke.
    #[default]
    Auto,
    /// Characters follow the base edge.
    AlongBase,
    /// Characters run perpendicular to the base edge.
    AcrossBase,
}

/// One discrete input event for the construction machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HelperEvent {
    /// Pointer pressed: place the next corner, or begin/finish a stroke.
    Start { pos: Point, regular: bool },
    /// Pointer moved: live preview of the unconfirmed vertex or stroke end.
    Pending { pos: Point, regular: bool },
    /// Pointer released: confirm the pending placement.
    End { pos: Point, regular: bool },
    /// Return key: single-character shortcut, or a request for text input.
    Enter,
    /// Tab key: toggle the vertical-lock override and restart the block.
    SwitchTool,
}

/// Observable result of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A character box was appended to the block.
    CharacterEmitted(Polygon),
    /// All committed characters of the block were discarded.
    CharactersCleared,
    /// The block finished text input and a fresh block was opened.
    BlockClosed,
    /// User input was rejected; no state was mutated.
    ValidationMessage(String),
}

/// How the resulting state should be recorded by the history manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitHint {
    /// Durable mutation: record a snapshot.
    Strong,
    /// Provisional mutation (frame under construction): record a soft
    /// snapshot that the next commit overwrites.
    Weak,
    /// Nothing worth recording (preview, rejected jitter, no-op).
    #[default]
    None,
}

/// The outcome of one event application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub commit: CommitHint,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn weak() -> Self {
        Self {
            commit: CommitHint::Weak,
            effects: Vec::new(),
        }
    }

    pub fn strong() -> Self {
        Self {
            commit: CommitHint::Strong,
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Transient per-block construction state.
///
/// Corners are stored in placement order: `corners[0]` and `corners[1]` form
/// the base edge, `corners[2]` and `corners[3]` the top edge. The polygon
/// winding is resolved lazily (see [`PerspectiveHelper::frame_quad`]) so the
/// user may draw the top edge in either direction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerspectiveHelper {
    pub num_points: u32,
    pub corners: [Point; 4],
    pub stroke: Segment,
    /// When set, the vertical auto-lock for horizontal text is disabled.
    pub tool_switched: bool,
    pub stroking: bool,
    /// Each frame becomes exactly one character box.
    pub single_character: bool,
    pub direction: TextDirection,
}

impl PerspectiveHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event, mutating the helper and the block's character list.
    pub fn apply(
        &mut self,
        event: HelperEvent,
        characters: &mut Vec<CharacterAnnotation>,
    ) -> Transition {
        match event {
            HelperEvent::Start { pos, regular } => self.on_start(pos, regular, characters),
            HelperEvent::Pending { pos, regular } => self.on_pending(pos, regular),
            HelperEvent::End { pos, regular } => self.on_end(pos, regular, characters),
            HelperEvent::Enter => self.on_enter(characters),
            HelperEvent::SwitchTool => self.on_switch_tool(characters),
        }
    }

    fn on_start(
        &mut self,
        pos: Point,
        regular: bool,
        characters: &mut Vec<CharacterAnnotation>,
    ) -> Transition {
        match self.num_points {
            0 => {
                self.corners = [pos; 4];
                self.num_points = 1;
                Transition::weak()
            }
            1 => {
                if self.is_jitter(pos, self.corners[0]) {
                    return Transition::none();
                }
                self.corners[1] = self.project_base(pos, regular);
                self.num_points = 2;
                Transition::weak()
            }
            2 => {
                if self.is_jitter(pos, self.corners[1]) {
                    return Transition::none();
                }
                if regular {
                    // Rectangle over the base: the supplied point only
                    // contributes the perpendicular offset.
                    let (c2, c3) = self.rectangle_top(pos);
                    self.corners[2] = c2;
                    self.corners[3] = c3;
                    self.num_points = 4;
                    return self.frame_resolved(characters);
                }
                self.corners[2] = pos;
                self.corners[3] = pos;
                self.num_points = 3;
                Transition::weak()
            }
            3 => {
                if self.is_jitter(pos, self.corners[2]) {
                    return Transition::none();
                }
                self.corners[3] = if regular {
                    // Parallelogram: the supplied point is ignored.
                    self.corners[2] - self.corners[0] + self.corners[1]
                } else {
                    pos
                };
                self.num_points = 4;
                self.frame_resolved(characters)
            }
            _ => {
                if !self.stroking {
                    self.stroking = true;
                    self.stroke = Segment::new(pos, pos);
                    Transition::none()
                } else {
                    self.stroke.p2 = pos;
                    self.try_finish_stroke(characters)
                }
            }
        }
    }

    fn on_pending(&mut self, pos: Point, regular: bool) -> Transition {
        match self.num_points {
            1 => self.corners[1] = self.project_base(pos, regular),
            2 => {
                if regular {
                    let (c2, c3) = self.rectangle_top(pos);
                    self.corners[2] = c2;
                    self.corners[3] = c3;
                } else {
                    self.corners[2] = pos;
                    self.corners[3] = pos;
                }
            }
            3 => {
                self.corners[3] = if regular {
                    self.corners[2] - self.corners[0] + self.corners[1]
                } else {
                    pos
                };
            }
            4 if self.stroking => self.stroke.p2 = pos,
            _ => {}
        }
        Transition::none()
    }

    fn on_end(
        &mut self,
        pos: Point,
        regular: bool,
        characters: &mut Vec<CharacterAnnotation>,
    ) -> Transition {
        match self.num_points {
            1..=3 => {
                // Confirms the corner placed by the preceding start; a drag
                // may have moved it since.
                self.on_pending(pos, regular);
                Transition::weak()
            }
            4 if self.stroking => {
                self.stroke.p2 = pos;
                if self.stroke.length() < JITTER_REJECT_DISTANCE {
                    // Click-click stroking: the stroke stays live and the
                    // second click will complete it.
                    Transition::none()
                } else {
                    self.try_finish_stroke(characters)
                }
            }
            _ => Transition::none(),
        }
    }

    fn on_enter(&mut self, characters: &mut Vec<CharacterAnnotation>) -> Transition {
        if self.num_points < 4 || !characters.is_empty() {
            // No substantive change; the caller interprets this as a request
            // to begin text input.
            return Transition::none();
        }
        self.single_character = true;
        self.emit_frame_character(characters)
    }

    fn on_switch_tool(&mut self, characters: &mut Vec<CharacterAnnotation>) -> Transition {
        self.tool_switched = !self.tool_switched;
        characters.clear();
        Transition::strong().with_effect(Effect::CharactersCleared)
    }

    /// The frame just reached four corners.
    fn frame_resolved(&mut self, characters: &mut Vec<CharacterAnnotation>) -> Transition {
        if self.single_character {
            self.emit_frame_character(characters)
        } else {
            Transition::strong()
        }
    }

    fn try_finish_stroke(&mut self, characters: &mut Vec<CharacterAnnotation>) -> Transition {
        if self.stroke.length() < JITTER_REJECT_DISTANCE {
            return Transition::none();
        }
        if self.direction == TextDirection::Auto {
            self.direction = self.detect_direction(&self.stroke);
        }
        let polygon = self.pending_character_polygon();
        self.stroking = false;
        match polygon {
            Some(polygon) => {
                characters.push(CharacterAnnotation::new(polygon.clone()));
                Transition::strong().with_effect(Effect::CharacterEmitted(polygon))
            }
            None => {
                log::debug!("degenerate stroke rejected, no character emitted");
                Transition::none()
            }
        }
    }

    /// Append one character covering the whole frame, then restart.
    fn emit_frame_character(&mut self, characters: &mut Vec<CharacterAnnotation>) -> Transition {
        let polygon = Polygon::from(self.frame_quad().to_vec());
        characters.push(CharacterAnnotation::new(polygon.clone()));
        self.num_points = 0;
        self.stroking = false;
        Transition::strong().with_effect(Effect::CharacterEmitted(polygon))
    }

    fn is_jitter(&self, pos: Point, previous: Point) -> bool {
        pos.distance_to(&previous) < JITTER_REJECT_DISTANCE
    }

    /// Base placement with the optional axis-aligned snap.
    fn project_base(&self, pos: Point, regular: bool) -> Point {
        if !regular {
            return pos;
        }
        let d = pos - self.corners[0];
        if d.x.abs() >= d.y.abs() {
            Point::new(pos.x, self.corners[0].y)
        } else {
            Point::new(self.corners[0].x, pos.y)
        }
    }

    /// Top corner pair for the regular rectangle: forced to the base pair's
    /// x (horizontal base) or y (vertical base).
    fn rectangle_top(&self, pos: Point) -> (Point, Point) {
        let base = self.corners[1] - self.corners[0];
        if base.x.abs() >= base.y.abs() {
            (
                Point::new(self.corners[0].x, pos.y),
                Point::new(self.corners[1].x, pos.y),
            )
        } else {
            (
                Point::new(pos.x, self.corners[0].y),
                Point::new(pos.x, self.corners[1].y),
            )
        }
    }

    /// The frame's four corners in a non-self-intersecting winding.
    ///
    /// The top edge may have been drawn in either direction; the ordering is
    /// resolved by testing which diagonal pairing makes the two side edges
    /// cross each other.
    pub fn frame_quad(&self) -> [Point; 4] {
        let [c0, c1, c2, c3] = self.corners;
        if Segment::new(c0, c2).crosses(&Segment::new(c1, c3)) {
            [c0, c1, c2, c3]
        } else {
            [c0, c1, c3, c2]
        }
    }

    /// Resolve the reading direction from a stroke vector: compare its dot
    /// product against the frame's two principal unit axes, favoring
    /// along-base by a fixed bias.
    fn detect_direction(&self, stroke: &Segment) -> TextDirection {
        let bound = self.frame_quad();
        let hori = Segment::new(bound[0].midpoint(&bound[3]), bound[1].midpoint(&bound[2])).unit();
        let vert = Segment::new(bound[0].midpoint(&bound[1]), bound[2].midpoint(&bound[3])).unit();
        let d = stroke.delta();
        if d.dot(&hori).abs() * ALONG_BASE_BIAS >= d.dot(&vert).abs() {
            TextDirection::AlongBase
        } else {
            TextDirection::AcrossBase
        }
    }

    /// The long-edge pair the characters are cut along, per direction.
    fn side_edges(&self, direction: TextDirection) -> (Segment, Segment) {
        let bound = self.frame_quad();
        match direction {
            TextDirection::AcrossBase => (
                Segment::new(bound[3], bound[2]),
                Segment::new(bound[0], bound[1]),
            ),
            _ => (
                Segment::new(bound[0], bound[3]),
                Segment::new(bound[1], bound[2]),
            ),
        }
    }

    /// Whether the text reads horizontally: both side edges are
    /// near-vertical.
    fn is_horizontal_text(&self, direction: TextDirection) -> bool {
        if self.num_points < 4 {
            return false;
        }
        let (left, right) = self.side_edges(direction);
        left.unit().x.abs().max(right.unit().x.abs()) < HORIZONTAL_TEXT_THRESHOLD
    }

    /// The character quadrilateral cut by the current stroke, if any.
    ///
    /// The stroke endpoints are projected along the (possibly
    /// vertically-locked) side-edge directions, through the side pair's
    /// vanishing point when they intersect or by pure translation when they
    /// are parallel, and intersected with the frame's bottom and top
    /// cross-edges.
    pub fn pending_character_polygon(&self) -> Option<Polygon> {
        if !self.stroking || self.num_points < 4 {
            return None;
        }
        let direction = match self.direction {
            TextDirection::Auto => self.detect_direction(&self.stroke),
            resolved => resolved,
        };
        let (mut left, mut right) = self.side_edges(direction);
        let bottom = Segment::new(left.p1, right.p1);
        let top = Segment::new(left.p2, right.p2);
        if !self.tool_switched && self.is_horizontal_text(direction) {
            left = Segment::new(left.p1, left.p1 + Point::new(0.0, 1.0));
            right = Segment::new(right.p1, right.p1 + Point::new(0.0, 1.0));
        }
        let (l1, l2) = match left.line_intersection(&right) {
            Some(vanish) => (
                Segment::new(vanish, self.stroke.p1),
                Segment::new(vanish, self.stroke.p2),
            ),
            None => {
                let delta = left.delta() + right.delta();
                (
                    Segment::new(self.stroke.p1, self.stroke.p1 + delta),
                    Segment::new(self.stroke.p2, self.stroke.p2 + delta),
                )
            }
        };
        let q1 = l1.line_intersection(&bottom)?;
        let q2 = l2.line_intersection(&bottom)?;
        let q3 = l2.line_intersection(&top)?;
        let q4 = l1.line_intersection(&top)?;
        Some(Polygon::from(vec![q1, q2, q3, q4]))
    }

    /// Outline polygons for a rendering collaborator: the partial or full
    /// frame, when anything has been placed.
    pub fn helper_polygons(&self) -> Vec<Polygon> {
        match self.num_points {
            0 => Vec::new(),
            4 => vec![Polygon::from(self.frame_quad().to_vec())],
            n => vec![Polygon::from(self.corners[..n as usize].to_vec())],
        }
    }
}
