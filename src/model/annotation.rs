//! Annotation data model.
//!
//! The persistence hierarchy is Image → Block → Character: an image holds a
//! sequence of blocks (one stroke session, usually one text line), a block
//! holds the characters cut from its frame plus the transient construction
//! state of the frame itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{ILLEGIBLE_TEXT, MASK_PROP};
use crate::model::geometry::{Point, Polygon};
use crate::model::helper::{CommitHint, Effect, HelperEvent, PerspectiveHelper, Transition};

/// One labeled glyph: a quadrilateral box, a 0-or-1-glyph transcription
/// (`"*"` marks an illegible glyph) and open quality flags.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterAnnotation {
    pub polygon: Polygon,
    pub text: String,
    #[serde(default)]
    pub props: BTreeMap<String, i32>,
}

impl CharacterAnnotation {
    /// A fresh character box awaiting its transcription.
    pub fn new(polygon: Polygon) -> Self {
        Self {
            polygon,
            text: String::new(),
            props: BTreeMap::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: i32) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn is_illegible(&self) -> bool {
        self.text == ILLEGIBLE_TEXT
    }

    pub fn is_masked(&self) -> bool {
        self.props.get(MASK_PROP).copied() == Some(1)
    }
}

/// Which construction helper a block uses.
///
/// Only the perspective helper exists today; the tag survives in the wire
/// format so a block without construction state stays representable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockHelper {
    None,
    Perspective(PerspectiveHelper),
}

impl Default for BlockHelper {
    fn default() -> Self {
        BlockHelper::Perspective(PerspectiveHelper::new())
    }
}

/// One stroke session: a frame plus the characters cut from it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockAnnotation {
    pub characters: Vec<CharacterAnnotation>,
    pub helper: BlockHelper,
}

impl BlockAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one construction event to the block's helper.
    pub fn apply(&mut self, event: HelperEvent) -> Transition {
        match &mut self.helper {
            BlockHelper::Perspective(helper) => helper.apply(event, &mut self.characters),
            BlockHelper::None => Transition::none(),
        }
    }

    /// Number of glyphs the transcription must supply.
    pub fn words_needed(&self) -> usize {
        self.characters.len()
    }

    pub fn is_text_complete(&self) -> bool {
        self.characters.iter().all(CharacterAnnotation::has_text)
    }

    /// Commit a transcription for the whole block.
    ///
    /// Whitespace (including ideographic spaces) is stripped; the remaining
    /// glyph count must match [`BlockAnnotation::words_needed`] exactly. On
    /// mismatch a validation message is returned and nothing is mutated.
    pub fn input_text(&mut self, text: &str) -> Transition {
        if self.characters.is_empty() {
            return Transition::none();
        }
        let glyphs: Vec<char> = text
            .chars()
            .filter(|c| !matches!(c, ' ' | '\t' | '\u{3000}'))
            .collect();
        if glyphs.len() != self.characters.len() {
            return Transition::none().with_effect(Effect::ValidationMessage(format!(
                "expected {} glyphs, got {}",
                self.characters.len(),
                glyphs.len()
            )));
        }
        for (character, glyph) in self.characters.iter_mut().zip(&glyphs) {
            character.text = glyph.to_string();
        }
        Transition::strong()
    }

    /// Remove one character. Apart from a tool switch this is the only way
    /// a committed character leaves its block (batch correction flow).
    pub fn remove_character(&mut self, index: usize) -> Option<CharacterAnnotation> {
        if index < self.characters.len() {
            Some(self.characters.remove(index))
        } else {
            None
        }
    }

    /// Mark every character of the block as an illegible ignore region.
    pub fn mask(&mut self) -> Transition {
        if self.characters.is_empty() {
            return Transition::none();
        }
        for character in &mut self.characters {
            character.text = ILLEGIBLE_TEXT.to_string();
            character.props.insert(MASK_PROP.to_string(), 1);
        }
        Transition::strong()
    }

    pub fn helper_polygons(&self) -> Vec<Polygon> {
        match &self.helper {
            BlockHelper::Perspective(helper) => helper.helper_polygons(),
            BlockHelper::None => Vec::new(),
        }
    }

    pub fn pending_character_polygon(&self) -> Option<Polygon> {
        match &self.helper {
            BlockHelper::Perspective(helper) => helper.pending_character_polygon(),
            BlockHelper::None => None,
        }
    }
}

/// Root persistence unit for one image.
///
/// The block list is never empty while editing: the last block is always a
/// fresh one ready to receive the next frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnnotation {
    pub blocks: Vec<BlockAnnotation>,
    pub focus_point: Point,
}

impl Default for ImageAnnotation {
    fn default() -> Self {
        Self {
            blocks: vec![BlockAnnotation::new()],
            focus_point: Point::default(),
        }
    }
}

impl ImageAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The block currently under construction. Restores the non-empty
    /// invariant if a decoded stream carried no blocks.
    fn active_block_mut(&mut self) -> &mut BlockAnnotation {
        if self.blocks.is_empty() {
            self.blocks.push(BlockAnnotation::new());
        }
        self.blocks.last_mut().unwrap()
    }

    /// Feed one construction event to the active block. Start points also
    /// update the persisted focus point (a viewport hint).
    pub fn apply(&mut self, event: HelperEvent) -> Transition {
        if let HelperEvent::Start { pos, .. } = event {
            self.focus_point = pos;
        }
        self.active_block_mut().apply(event)
    }

    /// Open a fresh block for the next frame.
    pub fn new_block(&mut self) {
        self.blocks.push(BlockAnnotation::new());
    }

    pub fn words_needed(&self, index: usize) -> usize {
        self.blocks.get(index).map_or(0, BlockAnnotation::words_needed)
    }

    pub fn is_text_complete(&self, index: usize) -> bool {
        self.blocks
            .get(index)
            .is_some_and(BlockAnnotation::is_text_complete)
    }

    /// Commit a transcription for one block. Closing the last block opens a
    /// fresh one.
    pub fn input_text(&mut self, index: usize, text: &str) -> Transition {
        let last = index + 1 == self.blocks.len();
        let Some(block) = self.blocks.get_mut(index) else {
            return Transition::none();
        };
        let mut transition = block.input_text(text);
        if transition.commit == CommitHint::Strong && block.is_text_complete() && last {
            self.new_block();
            transition.effects.push(Effect::BlockClosed);
        }
        transition
    }

    /// Mark one block as an illegible ignore region.
    pub fn mask_block(&mut self, index: usize) -> Transition {
        self.blocks
            .get_mut(index)
            .map_or_else(Transition::none, BlockAnnotation::mask)
    }

    /// All characters across all blocks, in annotation order.
    pub fn characters(&self) -> impl Iterator<Item = &CharacterAnnotation> {
        self.blocks.iter().flat_map(|b| b.characters.iter())
    }

    /// Characters that carry a transcription.
    pub fn labeled_characters(&self) -> impl Iterator<Item = &CharacterAnnotation> {
        self.characters().filter(|c| c.has_text())
    }

    pub fn helper_polygons(&self) -> Vec<Polygon> {
        self.blocks.iter().flat_map(|b| b.helper_polygons()).collect()
    }

    pub fn pending_character_polygons(&self) -> Vec<Polygon> {
        self.blocks
            .iter()
            .filter_map(|b| b.pending_character_polygon())
            .collect()
    }
}
