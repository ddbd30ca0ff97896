//! Controller input and the stroke driver
//!
//! Physical controls are sampled once per frame. Each control runs its own
//! `ButtonMachine` so that a held button produces one `Pressed` edge, any
//! number of `Held` samples and one `Released` edge. `ControllerBindings`
//! maps those edges onto `SculptEvent`s, and `Sculptor` turns events into
//! brush calls and commits.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::brush::{BrushAction, GridPos, StrokeSession};
use crate::error::SculptError;
use crate::heightmap::{HeightStore, WorldPos};
use crate::inference::ModelLoader;
use crate::params::SculptConfig;
use crate::pipeline::{CommitParams, CommitReport, TerrainModifier};

// =============================================================================
// BUTTON STATE MACHINE
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    Idle,
    Pressed,
    Released,
}

/// Edge reported for one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEdge {
    None,
    Pressed,
    Held,
    Released,
}

/// Per-control `Idle -> Pressed -> Released -> Idle` machine.
#[derive(Clone, Copy, Debug, Default)]
pub struct ButtonMachine {
    state: ButtonState,
}

impl ButtonMachine {
    /// Feed the current pressed/not-pressed sample.
    pub fn sample(&mut self, down: bool) -> ButtonEdge {
        let (next, edge) = match (self.state, down) {
            (ButtonState::Idle | ButtonState::Released, true) => (ButtonState::Pressed, ButtonEdge::Pressed),
            (ButtonState::Pressed, true) => (ButtonState::Pressed, ButtonEdge::Held),
            (ButtonState::Pressed, false) => (ButtonState::Released, ButtonEdge::Released),
            (ButtonState::Released | ButtonState::Idle, false) => (ButtonState::Idle, ButtonEdge::None),
        };
        self.state = next;
        edge
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// Discrete input consumed by the `Sculptor`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SculptEvent {
    StrokeBegin(WorldPos),
    StrokeUpdate(WorldPos),
    StrokeEnd,
    ClearTerrain,
    CycleTerrainKind,
    ToggleFilled,
    DecreaseErosion,
}

/// One frame of raw controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerFrame {
    /// Drawing hand position in world space
    pub position: WorldPos,
    pub right_trigger: bool,
    pub left_trigger: bool,
    pub left_primary: bool,
    pub right_primary: bool,
    pub right_secondary: bool,
}

/// Button machines for the controls the sculptor listens to.
///
/// - right trigger: draw (begin / update / end stroke)
/// - left trigger: lower erosion strength while held
/// - left primary: cycle terrain kind
/// - right primary: clear terrain
/// - right secondary: toggle filled strokes
#[derive(Clone, Debug, Default)]
pub struct ControllerBindings {
    right_trigger: ButtonMachine,
    left_trigger: ButtonMachine,
    left_primary: ButtonMachine,
    right_primary: ButtonMachine,
    right_secondary: ButtonMachine,
}

impl ControllerBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&mut self, frame: &ControllerFrame) -> Vec<SculptEvent> {
        let mut events = Vec::new();

        match self.left_trigger.sample(frame.left_trigger) {
            ButtonEdge::Pressed | ButtonEdge::Held => events.push(SculptEvent::DecreaseErosion),
            _ => {}
        }

        match self.right_trigger.sample(frame.right_trigger) {
            ButtonEdge::Pressed => {
                events.push(SculptEvent::StrokeBegin(frame.position));
                events.push(SculptEvent::StrokeUpdate(frame.position));
            }
            ButtonEdge::Held => events.push(SculptEvent::StrokeUpdate(frame.position)),
            ButtonEdge::Released => events.push(SculptEvent::StrokeEnd),
            ButtonEdge::None => {}
        }

        if self.left_primary.sample(frame.left_primary) == ButtonEdge::Pressed {
            events.push(SculptEvent::CycleTerrainKind);
        }
        if self.right_primary.sample(frame.right_primary) == ButtonEdge::Pressed {
            events.push(SculptEvent::ClearTerrain);
        }
        if self.right_secondary.sample(frame.right_secondary) == ButtonEdge::Pressed {
            events.push(SculptEvent::ToggleFilled);
        }

        events
    }
}

// =============================================================================
// STROKE DRIVER
// =============================================================================

struct ActiveStroke {
    session: StrokeSession,
    /// Where the stroke began (filled strokes fill back toward it)
    first: GridPos,
    /// |offset| at the first point
    initial_strength: f32,
}

/// Owns the terrain and turns input events into brush calls and commits.
pub struct Sculptor<S: HeightStore, L: ModelLoader> {
    terrain: S,
    modifier: TerrainModifier<L>,
    config: SculptConfig,
    stroke: Option<ActiveStroke>,
}

impl<S: HeightStore, L: ModelLoader> Sculptor<S, L> {
    pub fn new(terrain: S, modifier: TerrainModifier<L>, config: SculptConfig) -> Self {
        Self {
            terrain,
            modifier,
            config,
            stroke: None,
        }
    }

    pub fn terrain(&self) -> &S {
        &self.terrain
    }

    pub fn into_terrain(self) -> S {
        self.terrain
    }

    pub fn config(&self) -> &SculptConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SculptConfig {
        &mut self.config
    }

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// The stroke in progress, if any.
    pub fn stroke(&self) -> Option<&StrokeSession> {
        self.stroke.as_ref().map(|s| &s.session)
    }

    /// Apply one event. Returns the commit report when the event ended a stroke.
    pub fn handle(&mut self, event: SculptEvent) -> Result<Option<CommitReport>, SculptError> {
        match event {
            SculptEvent::StrokeBegin(pos) => self.begin_stroke(pos),
            SculptEvent::StrokeUpdate(pos) => self.update_stroke(pos)?,
            SculptEvent::StrokeEnd => return self.end_stroke(),
            SculptEvent::ClearTerrain => self.clear_terrain()?,
            SculptEvent::CycleTerrainKind => {
                self.config.terrain_kind = self.config.terrain_kind.next();
                info!("Terrain kind: {}", self.config.terrain_kind);
            }
            SculptEvent::ToggleFilled => {
                self.config.filled = !self.config.filled;
                info!("Filled strokes: {}", self.config.filled);
            }
            SculptEvent::DecreaseErosion => self.decrease_erosion(),
        }
        Ok(None)
    }

    /// Height of the drawing hand above the terrain baseline, in world units.
    pub fn stroke_offset(&self, pos: WorldPos) -> f32 {
        pos.y - (self.terrain.position().y + self.config.terrain_offset)
    }

    /// Start a new stroke with the current terrain kind. The start point is
    /// part of the stroke bounds even if no update is sent for it. An
    /// unfinished stroke is discarded without committing.
    pub fn begin_stroke(&mut self, pos: WorldPos) {
        if self.stroke.is_some() {
            warn!("Stroke begun while another was active; discarding the old one");
        }
        let mut session = StrokeSession::new(
            self.config.terrain_kind,
            self.terrain.resolution(),
            self.terrain.size().y,
            self.config.terrain_offset,
        );
        let first = self.terrain.world_to_grid(pos);
        session.track(first, 0.0);
        self.stroke = Some(ActiveStroke {
            session,
            first,
            initial_strength: self.stroke_offset(pos).abs(),
        });
    }

    /// Stamp the brush at `pos`. Strength and footprint scale with the
    /// hand's distance from the baseline.
    pub fn update_stroke(&mut self, pos: WorldPos) -> Result<(), SculptError> {
        let strength = self.stroke_offset(pos).abs();
        let grid = self.terrain.world_to_grid(pos);
        let brush = &self.config.brush;
        let filled = self.config.filled;

        let active = self.stroke.as_mut().ok_or(SculptError::NoActiveStroke)?;
        let kind = active.session.kind();
        let size = (strength * brush.size_factor) as usize;
        let radius = strength * brush.radius_factor;

        let stamp = if filled { strength / brush.filled_strength_divisor } else { strength };
        if kind.is_subtractive() {
            active.session.lower(grid, stamp, size, size);
        } else {
            active.session.raise(grid, stamp, size, size);
        }
        if filled {
            active.session.fill_between(
                kind,
                grid,
                active.first,
                strength,
                active.initial_strength,
                brush.fill_stamp_size,
            );
        }
        active.session.track(grid, radius);
        Ok(())
    }

    /// Finish the stroke and commit it.
    pub fn end_stroke(&mut self) -> Result<Option<CommitReport>, SculptError> {
        let active = self.stroke.take().ok_or(SculptError::NoActiveStroke)?;
        let params = CommitParams::from_config(&self.config);
        self.modifier
            .commit_stroke(&mut self.terrain, active.session, &params, self.config.extraction_source)
    }

    pub fn clear_terrain(&mut self) -> Result<(), SculptError> {
        info!("Clearing terrain to baseline {}", self.config.terrain_offset);
        self.terrain.clear_terrain(self.config.terrain_offset)
    }

    /// Lower erosion strength by one, wrapping from below 0 back to 100.
    pub fn decrease_erosion(&mut self) {
        let mut e = self.config.erosion_strength - 1.0;
        if e < 0.0 {
            e = 100.0;
        }
        self.config.erosion_strength = e.clamp(0.0, 100.0);
        debug!("Erosion strength: {}", self.config.erosion_strength);
    }

    /// Run the whole-terrain restyle with the current settings.
    pub fn restyle(&mut self) -> Result<CommitReport, SculptError> {
        let params = CommitParams::from_config(&self.config);
        self.modifier.restyle_terrain(&mut self.terrain, &params)
    }

    /// Editor brush. `value` is the stroke strength for Raise/Lower and the
    /// normalized target height for Flatten; the sampling actions return the
    /// sampled height.
    ///
    /// Raise and Lower accumulate into the current stroke, starting one at
    /// `world` if none is active.
    pub fn apply_brush_action(
        &mut self,
        action: BrushAction,
        world: WorldPos,
        value: f32,
        width: usize,
        height: usize,
    ) -> Result<Option<f32>, SculptError> {
        match action {
            BrushAction::Raise | BrushAction::Lower => {
                if self.stroke.is_none() {
                    self.begin_stroke(world);
                }
                let grid = self.terrain.world_to_grid(world);
                let radius = width.max(height) as f32 / 2.0;
                let active = self.stroke.as_mut().ok_or(SculptError::NoActiveStroke)?;
                if action == BrushAction::Raise {
                    active.session.raise(grid, value, width, height);
                } else {
                    active.session.lower(grid, value, width, height);
                }
                active.session.track(grid, radius);
                Ok(None)
            }
            BrushAction::Flatten => {
                self.terrain.flatten(world, value, width, height)?;
                Ok(None)
            }
            BrushAction::Sample => self.terrain.sample_height(world).map(Some),
            BrushAction::SampleAverage => self.terrain.sample_average_height(world, width, height).map(Some),
        }
    }
}
