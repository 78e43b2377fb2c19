//! Tag-driven geometry extraction.
//!
//! `ExtractionContext` consumes tokenizer events one at a time and owns
//! everything the walk needs: the parser state, the sticky surface color,
//! the coordinate text of the contour being read, the rings of the current
//! polygon, the running bounding box and the mesh list. Nothing is shared, so
//! independent documents can be extracted side by side.
//!
//! Transitions:
//!
//! | event                        | effect                                           |
//! |------------------------------|--------------------------------------------------|
//! | open surface tag (Searching) | base color = lookup color                        |
//! | open exterior / interior     | -> ReadingCoordinates, new contour               |
//! | text (ReadingCoordinates)    | append to coordinate buffer                      |
//! | close pos / posList          | append one separator                             |
//! | close exterior / interior    | parse triples, expand bounds, push ring          |
//! | close Polygon                | normal, tessellate, shade, push mesh, -> Searching |
//! | close Solid / MultiSurface   | -> Searching                                     |
//! | close surface tag            | base color = white                               |

use std::f64::consts::PI;

use glam::DVec3;
use thiserror::Error;

use crate::citygml::event::{EventSink, ParseEvent};
use crate::citygml::surface::{AMBIENT_COLOR, Tag};
use crate::geometry::{
    BoundingBox, EarcutTessellator, MeshEntry, MeshList, Point3, Polygon, Ring, SurfaceClass,
    Tessellator, classify_surface, ring_normal,
};

/// Direction the light travels in, normalized (1, 2, -3).
pub const LIGHT_AXIS: DVec3 = DVec3::new(
    0.2672612419124244,
    0.5345224838248488,
    -0.8017837257372732,
);

pub const SHADE_MIN: f64 = 0.3;
pub const SHADE_MAX: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Searching,
    ReadingCoordinates,
}

/// What to do with a coordinate token that is not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericPolicy {
    /// Keep the point with a NaN component.
    #[default]
    PropagateNan,
    /// Substitute 0.0 for the bad component.
    Zero,
    /// Drop the whole point.
    SkipPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid coordinate token '{0}'")]
pub struct InvalidCoordinate(pub String);

/// Parses one coordinate value. `inf` and `nan` spellings are rejected like
/// any other non-number.
pub fn parse_coordinate(token: &str) -> Result<f64, InvalidCoordinate> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InvalidCoordinate(token.to_string())),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub polygons: usize,
    pub triangles: usize,
    pub degenerate_polygons: usize,
    pub invalid_tokens: usize,
    pub dropped_values: usize,
    pub roof_polygons: usize,
    pub wall_polygons: usize,
    pub floor_polygons: usize,
}

/// Shade factor in `[SHADE_MIN, SHADE_MAX]` from the angle between the face
/// normal and the light axis.
pub fn shade_factor(normal: DVec3) -> f64 {
    let angle = normal.dot(LIGHT_AXIS).clamp(-1.0, 1.0).acos() / PI;
    SHADE_MIN + angle * (SHADE_MAX - SHADE_MIN)
}

pub struct ExtractionContext<T: Tessellator = EarcutTessellator> {
    state: ParserState,
    surface_color: [f32; 3],
    coordinate_text: String,
    polygon: Polygon,
    bounds: BoundingBox,
    meshes: MeshList,
    stats: ExtractionStats,
    policy: NumericPolicy,
    tessellator: T,
    closed: bool,
    error: Option<String>,
}

impl Default for ExtractionContext {
    fn default() -> Self {
        Self::new(NumericPolicy::default())
    }
}

impl ExtractionContext {
    pub fn new(policy: NumericPolicy) -> Self {
        Self::with_tessellator(policy, EarcutTessellator)
    }
}

impl<T: Tessellator> ExtractionContext<T> {
    pub fn with_tessellator(policy: NumericPolicy, tessellator: T) -> Self {
        Self {
            state: ParserState::Searching,
            surface_color: AMBIENT_COLOR,
            coordinate_text: String::new(),
            polygon: Polygon::new(),
            bounds: BoundingBox::new(),
            meshes: Vec::new(),
            stats: ExtractionStats::default(),
            policy,
            tessellator,
            closed: false,
            error: None,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn surface_color(&self) -> [f32; 3] {
        self.surface_color
    }

    pub fn meshes(&self) -> &[MeshEntry] {
        &self.meshes
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    /// True once `End` or `Error` was seen.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Hands the finished mesh and its bounds over to the renderer.
    pub fn into_parts(self) -> (MeshList, BoundingBox) {
        (self.meshes, self.bounds)
    }

    fn open_tag(&mut self, name: &str) {
        match Tag::classify(name) {
            Tag::Surface(kind) if self.state == ParserState::Searching => {
                self.surface_color = kind.color();
            }
            Tag::Contour => {
                if self.state == ParserState::Searching {
                    self.state = ParserState::ReadingCoordinates;
                }
                self.coordinate_text.clear();
            }
            _ => {}
        }
    }

    fn close_tag(&mut self, name: &str) {
        match Tag::classify(name) {
            Tag::Coordinates if self.state == ParserState::ReadingCoordinates => {
                self.coordinate_text.push(' ');
            }
            Tag::Contour if self.state == ParserState::ReadingCoordinates => {
                let text = std::mem::take(&mut self.coordinate_text);
                let ring = self.parse_ring(&text);
                self.polygon.push_ring(ring);
            }
            Tag::Polygon => {
                if self.state == ParserState::ReadingCoordinates {
                    self.finish_polygon();
                }
                self.coordinate_text.clear();
                self.state = ParserState::Searching;
            }
            Tag::Wrapper => {
                if !self.polygon.is_empty() {
                    log::warn!(
                        "Discarding {} unterminated ring(s) at </{}>",
                        self.polygon.rings.len(),
                        name
                    );
                    self.polygon.clear();
                }
                self.coordinate_text.clear();
                self.state = ParserState::Searching;
            }
            Tag::Surface(_) => {
                self.surface_color = AMBIENT_COLOR;
            }
            _ => {}
        }
    }

    fn parse_ring(&mut self, text: &str) -> Ring {
        let mut values: Vec<Option<f64>> = Vec::new();
        for token in text.split_ascii_whitespace() {
            match parse_coordinate(token) {
                Ok(v) => values.push(Some(v)),
                Err(e) => {
                    if self.stats.invalid_tokens == 0 {
                        log::warn!("{} (policy {:?})", e, self.policy);
                    } else {
                        log::debug!("{}", e);
                    }
                    self.stats.invalid_tokens += 1;
                    values.push(match self.policy {
                        NumericPolicy::PropagateNan => Some(f64::NAN),
                        NumericPolicy::Zero => Some(0.0),
                        NumericPolicy::SkipPoint => None,
                    });
                }
            }
        }

        let triples = values.chunks_exact(3);
        let remainder = triples.remainder().len();
        if remainder > 0 {
            log::warn!("Dropping {} coordinate value(s) not forming a triple", remainder);
            self.stats.dropped_values += remainder;
        }

        let mut ring = Ring::with_capacity(values.len() / 3);
        for triple in triples {
            let (Some(x), Some(y), Some(z)) = (triple[0], triple[1], triple[2]) else {
                continue;
            };
            self.bounds.expand_x(x);
            self.bounds.expand_y(y);
            self.bounds.expand_z(z);
            ring.push(Point3::new(x, y, z));
        }
        ring
    }

    fn finish_polygon(&mut self) {
        let polygon = std::mem::take(&mut self.polygon);
        let Some(exterior) = polygon.exterior() else {
            return;
        };

        let normal = ring_normal(exterior);
        let triangles = match self.tessellator.tessellate(exterior, polygon.holes(), normal) {
            Ok(triangles) => triangles,
            Err(e) => {
                log::warn!("{}", e);
                Vec::new()
            }
        };

        if triangles.is_empty() {
            log::debug!("Skipping degenerate polygon with {} point(s)", exterior.len());
            self.stats.degenerate_polygons += 1;
            return;
        }

        let shade = shade_factor(normal) as f32;
        let color = self.surface_color.map(|c| c * shade);

        self.stats.polygons += 1;
        self.stats.triangles += triangles.len() / 3;
        match classify_surface(normal) {
            SurfaceClass::Roof => self.stats.roof_polygons += 1,
            SurfaceClass::Wall => self.stats.wall_polygons += 1,
            SurfaceClass::Floor => self.stats.floor_polygons += 1,
        }

        self.meshes.push(MeshEntry { triangles, color });
    }
}

impl<T: Tessellator> EventSink for ExtractionContext<T> {
    fn handle_event(&mut self, event: ParseEvent) {
        if self.closed {
            log::trace!("Ignoring event after end of document: {:?}", event);
            return;
        }

        match event {
            ParseEvent::OpenTag { name, .. } => self.open_tag(&name),
            ParseEvent::CloseTag { name } => self.close_tag(&name),
            ParseEvent::Text(chars) => {
                if self.state == ParserState::ReadingCoordinates {
                    self.coordinate_text.push_str(&chars);
                }
            }
            ParseEvent::End => {
                if !self.polygon.is_empty() {
                    log::warn!("Document ended inside a polygon; its rings are dropped");
                    self.polygon.clear();
                }
                self.closed = true;
                log::info!(
                    "Extraction finished: {} polygons, {} triangles",
                    self.stats.polygons,
                    self.stats.triangles
                );
            }
            ParseEvent::Error(message) => {
                log::error!("Extraction aborted: {}", message);
                self.error = Some(message);
                self.closed = true;
            }
        }
    }
}
