//! CityGML tag vocabulary recognised by the extractor.
//!
//! Matching is on the local name, case-insensitive. Anything not listed here
//! is ignored by the state machine.

use crate::citygml::event::local_name;

pub const AMBIENT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Ground,
    Roof,
    Wall,
    Door,
    Window,
    WaterBody,
    Bridge,
    BridgePart,
    PlantCover,
    SolitaryVegetation,
    Road,
    Railway,
    Track,
    Square,
    TrafficArea,
    AuxiliaryTrafficArea,
    TinRelief,
    ReliefFeature,
}

impl SurfaceKind {
    pub fn color(self) -> [f32; 3] {
        match self {
            SurfaceKind::Ground => [0.55, 0.5, 0.45],
            SurfaceKind::Roof => [1.0, 0.0, 0.0],
            SurfaceKind::Wall => [0.9, 0.9, 0.85],
            SurfaceKind::Door => [0.55, 0.35, 0.2],
            SurfaceKind::Window => [0.4, 0.7, 1.0],
            SurfaceKind::WaterBody => [0.1, 0.4, 0.9],
            SurfaceKind::Bridge | SurfaceKind::BridgePart => [0.7, 0.7, 0.6],
            SurfaceKind::PlantCover | SurfaceKind::SolitaryVegetation => [0.2, 0.7, 0.2],
            SurfaceKind::Road
            | SurfaceKind::Railway
            | SurfaceKind::Track
            | SurfaceKind::Square => [0.35, 0.35, 0.4],
            SurfaceKind::TrafficArea => [0.45, 0.45, 0.5],
            SurfaceKind::AuxiliaryTrafficArea => [0.3, 0.6, 0.3],
            SurfaceKind::TinRelief | SurfaceKind::ReliefFeature => [0.6, 0.75, 0.45],
        }
    }
}

/// Structural role of a tag for the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Surface(SurfaceKind),
    /// `exterior` or `interior`: one contour of the current polygon.
    Contour,
    /// `pos` or `posList`: a coordinate run inside a contour.
    Coordinates,
    /// `Polygon`, `Triangle`, `PolygonPatch`: all contours read.
    Polygon,
    /// `Solid`, `MultiSurface`: wrapper whose close resets the state.
    Wrapper,
    Other,
}

impl Tag {
    pub fn classify(name: &str) -> Tag {
        let upper = local_name(name).to_ascii_uppercase();
        match upper.as_str() {
            "EXTERIOR" | "INTERIOR" => Tag::Contour,
            "POS" | "POSLIST" => Tag::Coordinates,
            "POLYGON" | "TRIANGLE" | "POLYGONPATCH" => Tag::Polygon,
            "SOLID" | "MULTISURFACE" => Tag::Wrapper,
            "GROUNDSURFACE" => Tag::Surface(SurfaceKind::Ground),
            "ROOFSURFACE" => Tag::Surface(SurfaceKind::Roof),
            "WALLSURFACE" => Tag::Surface(SurfaceKind::Wall),
            "DOOR" => Tag::Surface(SurfaceKind::Door),
            "WINDOW" => Tag::Surface(SurfaceKind::Window),
            "WATERBODY" => Tag::Surface(SurfaceKind::WaterBody),
            "BRIDGE" => Tag::Surface(SurfaceKind::Bridge),
            "BRIDGEPART" => Tag::Surface(SurfaceKind::BridgePart),
            "PLANTCOVER" => Tag::Surface(SurfaceKind::PlantCover),
            "SOLITARYVEGETATIONOBJECT" => Tag::Surface(SurfaceKind::SolitaryVegetation),
            "ROAD" => Tag::Surface(SurfaceKind::Road),
            "RAILWAY" => Tag::Surface(SurfaceKind::Railway),
            "TRACK" => Tag::Surface(SurfaceKind::Track),
            "SQUARE" => Tag::Surface(SurfaceKind::Square),
            "TRAFFICAREA" => Tag::Surface(SurfaceKind::TrafficArea),
            "AUXILIARYTRAFFICAREA" => Tag::Surface(SurfaceKind::AuxiliaryTrafficArea),
            "TINRELIEF" => Tag::Surface(SurfaceKind::TinRelief),
            "RELIEFFEATURE" => Tag::Surface(SurfaceKind::ReliefFeature),
            _ => Tag::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_strips_prefix_and_case() {
        assert_eq!(Tag::classify("bldg:RoofSurface"), Tag::Surface(SurfaceKind::Roof));
        assert_eq!(Tag::classify("ROOFSURFACE"), Tag::Surface(SurfaceKind::Roof));
        assert_eq!(Tag::classify("gml:exterior"), Tag::Contour);
        assert_eq!(Tag::classify("gml:Interior"), Tag::Contour);
        assert_eq!(Tag::classify("gml:posList"), Tag::Coordinates);
        assert_eq!(Tag::classify("gml:Triangle"), Tag::Polygon);
        assert_eq!(Tag::classify("gml:MultiSurface"), Tag::Wrapper);
        assert_eq!(Tag::classify("bldg:lod2MultiSurface"), Tag::Other);
        assert_eq!(Tag::classify("core:cityObjectMember"), Tag::Other);
    }

    #[test]
    fn test_roof_color() {
        assert_eq!(SurfaceKind::Roof.color(), [1.0, 0.0, 0.0]);
    }
}
