use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::citygml::extractor::NumericPolicy;

pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;
pub const DEFAULT_ROTATE_SENSITIVITY: f32 = 500.0;
pub const DEFAULT_DOLLY_PERCENTAGE: f32 = 0.001;
pub const DEFAULT_FOV_DEGREES: f32 = 90.0;
pub const DEFAULT_NEAR_PLANE: f32 = 1.0;

/// How to treat coordinate tokens that are not numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum NumericPolicyArg {
    /// Keep the point, NaN component.
    Nan,
    /// Replace the component with 0.
    Zero,
    /// Drop the point.
    Skip,
}

impl std::fmt::Display for NumericPolicyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NumericPolicyArg::Nan => "nan",
            NumericPolicyArg::Zero => "zero",
            NumericPolicyArg::Skip => "skip",
        };

        f.write_str(s)
    }
}

impl From<NumericPolicyArg> for NumericPolicy {
    fn from(arg: NumericPolicyArg) -> Self {
        match arg {
            NumericPolicyArg::Nan => NumericPolicy::PropagateNan,
            NumericPolicyArg::Zero => NumericPolicy::Zero,
            NumericPolicyArg::Skip => NumericPolicy::SkipPoint,
        }
    }
}

/// `citygml3d` - streaming CityGML viewer.
///
/// Reads a CityGML document in fixed-size chunks, tessellates every polygon
/// it finds and shows the result in an orbit/pan/zoom 3D view.
#[derive(Parser, Debug, Clone)]
#[command(name = "citygml3d", version, about, long_about = None)]
pub struct Args {
    /// CityGML document to load.
    pub path: PathBuf,

    /// Bytes read from the document per chunk.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    #[arg(long, value_enum, default_value_t = NumericPolicyArg::Nan)]
    pub numeric_policy: NumericPolicyArg,

    /// Load the document, print a summary and exit without opening a window.
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    #[arg(long, default_value_t = false)]
    pub vsync: bool,

    /// Pixels of mouse motion per radian of orbit.
    #[arg(long, default_value_t = DEFAULT_ROTATE_SENSITIVITY)]
    pub rotate_sensitivity: f32,

    /// Fraction of the camera distance moved per wheel unit.
    #[arg(long, default_value_t = DEFAULT_DOLLY_PERCENTAGE)]
    pub dolly_percentage: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub chunk_size: usize,
    pub numeric_policy: NumericPolicy,
    pub vsync: bool,
    pub rotate_sensitivity: f32,
    pub dolly_percentage: f32,
    pub fov_degrees: f32,
    pub near_plane: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            numeric_policy: NumericPolicy::default(),
            vsync: false,
            rotate_sensitivity: DEFAULT_ROTATE_SENSITIVITY,
            dolly_percentage: DEFAULT_DOLLY_PERCENTAGE,
            fov_degrees: DEFAULT_FOV_DEGREES,
            near_plane: DEFAULT_NEAR_PLANE,
        }
    }
}

impl From<&Args> for ViewerConfig {
    fn from(args: &Args) -> Self {
        Self {
            chunk_size: args.chunk_size.max(1),
            numeric_policy: args.numeric_policy.into(),
            vsync: args.vsync,
            rotate_sensitivity: if args.rotate_sensitivity > 0.0 {
                args.rotate_sensitivity
            } else {
                DEFAULT_ROTATE_SENSITIVITY
            },
            dolly_percentage: args.dolly_percentage,
            ..Self::default()
        }
    }
}
