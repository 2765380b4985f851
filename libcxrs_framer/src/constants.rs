// Shared time base of every shot, seconds
pub const DEFAULT_MIN_TIME: f64 = -0.1;
pub const DEFAULT_MAX_TIME: f64 = 2.0;
pub const DEFAULT_DT: f64 = 0.005;
/// Slack removed from (max - min) / dt before rounding up, so that a span which is an
/// exact multiple of dt up to representation error does not gain an extra point
pub const TIME_BASE_EPSILON: f64 = 1e-9;

pub const DEFAULT_NUM_SAMPLES: usize = 10;
pub const DEFAULT_SEED: u64 = 42;

pub const TIME_AXIS: &str = "time";
pub const RADIUS_AXIS: &str = "major_radius";
pub const WAVELENGTH_AXIS: &str = "wavelength";
pub const SHOT_AXIS: &str = "shot_id";

pub const VALUE_SUFFIX: &str = "value";
pub const ERROR_SUFFIX: &str = "error";

pub const WAVELENGTH_SIGNAL: &str = "/act/cel3/ss/wavelength";

pub const PROFILE_SIGNALS: [(&str, &str); 4] = [
    ("fit_ratio", "ACT/CEL3/SS/PVB/FIT_RATIO"),
    ("emissivity", "ACT/CEL3/SS/PVB/C5291/EMISSIVITY"),
    ("velocity", "ACT/CEL3/SS/PVB/C5291/VELOCITY"),
    ("temperature", "ACT/CEL3/SS/PVB/C5291/TEMPERATURE"),
];

pub const VOLUME_SIGNALS: [(&str, &str); 5] = [
    ("ss_fits", "ACT/CEL3/SS/PVB/SS_FITS"),
    ("ss_counts", "ACT/CEL3/SS/COUNTS"),
    ("ss_bg_counts", "ACT/CEL3/SS/PVB/SCALED_BG_COUNTS"),
    ("ss_sub_fits", "ACT/CEL3/SS/PVB/SUB_FITS"),
    ("ss_sub_counts", "ACT/CEL3/SS/PVB/SUB_COUNTS"),
];

pub const STORE_DIR_NAME: &str = "shots.cxrs";
pub const STORE_SCHEMA_NAME: &str = "schema.yml";
pub const STORE_DATA_NAME: &str = "data.h5";
/// Chunk length of the resizable shot_id coordinate
pub const SHOT_CHUNK: usize = 64;
/// This is the version of the store format
pub const FORMAT_VERSION: &str = "1.0";
