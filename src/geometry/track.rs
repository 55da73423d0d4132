/// Track geometry store: the physical rail polylines the geometry mapper
/// draws from. The dataset is prepared offline and loaded once; retention is
/// decided by an ordered list of named filter rules so the exclusion policy
/// is data, not scattered conditionals.
use crate::config::BoundingBox;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub electrified: Option<bool>,
    /// OSM-style usage tag: main, branch, industrial, military, test...
    #[serde(default)]
    pub usage: Option<String>,
    /// OSM-style service tag: yard, siding, spur, crossover.
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub tunnel: bool,
    #[serde(default)]
    pub bridge: bool,
    /// Track gauge in millimeters.
    #[serde(default)]
    pub gauge: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPolyline {
    pub id: i64,
    /// [lon, lat] points in track order.
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub attributes: TrackAttributes,
}

impl TrackPolyline {
    pub fn name(&self) -> Option<&str> {
        self.attributes.name.as_deref()
    }
}

/// Track features excluded from geometry mapping, by id or by name. Fed by
/// the startup config and grown interactively through the debug interface
/// when a polyline turns out to be a bad match.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    pub ids: HashSet<i64>,
    pub names: HashSet<String>,
}

impl ExclusionSet {
    pub fn from_lists(ids: &[i64], names: &[String]) -> Self {
        Self {
            ids: ids.iter().copied().collect(),
            names: names.iter().cloned().collect(),
        }
    }

    pub fn excludes(&self, polyline: &TrackPolyline) -> bool {
        if self.ids.contains(&polyline.id) {
            return true;
        }
        polyline.name().is_some_and(|n| self.names.contains(n))
    }

    pub fn len(&self) -> usize {
        self.ids.len() + self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.names.is_empty()
    }
}

pub struct FilterContext<'a> {
    pub exclusions: &'a ExclusionSet,
    pub bounding_box: Option<BoundingBox>,
}

/// A named retention predicate. Returns true when the polyline passes.
pub struct FilterRule {
    pub name: &'static str,
    pub check: fn(&TrackPolyline, &FilterContext) -> bool,
}

const NON_PASSENGER_USAGE: [&str; 3] = ["industrial", "military", "test"];
const SERVICE_TRACK_TAGS: [&str; 4] = ["yard", "siding", "spur", "crossover"];
const STANDARD_GAUGE_MM: u32 = 1435;

/// Retention rules, applied in order; the first failing rule is the one
/// reported for a dropped polyline.
pub const RETENTION_RULES: &[FilterRule] = &[
    FilterRule {
        name: "excluded-id",
        check: |p, ctx| !ctx.exclusions.ids.contains(&p.id),
    },
    FilterRule {
        name: "excluded-name",
        check: |p, ctx| !p.name().is_some_and(|n| ctx.exclusions.names.contains(n)),
    },
    FilterRule {
        name: "too-few-points",
        check: |p, _| p.coordinates.len() >= 2,
    },
    FilterRule {
        name: "non-passenger-usage",
        check: |p, _| {
            !p.attributes
                .usage
                .as_deref()
                .is_some_and(|u| NON_PASSENGER_USAGE.contains(&u))
        },
    },
    FilterRule {
        name: "service-track",
        check: |p, _| {
            !p.attributes
                .service
                .as_deref()
                .is_some_and(|s| SERVICE_TRACK_TAGS.contains(&s))
        },
    },
    FilterRule {
        name: "wrong-gauge",
        check: |p, _| p.attributes.gauge.is_none_or(|g| g == STANDARD_GAUGE_MM),
    },
    FilterRule {
        name: "outside-bounding-box",
        check: |p, ctx| match ctx.bounding_box {
            Some(bbox) => p.coordinates.iter().any(|&c| bbox.contains(c)),
            None => true,
        },
    },
];

#[derive(Debug, Deserialize)]
struct TrackFile {
    features: Vec<TrackPolyline>,
}

#[derive(Debug, Default)]
pub struct TrackStore {
    polylines: Vec<TrackPolyline>,
}

impl TrackStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrackError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TrackError::ReadError(e.to_string()))?;
        let file: TrackFile =
            serde_json::from_str(&content).map_err(|e| TrackError::ParseError(e.to_string()))?;
        info!(polylines = file.features.len(), "Loaded track geometry");
        Ok(Self {
            polylines: file.features,
        })
    }

    /// Empty store for degraded straight-line-only operation.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.polylines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    /// Polylines that pass every retention rule. Drops are counted per rule
    /// and logged once per pass.
    pub fn retained(&self, ctx: &FilterContext) -> Vec<&TrackPolyline> {
        let mut dropped: HashMap<&'static str, usize> = HashMap::new();
        let mut retained = Vec::new();

        'polylines: for polyline in &self.polylines {
            for rule in RETENTION_RULES {
                if !(rule.check)(polyline, ctx) {
                    *dropped.entry(rule.name).or_insert(0) += 1;
                    debug!(
                        polyline_id = polyline.id,
                        name = polyline.name().unwrap_or(""),
                        rule = rule.name,
                        "Dropped track polyline"
                    );
                    continue 'polylines;
                }
            }
            retained.push(polyline);
        }

        info!(
            total = self.polylines.len(),
            retained = retained.len(),
            dropped = ?dropped,
            "Filtered track polylines"
        );
        retained
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Failed to read track geometry file: {0}")]
    ReadError(String),
    #[error("Failed to parse track geometry: {0}")]
    ParseError(String),
}
