// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Analysis Engine
//!
//! Pure, deterministic transformations from raw activity records into
//! per-activity analysis and aggregate training-load summaries. No
//! I/O, no shared state: everything here is recomputed per request.
//!
//! Heart-rate effort bands are the fixed three-band default: below 120
//! BPM is Low, 120 to 149 is Medium, 150 and above is High. Bands are
//! inclusive on the lower bound and exclusive on the upper bound, so
//! every non-negative heart rate maps to exactly one band. Per-athlete
//! custom zones are a separate upstream data source and out of scope.

use crate::errors::{Result, StravaError};
use crate::models::Activity;
use serde::{Deserialize, Serialize};

/// Qualitative effort classification derived from average heart rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
    /// No heart-rate data recorded for the activity
    Unknown,
}

impl EffortLevel {
    fn from_heart_rate(heart_rate: Option<f64>) -> Self {
        match heart_rate {
            None => EffortLevel::Unknown,
            Some(hr) if hr < 120.0 => EffortLevel::Low,
            Some(hr) if hr < 150.0 => EffortLevel::Medium,
            Some(_) => EffortLevel::High,
        }
    }
}

/// Derived per-activity analysis, recomputed on every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityAnalysis {
    pub activity_type: String,
    pub distance_meters: f64,
    pub moving_time_seconds: u64,
    /// Pace in minutes per kilometer; `None` when the distance is zero
    pub pace_min_per_km: Option<f64>,
    pub effort: EffortLevel,
}

/// Count of activities per heart-rate band
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateZones {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

/// Aggregate volume and intensity across a set of activities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingLoadSummary {
    pub activities_count: usize,
    pub total_distance_km: f64,
    pub total_time_hours: f64,
    /// Activities without heart-rate data contribute to count, distance
    /// and time but to no zone bucket
    pub heart_rate_zones: HeartRateZones,
}

/// Required analysis inputs, checked before any arithmetic
fn validated_distance(activity: &Activity) -> Result<f64> {
    match activity.distance_meters {
        None => Err(StravaError::Validation(format!(
            "activity {} has no distance_meters",
            activity.id
        ))),
        Some(d) if d < 0.0 => Err(StravaError::Validation(format!(
            "activity {} has negative distance {d}",
            activity.id
        ))),
        Some(d) => Ok(d),
    }
}

/// Analyze a single activity
///
/// Pace is `(moving_time / 60) / (distance / 1000)` minutes per
/// kilometer. A zero distance yields an unknown pace rather than a
/// division by zero; a missing or negative distance is rejected.
pub fn analyze_activity(activity: &Activity) -> Result<ActivityAnalysis> {
    let distance = validated_distance(activity)?;

    let pace_min_per_km = if distance > 0.0 {
        Some((activity.moving_time_seconds as f64 / 60.0) / (distance / 1000.0))
    } else {
        None
    };

    Ok(ActivityAnalysis {
        activity_type: activity.activity_type.clone(),
        distance_meters: distance,
        moving_time_seconds: activity.moving_time_seconds,
        pace_min_per_km,
        effort: EffortLevel::from_heart_rate(activity.average_heartrate),
    })
}

/// Aggregate a sequence of activities into a training-load summary
///
/// An empty input produces an all-zero summary.
pub fn analyze_training_load(activities: &[Activity]) -> Result<TrainingLoadSummary> {
    let mut total_distance_meters = 0.0;
    let mut total_time_seconds: u64 = 0;
    let mut zones = HeartRateZones::default();

    for activity in activities {
        total_distance_meters += validated_distance(activity)?;
        total_time_seconds += activity.moving_time_seconds;

        match EffortLevel::from_heart_rate(activity.average_heartrate) {
            EffortLevel::Low => zones.easy += 1,
            EffortLevel::Medium => zones.medium += 1,
            EffortLevel::High => zones.hard += 1,
            EffortLevel::Unknown => {}
        }
    }

    Ok(TrainingLoadSummary {
        activities_count: activities.len(),
        total_distance_km: total_distance_meters / 1000.0,
        total_time_hours: total_time_seconds as f64 / 3600.0,
        heart_rate_zones: zones,
    })
}

/// Map load patterns to textual training guidance
///
/// A small deterministic rule table over the summary: intensity skew,
/// weekly volume and recovery pressure each contribute a message, with
/// a balanced-training fallback when nothing triggers.
pub fn get_activity_recommendations(summary: &TrainingLoadSummary) -> Vec<String> {
    let mut recommendations = Vec::new();

    let zones = &summary.heart_rate_zones;
    let zone_total = zones.easy + zones.medium + zones.hard;

    if zone_total > 0 {
        let easy_percent = f64::from(zones.easy) / f64::from(zone_total) * 100.0;
        let medium_percent = f64::from(zones.medium) / f64::from(zone_total) * 100.0;

        if easy_percent < 70.0 {
            recommendations.push(format!(
                "Only {easy_percent:.0}% of sessions are easy. Add recovery workouts \
                 and more base training in low heart-rate zones."
            ));
        }

        if medium_percent > 40.0 {
            recommendations.push(format!(
                "{medium_percent:.0}% of sessions sit in the middle zone. Separate easy \
                 and hard days clearly and avoid the grey zone."
            ));
        }
    }

    if summary.total_time_hours < 5.0 {
        recommendations.push(format!(
            "Weekly volume is {:.1} hours. Add around 30 minutes per week and mix in \
             cross-training while monitoring how you feel.",
            summary.total_time_hours
        ));
    }

    if zone_total > 5 {
        recommendations.push(
            "High session count: prioritize 7-8 hours of sleep, plan easy days after \
             intense sessions, and keep up nutrition and hydration."
                .to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push(
            "Training is well balanced. Keep the current plan, log your workouts, and \
             review progress regularly."
                .to_string(),
        );
    }

    recommendations
}
