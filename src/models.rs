// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Wire-level data structures for activity records as returned by the
//! Strava API. Activities are treated as immutable input: the gateway
//! deserializes them and the analysis engine consumes them without
//! mutation.
//!
//! Field names follow the vocabulary used throughout the crate
//! (`distance_meters`, `moving_time_seconds`) while serde renames map
//! them onto Strava's JSON shape (`distance`, `moving_time`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single activity record fetched from the Strava API
///
/// `distance_meters` and `average_heartrate` stay optional at the wire
/// level: some uploads genuinely lack them, and validation of required
/// analysis inputs belongs to the analysis engine, which rejects
/// structurally invalid records instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Provider-assigned activity identifier
    pub id: u64,
    /// Human-readable title, if set by the athlete
    #[serde(default)]
    pub name: Option<String>,
    /// Sport type as reported by Strava ("Run", "Ride", ...)
    #[serde(rename = "type")]
    pub activity_type: String,
    /// Total distance in meters
    #[serde(rename = "distance")]
    pub distance_meters: Option<f64>,
    /// Moving time in seconds
    #[serde(rename = "moving_time")]
    pub moving_time_seconds: u64,
    /// Average heart rate in BPM, absent without a HR monitor
    #[serde(default)]
    pub average_heartrate: Option<f64>,
    /// When the activity started (UTC)
    pub start_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activity_from_strava_json() {
        let payload = json!({
            "id": 1001,
            "name": "Morning Run",
            "type": "Run",
            "start_date": "2024-01-15T08:00:00Z",
            "moving_time": 1800,
            "elapsed_time": 1900,
            "distance": 5000.0,
            "average_heartrate": 150.0,
            "max_heartrate": 175.0
        });

        let activity: Activity = serde_json::from_value(payload).unwrap();
        assert_eq!(activity.id, 1001);
        assert_eq!(activity.activity_type, "Run");
        assert_eq!(activity.distance_meters, Some(5000.0));
        assert_eq!(activity.moving_time_seconds, 1800);
        assert_eq!(activity.average_heartrate, Some(150.0));
    }

    #[test]
    fn test_activity_without_optional_fields() {
        // Manual uploads can lack distance and heart rate entirely
        let payload = json!({
            "id": 2002,
            "type": "Workout",
            "start_date": "2024-02-01T18:30:00Z",
            "moving_time": 600
        });

        let activity: Activity = serde_json::from_value(payload).unwrap();
        assert_eq!(activity.name, None);
        assert_eq!(activity.distance_meters, None);
        assert_eq!(activity.average_heartrate, None);
    }

    #[test]
    fn test_activity_round_trip() {
        let payload = json!({
            "id": 3003,
            "name": "Evening Ride",
            "type": "Ride",
            "start_date": "2024-03-10T17:00:00Z",
            "moving_time": 3600,
            "distance": 25000.0
        });

        let activity: Activity = serde_json::from_value(payload).unwrap();
        let serialized = serde_json::to_value(&activity).unwrap();
        assert_eq!(serialized["distance"], json!(25000.0));
        assert_eq!(serialized["moving_time"], json!(3600));
        assert_eq!(serialized["type"], json!("Ride"));
    }
}
