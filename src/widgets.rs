use serde::{Deserialize, Serialize};

use crate::tracking::SessionSnapshot;

/// Metric cards the tracking screen can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Time,
    Distance,
    Speed,
    #[strum(to_string = "Heart Rate")]
    HeartRate,
    Calories,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 5] = [
        WidgetKind::Time,
        WidgetKind::Distance,
        WidgetKind::Speed,
        WidgetKind::HeartRate,
        WidgetKind::Calories,
    ];

    pub fn value(&self, snapshot: &SessionSnapshot) -> String {
        match self {
            WidgetKind::Time => snapshot.elapsed_display.clone(),
            WidgetKind::Distance => format!("{:.2}", snapshot.distance_km),
            WidgetKind::Speed => format!("{:.1}", snapshot.speed_kmh),
            WidgetKind::HeartRate => snapshot
                .heart_rate_bpm
                .map_or_else(|| "--".to_string(), |bpm| bpm.to_string()),
            WidgetKind::Calories => snapshot.calories.to_string(),
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            WidgetKind::Time => "",
            WidgetKind::Distance => "km",
            WidgetKind::Speed => "km/h",
            WidgetKind::HeartRate => "bpm (dog)",
            WidgetKind::Calories => "kcal",
        }
    }
}

/// Drops duplicates while keeping the configured order.
pub fn normalize_layout(widgets: &[WidgetKind]) -> Vec<WidgetKind> {
    let mut seen = Vec::with_capacity(widgets.len());
    for w in widgets {
        if !seen.contains(w) {
            seen.push(*w);
        }
    }
    seen
}
