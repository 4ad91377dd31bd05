use sqlx::{FromRow, PgPool};
use tracing::warn;

use super::model::{closed_area, open_area, parse_capacity, FacilityArea, ProgressMarks};

#[derive(Debug, Clone, FromRow)]
struct UsageRow {
    location: String,
    capacity: String,
    last_updated: String,
}

impl UsageRow {
    /// Snapshots keep only the capacity text, so the percentage stands in
    /// for the progress bar value.
    fn into_area(self) -> Option<FacilityArea> {
        if self.capacity.to_lowercase().contains("closed") {
            return Some(closed_area(self.location, self.last_updated));
        }
        let marks = ProgressMarks {
            value: parse_capacity(&self.capacity).map(|(_, _, percent)| percent),
            ..ProgressMarks::default()
        };
        let capacity = self.capacity;
        let area = open_area(self.location, &capacity, self.last_updated, marks);
        if area.is_none() {
            warn!(%capacity, "skipping snapshot row with unreadable capacity");
        }
        area
    }
}

pub async fn snapshot_areas(db: &PgPool) -> sqlx::Result<Vec<FacilityArea>> {
    let rows = sqlx::query_as::<_, UsageRow>(
        r#"SELECT location, capacity, last_updated
           FROM facility_usage
           ORDER BY location"#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().filter_map(UsageRow::into_area).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::congestion::model::CongestionLevel;

    fn row(capacity: &str) -> UsageRow {
        UsageRow {
            location: "Upper Gym".into(),
            capacity: capacity.into(),
            last_updated: "10:15 AM".into(),
        }
    }

    #[test]
    fn snapshot_rows_classify_by_percentage() {
        let area = row("Capacity: 41/50 // 82%").into_area().unwrap();
        assert_eq!(area.congestion_level, CongestionLevel::High);
        assert_eq!(area.current_occupancy, 41);

        let area = row("Capacity: 10/50 // 20%").into_area().unwrap();
        assert_eq!(area.congestion_level, CongestionLevel::Low);
    }

    #[test]
    fn closed_and_unreadable_rows() {
        assert!(row("Closed").into_area().unwrap().is_closed);
        assert!(row("n/a").into_area().is_none());
    }
}
