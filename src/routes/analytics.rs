use std::collections::BTreeMap;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::NaiveDateTime;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use super::internal;
use crate::{
    auth::{backend::AuthSession, role_gate::current},
    entities::{
        enrollment, event,
        sea_orm_active_enums::{EnrollmentStatus, Role},
    },
    router::AppState,
};

/// One bar or slice of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub enrollments_by_status: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollments_per_event: Option<Vec<ChartPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_per_month: Option<Vec<ChartPoint>>,
}

/// Counts per status, always in the order pending, approved, rejected.
pub fn status_breakdown(statuses: impl IntoIterator<Item = EnrollmentStatus>) -> Vec<ChartPoint> {
    let mut counts = [0u64; 3];
    for status in statuses {
        let slot = match status {
            EnrollmentStatus::Pending => 0,
            EnrollmentStatus::Approved => 1,
            EnrollmentStatus::Rejected => 2,
        };
        counts[slot] += 1;
    }
    [
        EnrollmentStatus::Pending,
        EnrollmentStatus::Approved,
        EnrollmentStatus::Rejected,
    ]
    .into_iter()
    .zip(counts)
    .map(|(status, value)| ChartPoint {
        label: status.label().to_string(),
        value,
    })
    .collect()
}

pub fn enrollments_per_event(rows: &[(event::Model, Vec<enrollment::Model>)]) -> Vec<ChartPoint> {
    rows.iter()
        .map(|(event, enrollments)| ChartPoint {
            label: event.name.clone(),
            value: enrollments.len() as u64,
        })
        .collect()
}

/// Events bucketed by `YYYY-MM`, oldest month first.
pub fn events_per_month(starts: impl IntoIterator<Item = NaiveDateTime>) -> Vec<ChartPoint> {
    let mut months: BTreeMap<String, u64> = BTreeMap::new();
    for starts_at in starts {
        *months.entry(starts_at.format("%Y-%m").to_string()).or_default() += 1;
    }
    months
        .into_iter()
        .map(|(label, value)| ChartPoint { label, value })
        .collect()
}

pub async fn analytics(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> Result<impl IntoResponse, StatusCode> {
    let principal = current(&auth_session)?;
    let analytics = match principal.role {
        Role::Organization => {
            let rows = event::Entity::find()
                .filter(event::Column::OrganizationId.eq(principal.id))
                .order_by_asc(event::Column::StartsAt)
                .find_with_related(enrollment::Entity)
                .all(&state.db)
                .await
                .map_err(internal)?;
            Analytics {
                enrollments_by_status: status_breakdown(
                    rows.iter()
                        .flat_map(|(_, enrollments)| enrollments.iter().map(|e| e.status)),
                ),
                enrollments_per_event: Some(enrollments_per_event(&rows)),
                events_per_month: Some(events_per_month(rows.iter().map(|(e, _)| e.starts_at))),
            }
        }
        Role::User => {
            let enrollments = enrollment::Entity::find()
                .filter(enrollment::Column::UserId.eq(principal.id))
                .all(&state.db)
                .await
                .map_err(internal)?;
            Analytics {
                enrollments_by_status: status_breakdown(enrollments.iter().map(|e| e.status)),
                enrollments_per_event: None,
                events_per_month: None,
            }
        }
        Role::Admin => return Err(StatusCode::FORBIDDEN),
    };
    Ok(Json(analytics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn event_named(name: &str) -> event::Model {
        event::Model {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            image_url: None,
            starts_at: at(2025, 3, 1),
            address: None,
            latitude: None,
            longitude: None,
        }
    }

    fn point(label: &str, value: u64) -> ChartPoint {
        ChartPoint {
            label: label.to_string(),
            value,
        }
    }

    fn enrollment_with(status: EnrollmentStatus) -> enrollment::Model {
        enrollment::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            status,
            job_details: None,
            created_at: at(2025, 2, 1),
        }
    }

    #[test]
    fn status_breakdown_lists_every_status_in_order() {
        let points = status_breakdown([
            EnrollmentStatus::Approved,
            EnrollmentStatus::Pending,
            EnrollmentStatus::Approved,
        ]);
        let pairs: Vec<_> = points.iter().map(|p| (p.label.as_str(), p.value)).collect();
        assert_eq!(pairs, vec![("pending", 1), ("approved", 2), ("rejected", 0)]);
    }

    #[test]
    fn enrollments_per_event_counts_each_event() {
        let rows = vec![
            (
                event_named("Harbor cleanup"),
                vec![
                    enrollment_with(EnrollmentStatus::Pending),
                    enrollment_with(EnrollmentStatus::Rejected),
                ],
            ),
            (event_named("Food drive"), vec![]),
        ];
        assert_eq!(
            enrollments_per_event(&rows),
            vec![point("Harbor cleanup", 2), point("Food drive", 0)]
        );
    }

    #[test]
    fn events_per_month_buckets_chronologically() {
        let points = events_per_month([at(2025, 4, 2), at(2024, 12, 31), at(2025, 4, 20)]);
        assert_eq!(points, vec![point("2024-12", 1), point("2025-04", 2)]);
    }
}
