use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// Canonical attendance record, as served to clients. Always carries the
/// current field names no matter which schema variant the stored row used.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": 1,
        "employeeId": "EMP001",
        "date": "2024-01-01",
        "status": "Present",
        "createdAt": "2024-01-01T09:00:00",
        "updatedAt": "2024-01-01T09:00:00"
    })
)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP001")]
    pub employee_id: String,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    pub status: AttendanceStatus,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,

    #[schema(value_type = String, format = "date-time")]
    pub updated_at: NaiveDateTime,
}

/// Stored shape of an attendance row. `employee_id` is the current key
/// column, `emp_id` the legacy one; either may be NULL in old data.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: Option<String>,
    pub emp_id: Option<String>,
    pub date: NaiveDate,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AttendanceRow {
    /// The one translation point between the two stored schema variants and
    /// the canonical record. Rows with no resolvable employee identifier
    /// under either column, or an unknown status string, are skipped.
    pub fn into_record(self) -> Option<AttendanceRecord> {
        let employee_id = match self.employee_id.or(self.emp_id) {
            Some(id) => id,
            None => {
                tracing::warn!(row_id = self.id, "Skipping attendance row without employee id");
                return None;
            }
        };

        let status: AttendanceStatus = match self.status.parse() {
            Ok(s) => s,
            Err(_) => {
                tracing::warn!(row_id = self.id, status = %self.status, "Skipping attendance row with unknown status");
                return None;
            }
        };

        Some(AttendanceRecord {
            id: self.id,
            employee_id,
            date: self.date,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(employee_id: Option<&str>, emp_id: Option<&str>, status: &str) -> AttendanceRow {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        AttendanceRow {
            id: 7,
            employee_id: employee_id.map(String::from),
            emp_id: emp_id.map(String::from),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: status.to_string(),
            created_at: midnight,
            updated_at: midnight,
        }
    }

    #[test]
    fn current_key_column_wins() {
        let record = row(Some("EMP001"), Some("OLD001"), "Present")
            .into_record()
            .unwrap();
        assert_eq!(record.employee_id, "EMP001");
        assert_eq!(record.status, AttendanceStatus::Present);
    }

    #[test]
    fn legacy_only_rows_resolve_through_the_old_column() {
        let record = row(None, Some("EMP002"), "Absent").into_record().unwrap();
        assert_eq!(record.employee_id, "EMP002");
        assert_eq!(record.status, AttendanceStatus::Absent);
    }

    #[test]
    fn rows_without_any_employee_id_are_skipped() {
        assert!(row(None, None, "Present").into_record().is_none());
    }

    #[test]
    fn rows_with_unknown_status_are_skipped() {
        assert!(row(Some("EMP001"), None, "OnLeave").into_record().is_none());
    }

    #[test]
    fn status_round_trips_through_its_string_form() {
        assert_eq!(AttendanceStatus::Present.to_string(), "Present");
        assert_eq!(
            "Absent".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::Absent
        );
        assert!("present".parse::<AttendanceStatus>().is_err());
    }
}
