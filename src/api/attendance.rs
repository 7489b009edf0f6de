use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::ledger::{AttendanceFilter, AttendanceLedger, AttendanceStats};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceCreate {
    #[schema(example = "EMP001")]
    pub employee_id: String,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[serde(default = "default_status")]
    pub status: AttendanceStatus,
}

fn default_status() -> AttendanceStatus {
    AttendanceStatus::Present
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    pub employee_id: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Employee identifiers are case-insensitive at the boundary and stored
/// uppercase.
pub fn normalize_employee_id(raw: &str) -> Result<String, ApiError> {
    let normalized = raw.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(ApiError::Validation("Employee ID is required".to_string()));
    }
    Ok(normalized)
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/attendance/",
    params(
        ("employeeId" = Option<String>, Query, description = "Filter by employee ID"),
        ("date" = Option<String>, Query, description = "Filter by calendar date (ISO)")
    ),
    responses(
        (status = 200, description = "Attendance records, newest first", body = [AttendanceRecord]),
        (status = 503, description = "Database not connected")
    ),
    tag = "Attendance"
)]
pub async fn get_all_attendance(
    ledger: web::Data<AttendanceLedger>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = match &query.employee_id {
        Some(raw) => Some(normalize_employee_id(raw)?),
        None => None,
    };

    let records = ledger
        .list(&AttendanceFilter {
            employee_id,
            date: query.date,
        })
        .await?;

    Ok(HttpResponse::Ok().json(records))
}

/// List attendance records for one employee
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{employeeId}",
    params(
        ("employeeId" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Attendance records, newest first", body = [AttendanceRecord]),
        (status = 503, description = "Database not connected")
    ),
    tag = "Attendance"
)]
pub async fn get_employee_attendance(
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = normalize_employee_id(&path.into_inner())?;

    let records = ledger
        .list(&AttendanceFilter {
            employee_id: Some(employee_id),
            date: None,
        })
        .await?;

    Ok(HttpResponse::Ok().json(records))
}

/// Mark attendance for a day (idempotent upsert)
#[utoipa::path(
    post,
    path = "/api/attendance/",
    request_body = AttendanceCreate,
    responses(
        (status = 201, description = "Resulting attendance record", body = AttendanceRecord),
        (status = 400, description = "Malformed employee ID, date or status"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Unresolvable attendance conflict"),
        (status = 503, description = "Database not connected")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    ledger: web::Data<AttendanceLedger>,
    payload: web::Json<AttendanceCreate>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = normalize_employee_id(&payload.employee_id)?;

    let record = ledger.mark(&employee_id, payload.date, payload.status).await?;

    Ok(HttpResponse::Created().json(record))
}

/// All-time attendance stats for one employee
#[utoipa::path(
    get,
    path = "/api/attendance/stats/{employeeId}",
    params(
        ("employeeId" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Attendance counts", body = AttendanceStats),
        (status = 503, description = "Database not connected")
    ),
    tag = "Attendance"
)]
pub async fn attendance_stats(
    ledger: web::Data<AttendanceLedger>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = normalize_employee_id(&path.into_inner())?;

    let stats = ledger.stats(&employee_id).await?;

    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employee_ids_are_trimmed_and_uppercased() {
        assert_eq!(normalize_employee_id("  emp001 ").unwrap(), "EMP001");
        assert!(matches!(
            normalize_employee_id("   "),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn status_defaults_to_present() {
        let body: AttendanceCreate =
            serde_json::from_str(r#"{"employeeId": "emp001", "date": "2024-01-01"}"#).unwrap();
        assert_eq!(body.status, AttendanceStatus::Present);
        assert_eq!(body.date, chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn unknown_status_is_rejected_at_the_boundary() {
        let result = serde_json::from_str::<AttendanceCreate>(
            r#"{"employeeId": "EMP001", "date": "2024-01-01", "status": "Late"}"#,
        );
        assert!(result.is_err());
    }
}
