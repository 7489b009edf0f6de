use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

use crate::api::attendance::normalize_employee_id;
use crate::db::is_unique_violation;
use crate::error::ApiError;
use crate::model::employee::Employee;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[schema(example = "EMP001")]
    pub employee_id: String,
    #[schema(example = "John Doe")]
    pub full_name: String,
    #[schema(example = "john.doe@example.com", format = "email")]
    pub email: String,
    #[schema(example = "Engineering")]
    pub department: String,
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// List all employees
#[utoipa::path(
    get,
    path = "/api/employees/",
    responses(
        (status = 200, description = "All employees, newest first", body = [Employee]),
        (status = 503, description = "Database not connected")
    ),
    tag = "Employee"
)]
pub async fn list_employees(pool: web::Data<MySqlPool>) -> Result<HttpResponse, ApiError> {
    let employees = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, employee_id, full_name, email, department, created_at, updated_at
        FROM employees
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(employees))
}

/// Get a single employee
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(
        ("id" = u64, Path, description = "Employee record ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 503, description = "Database not connected")
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, employee_id, full_name, email, department, created_at, updated_at
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await?;

    match employee {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(ApiError::NotFound("Employee not found".to_string())),
    }
}

/// Create an employee
#[utoipa::path(
    post,
    path = "/api/employees/",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "Employee ID or email already exists"),
        (status = 503, description = "Database not connected")
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, ApiError> {
    let employee_id = normalize_employee_id(&payload.employee_id)?;
    let full_name = required(&payload.full_name, "Full Name")?;
    let email = required(&payload.email, "Email")?.to_lowercase();
    let department = required(&payload.department, "Department")?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees (employee_id, full_name, email, department)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&employee_id)
    .bind(&full_name)
    .bind(&email)
    .bind(&department)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict(
                "Employee ID or email already exists".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, employee_id, full_name, email, department, created_at, updated_at
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(result.last_insert_id())
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(employee))
}

/// Delete an employee
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(
        ("id" = u64, Path, description = "Employee record ID")
    ),
    responses(
        (status = 200, description = "Employee deleted"),
        (status = 404, description = "Employee not found"),
        (status = 503, description = "Database not connected")
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        SELECT id, employee_id, full_name, email, department, created_at, updated_at
        FROM employees
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(employee) = employee else {
        return Err(ApiError::NotFound("Employee not found".to_string()));
    };

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await;

    if let Err(e) = &result {
        error!(error = %e, id, "Failed to delete employee");
    }
    result?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
        "employee": employee
    })))
}
