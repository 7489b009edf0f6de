use crate::error::ApiError;
use crate::model::employee::Employee;
use sqlx::MySqlPool;

/// Lookup collaborator used to gate attendance marking.
#[derive(Clone)]
pub struct EmployeeDirectory {
    pool: MySqlPool,
}

impl EmployeeDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// `employee_id` must already be normalized (trimmed, uppercased).
    pub async fn find_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Employee>, ApiError> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, employee_id, full_name, email, department, created_at, updated_at
            FROM employees
            WHERE employee_id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee)
    }
}
