use crate::api::attendance::AttendanceCreate;
use crate::api::employee::CreateEmployee;
use crate::auth::handlers::{LoginRequest, SignupRequest, TokenResponse, UserPublic, UserResponse};
use crate::ledger::AttendanceStats;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::employee::Employee;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "HRMS Lite API",
        version = "1.0.0",
        description = r#"
## HRMS Lite Backend

A small HR record-keeping backend: employee records, daily attendance
marking, and username/password authentication.

### 🔹 Key Features
- **Employee Management**
  - Create, list, view and delete employee records
- **Attendance Management**
  - One record per employee per calendar day; marking twice updates in place
- **Authentication**
  - Signup/login with JWT bearer tokens

### 📦 Response Format
- JSON-based RESTful responses

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::health::health_check,

        crate::api::attendance::get_all_attendance,
        crate::api::attendance::get_employee_attendance,
        crate::api::attendance::mark_attendance,
        crate::api::attendance::attendance_stats,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::delete_employee,

        crate::auth::handlers::signup,
        crate::auth::handlers::login,
        crate::auth::handlers::me
    ),
    components(
        schemas(
            AttendanceCreate,
            AttendanceRecord,
            AttendanceStats,
            AttendanceStatus,
            Employee,
            CreateEmployee,
            SignupRequest,
            LoginRequest,
            TokenResponse,
            UserPublic,
            UserResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Attendance", description = "Attendance marking and queries"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Auth", description = "Authentication APIs"),
    )
)]
pub struct ApiDoc;
