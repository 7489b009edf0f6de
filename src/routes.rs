use crate::{
    api::{attendance, employee, health},
    auth::handlers,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = build_limiter(config.rate_login_per_min);
    let signup_limiter = build_limiter(config.rate_signup_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .service(web::resource("/health").route(web::get().to(health::health_check)))
            .service(
                web::scope("/auth")
                    .service(
                        web::resource("/signup")
                            .wrap(signup_limiter)
                            .route(web::post().to(handlers::signup)),
                    )
                    .service(
                        web::resource("/login")
                            .wrap(login_limiter)
                            .route(web::post().to(handlers::login)),
                    )
                    .service(web::resource("/me").route(web::get().to(handlers::me))),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::get().to(attendance::get_all_attendance))
                            .route(web::post().to(attendance::mark_attendance)),
                    )
                    // /attendance/employee/{employeeId}
                    .service(
                        web::resource("/employee/{employee_id}")
                            .route(web::get().to(attendance::get_employee_attendance)),
                    )
                    // /attendance/stats/{employeeId}
                    .service(
                        web::resource("/stats/{employee_id}")
                            .route(web::get().to(attendance::attendance_stats)),
                    ),
            ),
    );
}
