use crate::{
    api::{admin, attendance, balance, comp_off, leave_request, reimbursement},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit of {requests_per_min} per minute"))?;
    Ok(Governor::new(&cfg))
}

#[derive(Clone)]
pub struct Limiters {
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::put().to(leave_request::update_leave))
                            .route(web::delete().to(leave_request::delete_leave)),
                    )
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/reimbursement")
                    .service(
                        web::resource("")
                            .route(web::post().to(reimbursement::create_reimbursement)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(reimbursement::get_reimbursement)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(reimbursement::approve_reimbursement)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(reimbursement::reject_reimbursement)),
                    ),
            )
            .service(
                web::scope("/balance")
                    .service(web::resource("").route(web::get().to(balance::my_balance)))
                    .service(web::resource("/{user_id}").route(web::get().to(balance::user_balance))),
            )
            .service(
                web::scope("/comp-off")
                    .service(
                        web::resource("")
                            .route(web::get().to(comp_off::list_comp_off))
                            .route(web::post().to(comp_off::grant_comp_off)),
                    )
                    .service(web::resource("/{id}").route(web::delete().to(comp_off::delete_comp_off))),
            )
            .service(
                web::scope("/attendance/corrections")
                    .service(
                        web::resource("").route(web::post().to(attendance::request_correction)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(attendance::approve_correction)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(attendance::reject_correction)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/absence-sweep")
                            .route(web::post().to(admin::run_absence_sweep)),
                    )
                    .service(
                        web::resource("/comp-off-detection")
                            .route(web::post().to(admin::run_comp_off_detection)),
                    )
                    .service(
                        web::resource("/recompute/{kind}/{id}")
                            .route(web::post().to(admin::recompute)),
                    )
                    .service(
                        web::resource("/directory/{department_id}")
                            .route(web::delete().to(admin::invalidate_department)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_zero_and_high_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1000).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
