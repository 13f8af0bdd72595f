use crate::{
    api::{approval, attendance, transfer},
    config::Config,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    cfg.service(
        web::scope(&config.api_prefix)
            .service(
                web::scope("/approval")
                    // /approval
                    .service(
                        web::resource("")
                            .route(web::post().to(approval::create_approval))
                            .route(web::get().to(approval::list_approvals)),
                    )
                    // /approval/{id}/stamp
                    .service(
                        web::resource("/{id}/stamp")
                            .route(web::put().to(approval::stamp_approval)),
                    )
                    // /approval/{id}/resubmit
                    .service(
                        web::resource("/{id}/resubmit")
                            .route(web::post().to(approval::resubmit_approval)),
                    ),
            )
            .service(
                web::scope("/transfer")
                    // /transfer
                    .service(
                        web::resource("")
                            .route(web::post().to(transfer::create_transfer))
                            .route(web::get().to(transfer::list_transfers)),
                    )
                    // /transfer/{id}/submit
                    .service(
                        web::resource("/{id}/submit")
                            .route(web::put().to(transfer::submit_transfer)),
                    )
                    // /transfer/{id}/cancel
                    .service(
                        web::resource("/{id}/cancel")
                            .route(web::put().to(transfer::cancel_transfer)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::get().to(attendance::list_attendance)),
                    )
                    // /attendance/recalculate
                    .service(
                        web::resource("/recalculate")
                            .route(web::post().to(attendance::recalculate)),
                    ),
            ),
    );
}
