use actix_web::web::{self};

pub mod state;

pub mod routes {
    pub mod admin;
    pub mod checkout;
    pub mod internal;
    pub mod server;
    pub mod webhook;
}

pub mod services {
    pub mod checkout;
    pub mod context;
    pub mod internal;
    pub mod server;
    pub mod webhook;
}

pub mod dtos {
    pub mod checkout;
    pub mod server;
    pub mod user;
}

pub use services::context::Billing;
pub use state::AppState;

pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/billing").service(routes::webhook::post_webhook)
}

pub fn mount_servers() -> actix_web::Scope {
    web::scope("/servers")
        .service(routes::checkout::post_checkout)
        .service(routes::checkout::post_checkout_complete)
        .service(routes::server::get_servers)
        .service(routes::server::get_server)
        .service(routes::server::post_cancel)
        .service(routes::server::post_resume)
        .service(routes::server::post_billing_cycle)
        .service(routes::server::delete_server)
}

pub fn mount_invoices() -> actix_web::Scope {
    web::scope("/invoices").service(routes::server::get_invoices)
}

pub fn mount_admin() -> actix_web::Scope {
    web::scope("/servers")
        .service(routes::admin::get_servers)
        .service(routes::admin::post_reprovision)
        .service(routes::admin::delete_server)
}

pub fn mount_internal() -> actix_web::Scope {
    web::scope("/users").service(routes::internal::post_user)
}
