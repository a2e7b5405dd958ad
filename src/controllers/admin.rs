//! Local admin page
//!
//! `GET /` serves the control page, `GET /led?channel=<NAME>&state=<ON|OFF>`
//! drives a channel through the shared registry.

use core::fmt::Write as _;

use heapless::String;
use myrtio_engine::admin::{AdminReply, handle_led_request};

use crate::core::net::http::{
    ContentType, HttpConnection, HttpHandler, HttpResult, Method, Status,
};
use crate::infrastructure::types::Registry;

const ADMIN_PAGE: &str = include_str!("admin_page.html");
const MAX_REPLY_LEN: usize = 96;

enum Route {
    Page,
    Led,
    NotFound,
}

impl Route {
    fn of(conn: &HttpConnection<'_>) -> Self {
        match (conn.method(), conn.path()) {
            (Method::Get | Method::Head, "/") => Route::Page,
            (Method::Get, "/led") => Route::Led,
            _ => Route::NotFound,
        }
    }
}

pub struct AdminHttpController {
    registry: &'static Registry,
}

impl AdminHttpController {
    pub fn new(registry: &'static Registry) -> Self {
        Self { registry }
    }

    async fn handle_led(&self, conn: &mut HttpConnection<'_>) -> HttpResult {
        let reply = handle_led_request(self.registry, conn.query());
        let status = match reply {
            AdminReply::Applied { .. } => Status::Ok,
            AdminReply::Failed(_) => Status::InternalError,
            AdminReply::MissingState | AdminReply::UnknownChannel | AdminReply::InvalidState => {
                Status::BadRequest
            }
        };

        let mut body = String::<MAX_REPLY_LEN>::new();
        write!(body, "{}", reply)?;
        conn.respond(status, ContentType::PlainText, body.as_bytes())
            .await
    }
}

impl HttpHandler for AdminHttpController {
    async fn handle_request(&self, mut conn: HttpConnection<'_>) -> HttpResult {
        match Route::of(&conn) {
            Route::Page => {
                conn.respond(Status::Ok, ContentType::Html, ADMIN_PAGE.as_bytes())
                    .await
            }
            Route::Led => self.handle_led(&mut conn).await,
            Route::NotFound => {
                conn.respond(Status::NotFound, ContentType::PlainText, b"Not Found")
                    .await
            }
        }
    }
}
