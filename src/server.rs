//! HTTP status page.
//!
//! A single `GET /` route serving a static HTML page, so deployment
//! platforms have something to health-check. Runs on its own thread with
//! its own actix system, leaving the tokio runtime to the bot.

use actix_web::{web, App, HttpResponse, HttpServer};
use std::io;
use std::thread;

const STATUS_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>WhatsApp Status Bot</title></head>\n<body>\n<h1>WhatsApp Status Bot</h1>\n<p>Bot is running. Use WhatsApp to interact with the bot.</p>\n</body>\n</html>\n";

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(STATUS_PAGE)
}

pub async fn serve(port: u16) -> io::Result<()> {
    HttpServer::new(|| App::new().route("/", web::get().to(index)))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

/// Run the status page on a dedicated thread.
pub fn spawn(port: u16) -> io::Result<thread::JoinHandle<io::Result<()>>> {
    thread::Builder::new()
        .name("status-page".to_string())
        .spawn(move || actix_web::rt::System::new().block_on(serve(port)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn index_serves_the_status_page() {
        let app =
            test::init_service(App::new().route("/", web::get().to(index))).await;
        let response = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = test::read_body(response).await;
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("WhatsApp Status Bot"));
    }

    #[actix_web::test]
    async fn unknown_routes_are_not_found() {
        let app =
            test::init_service(App::new().route("/", web::get().to(index))).await;
        let response =
            test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
