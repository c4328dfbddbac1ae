use actix_web::{web, HttpResponse, Responder};
use tera::{Context, Tera};

use crate::render;
use crate::AppState;

pub fn config_public(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(show_public_page));
}

async fn show_public_page(state: web::Data<AppState>, tera: web::Data<Tera>) -> impl Responder {
    let content = state.content.clone();
    let document = match web::block(move || content.load()).await {
        Ok(Ok(document)) => document,
        Ok(Err(e)) => {
            // The page still renders with its placeholders.
            log::error!("Failed to load content for the public page: {}", e);
            Default::default()
        }
        Err(e) => {
            log::error!("Blocking task failed while loading content: {}", e);
            Default::default()
        }
    };

    let mut ctx = Context::new();
    ctx.insert("page", &render::public_view(&document));

    match tera.render("public/index.html", &ctx) {
        Ok(rendered) => HttpResponse::Ok().content_type("text/html; charset=utf-8").body(rendered),
        Err(e) => {
            log::error!("Failed to render public page: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}
