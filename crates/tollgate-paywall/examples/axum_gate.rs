use axum::{Router, response::Html, routing::get};
use tollgate_paywall::{
    gate::EntitlementGate,
    lookup::MemoryEntitlements,
    routes::{GateContext, router},
};
use tower_http::trace::TraceLayer;

async fn index() -> Html<&'static str> {
    Html(concat!(
        "<a href=\"/api/login?email=free@example.com\">Log in (free)</a><br>",
        "<a href=\"/api/login?email=paid@example.com\">Log in (paid, 3 uses)</a>",
    ))
}

async fn report() -> Html<&'static str> {
    Html("<h1>Protected report</h1>")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let secret =
        std::env::var("SESSION_SECRET").unwrap_or_else(|_| "dev_secret_change_me".to_string());

    let gate = EntitlementGate::builder()
        .key(secret)
        .entry_path("/index.html")
        .resource_path("/report.html")
        .build();

    let lookup = MemoryEntitlements::new(["free@example.com"]);
    // Stand-in for the payment-completion handler writing to the store.
    lookup.mark_paid("paid@example.com");

    let app = Router::new()
        .route("/index.html", get(index))
        .route("/report.html", get(report).route_layer(gate.clone()))
        .nest("/api", router(GateContext { gate, lookup }))
        .layer(TraceLayer::new_for_http());

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16 integer");
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}
