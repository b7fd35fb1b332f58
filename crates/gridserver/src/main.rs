use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult};
use actix_ws::{Closed, Message, Session};
use gridcore::{EventSink, Graph, SessionEvent};
use gridruntime::{GridRuntime, NodeRegistry, RuntimeConfig};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

/// Application state shared across handlers
struct AppState {
    runtime: Arc<GridRuntime>,
}

/// One client message on the run channel
#[derive(Debug, Deserialize)]
struct ClientRequest {
    command: String,
    #[serde(default)]
    graph: Option<Graph>,
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "gridflow"
    }))
}

/// Node capability discovery for remote clients
#[get("/object_info")]
async fn object_info(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.runtime.registry().list_all())
}

/// WebSocket execution channel
#[get("/ws/run")]
async fn websocket_run(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;
    let runtime = data.runtime.clone();

    actix_web::rt::spawn(async move {
        info!("client connected");

        while let Some(Ok(msg)) = msg_stream.recv().await {
            match msg {
                Message::Text(text) => {
                    if handle_request(&text, &runtime, &mut session).await.is_err() {
                        break;
                    }
                }
                Message::Ping(bytes) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        info!("client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

async fn handle_request(
    text: &str,
    runtime: &Arc<GridRuntime>,
    session: &mut Session,
) -> Result<(), Closed> {
    let request: ClientRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(err) => {
            return send_event(
                session,
                &SessionEvent::Error {
                    message: format!("invalid request: {err}"),
                },
            )
            .await;
        }
    };

    match request.command.as_str() {
        "execute_graph" => {
            let Some(graph) = request.graph.filter(|g| !g.is_empty()) else {
                return send_event(
                    session,
                    &SessionEvent::Error {
                        message: "graph data is empty".to_string(),
                    },
                )
                .await;
            };

            info!(nodes = graph.len(), "received graph execution request");
            let (sink, mut events) = EventSink::channel();
            let runtime = runtime.clone();
            let run = tokio::spawn(async move {
                if let Err(err) = runtime.run(&graph, &sink).await {
                    error!("graph run failed: {err}");
                }
            });

            // Relay engine events until the run drops its sink.
            while let Some(event) = events.recv().await {
                send_event(session, &event).await?;
            }
            let _ = run.await;
            Ok(())
        }
        "ping" => send_event(session, &SessionEvent::Pong).await,
        other => {
            send_event(
                session,
                &SessionEvent::Error {
                    message: format!("unknown command: {other}"),
                },
            )
            .await
        }
    }
}

async fn send_event(session: &mut Session, event: &SessionEvent) -> Result<(), Closed> {
    match serde_json::to_string(event) {
        Ok(json) => session.text(json).await,
        Err(_) => Ok(()),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("starting gridflow server");

    let mut registry = NodeRegistry::new();
    gridnodes::register_all(&mut registry);

    let runtime = GridRuntime::with_config(Arc::new(registry), RuntimeConfig::default());
    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    info!("server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(object_info)
            .service(websocket_run)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
