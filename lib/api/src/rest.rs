use actix_cors::Cors;
use actix_files::Files;
use actix_web::dev::ConnectionInfo;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult};
use lookalike_core::{Metadata, RecommendationEngine, ScoredCandidate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Route prefix the images directory is mounted under.
pub const IMAGES_ROUTE: &str = "/static/images";
pub const DEFAULT_TOP_K: i64 = 10;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Served at [`IMAGES_ROUTE`] when it exists.
    pub images_dir: Option<PathBuf>,
    /// Largest `top_k` a request may ask for.
    pub max_top_k: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8002,
            images_dir: None,
            max_top_k: 100,
        }
    }
}

pub struct ApiState {
    engine: Arc<RecommendationEngine>,
    max_top_k: usize,
}

impl ApiState {
    pub fn new(engine: Arc<RecommendationEngine>, max_top_k: usize) -> Self {
        Self { engine, max_top_k }
    }
}

#[derive(Deserialize)]
struct TopKQuery {
    top_k: Option<i64>,
}

#[derive(Deserialize)]
struct QuizRequest {
    answers: Vec<String>,
    gender: Option<String>,
    top_k: Option<i64>,
}

#[derive(Serialize)]
struct RecommendedItem {
    id: String,
    image_path: String,
    score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

#[derive(Serialize)]
struct SimilarResponse {
    query_id: String,
    results: Vec<RecommendedItem>,
}

#[derive(Serialize)]
struct QuizResponse {
    results: Vec<RecommendedItem>,
    used_text_candidates: usize,
    used_visual_candidates: usize,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(engine: Arc<RecommendationEngine>, config: ApiConfig) -> std::io::Result<()> {
        let images_dir = match config.images_dir {
            Some(dir) if dir.is_dir() => {
                info!("Serving images from {:?} at {}", dir, IMAGES_ROUTE);
                Some(dir)
            }
            Some(dir) => {
                warn!("Images directory not found, static mount skipped: {:?}", dir);
                None
            }
            None => None,
        };

        let state = web::Data::new(ApiState::new(engine, config.max_top_k));

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            let mut app = App::new().wrap(cors).app_data(state.clone()).configure(routes);
            if let Some(dir) = &images_dir {
                app = app.service(Files::new(IMAGES_ROUTE, dir));
            }
            app
        })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
    }
}

/// Register the recommendation routes. Expects `web::Data<ApiState>` in app data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(health)).service(
        web::scope("/api/recommend")
            .route("/similar/{id}", web::get().to(similar))
            .route("/by-quiz", web::post().to(by_quiz)),
    );
}

/// Public URL for an item's image reference: its file name under [`IMAGES_ROUTE`].
pub fn image_url(conn: &ConnectionInfo, image_ref: &str) -> String {
    let file_name = image_ref.rsplit(['/', '\\']).next().unwrap_or_default();
    if file_name.is_empty() {
        return String::new();
    }
    format!("{}://{}{}/{}", conn.scheme(), conn.host(), IMAGES_ROUTE, file_name)
}

fn validate_top_k(raw: Option<i64>, max_top_k: usize) -> Result<usize, HttpResponse> {
    let top_k = raw.unwrap_or(DEFAULT_TOP_K);
    match usize::try_from(top_k) {
        Ok(k) if (1..=max_top_k).contains(&k) => Ok(k),
        _ => Err(HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("top_k must be between 1 and {}", max_top_k)
        }))),
    }
}

fn to_items(conn: &ConnectionInfo, candidates: Vec<ScoredCandidate>) -> Vec<RecommendedItem> {
    candidates
        .into_iter()
        .map(|c| RecommendedItem {
            id: c.item.id.clone(),
            image_path: image_url(conn, &c.item.image_path),
            score: c.score,
            metadata: c.metadata,
        })
        .collect()
}

fn internal_error(e: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": e.to_string()
    }))
}

async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "lookalike"
    })))
}

async fn similar(
    state: web::Data<ApiState>,
    path: web::Path<String>,
    query: web::Query<TopKQuery>,
    req: HttpRequest,
) -> ActixResult<HttpResponse> {
    let item_id = path.into_inner();
    let top_k = match validate_top_k(query.top_k, state.max_top_k) {
        Ok(k) => k,
        Err(resp) => return Ok(resp),
    };

    let engine = state.engine.clone();
    let id = item_id.clone();
    let results = match web::block(move || engine.recommend_similar_to_item(&id, top_k)).await {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => {
            error!("Similar-item recommendation for {} failed: {}", item_id, e);
            return Ok(internal_error(e));
        }
        Err(e) => return Ok(internal_error(e)),
    };

    Ok(HttpResponse::Ok().json(SimilarResponse {
        results: to_items(&req.connection_info(), results),
        query_id: item_id,
    }))
}

async fn by_quiz(
    state: web::Data<ApiState>,
    body: web::Json<QuizRequest>,
    req: HttpRequest,
) -> ActixResult<HttpResponse> {
    let QuizRequest { answers, gender, top_k } = body.into_inner();
    let top_k = match validate_top_k(top_k, state.max_top_k) {
        Ok(k) => k,
        Err(resp) => return Ok(resp),
    };

    let engine = state.engine.clone();
    let recs = match web::block(move || engine.recommend_by_query(answers.as_slice(), gender.as_deref(), top_k)).await {
        Ok(Ok(recs)) => recs,
        Ok(Err(e)) => {
            error!("Quiz recommendation failed: {}", e);
            return Ok(internal_error(e));
        }
        Err(e) => return Ok(internal_error(e)),
    };

    Ok(HttpResponse::Ok().json(QuizResponse {
        results: to_items(&req.connection_info(), recs.results),
        used_text_candidates: recs.stats.text_candidates,
        used_visual_candidates: recs.stats.visual_candidates,
    }))
}
