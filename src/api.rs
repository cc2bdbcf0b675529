use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::advice::{self, Recommendation};
use crate::aggregate::{totals, Aggregator};
use crate::ai::{Advisor, ChatRequest, SuggestRequest};
use crate::cache::{CacheStatus, ScoreCache};
use crate::classify::Classifier;
use crate::config::{build_advisor, AiConfig, ScoringConfig};
use crate::model::{Merchant, ProductScore, ScoreAggregate, ScoreBundle};
use crate::ratings::{self, MerchantRating};
use crate::rewards::{self, RewardProgress, Rewards};
use crate::session::Session;

pub const CACHE_HEADER: &str = "x-score-cache";

#[derive(Clone)]
pub struct AppState {
    classifier: Arc<Classifier>,
    aggregator: Aggregator,
    merchants: Arc<Vec<Merchant>>,
    session: Arc<RwLock<Session>>,
    cache: Arc<ScoreCache>,
    advisor: Advisor,
}

impl AppState {
    pub fn new(
        classifier: Classifier,
        aggregator: Aggregator,
        merchants: Vec<Merchant>,
        cache: ScoreCache,
        advisor: Advisor,
    ) -> Self {
        Self {
            classifier: Arc::new(classifier),
            aggregator,
            merchants: Arc::new(merchants),
            session: Arc::new(RwLock::new(Session::test_user())),
            cache: Arc::new(cache),
            advisor,
        }
    }

    pub fn from_config(scoring: &ScoringConfig, ai: &AiConfig, merchants: Vec<Merchant>) -> anyhow::Result<Self> {
        Ok(Self::new(
            scoring.classifier()?,
            scoring.aggregator(),
            merchants,
            scoring.score_cache(),
            build_advisor(ai),
        ))
    }

    /// Built-in rules, in-memory cache, AI disabled.
    pub fn in_memory(merchants: Vec<Merchant>) -> Self {
        Self::new(
            Classifier::default(),
            Aggregator::default(),
            merchants,
            ScoreCache::in_memory(),
            Advisor::disabled(),
        )
    }

    pub fn with_advisor(mut self, advisor: Advisor) -> Self {
        self.advisor = advisor;
        self
    }

    pub fn with_cache(mut self, cache: ScoreCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Arc::new(RwLock::new(session));
        self
    }

    /// Bundle for the session's merchants, from cache when fresh.
    ///
    /// Cache I/O runs on the blocking pool. The session read guard is held until
    /// it finishes so a concurrent connect/disconnect cannot be overwritten by a
    /// bundle computed for the previous merchant set.
    async fn scores(&self) -> (ScoreBundle, CacheStatus) {
        let session = self.session.read().await;
        let snapshot = session.clone();
        let (merchants, cache, classifier, aggregator) = (
            self.merchants.clone(),
            self.cache.clone(),
            self.classifier.clone(),
            self.aggregator,
        );
        let scored = tokio::task::spawn_blocking(move || {
            score_session(&snapshot, &merchants, &cache, &classifier, aggregator)
        })
        .await;
        drop(session);

        match scored {
            Ok(out) => out,
            Err(e) => {
                warn!(error = %e, "score task failed, scoring without cache");
                let session = self.session.read().await;
                let selected = session.connected_merchants(&self.merchants);
                let bundle = self
                    .aggregator
                    .score_merchants(selected.iter().copied(), |name| self.classifier.classify(name));
                (bundle, CacheStatus::Miss)
            }
        }
    }
}

fn score_session(
    session: &Session,
    merchants: &[Merchant],
    cache: &ScoreCache,
    classifier: &Classifier,
    aggregator: Aggregator,
) -> (ScoreBundle, CacheStatus) {
    let selected = session.connected_merchants(merchants);
    cache.get_or_compute(|| aggregator.score_merchants(selected.iter().copied(), |name| classifier.classify(name)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/classify", post(classify))
        .route("/scores", get(scores))
        .route("/scores/cache", delete(clear_scores))
        .route("/merchants", get(merchants))
        .route("/rewards", get(rewards_view))
        .route("/suggest", post(suggest))
        .route("/chat", post(chat))
        .route("/session", get(session))
        .route("/session/merchants/{id}", post(connect).delete(disconnect))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ------------------------------------------------------------
// Errors
// ------------------------------------------------------------

pub enum ApiError {
    UnknownMerchant(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::UnknownMerchant(id) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("unknown merchant '{id}'") })),
            )
                .into_response(),
        }
    }
}

// ------------------------------------------------------------
// Scoring
// ------------------------------------------------------------

#[derive(Deserialize)]
struct ClassifyReq {
    name: String,
}

#[derive(Serialize)]
struct ClassifyResp {
    #[serde(flatten)]
    score: ProductScore,
    alternatives: Vec<&'static str>,
}

async fn classify(State(state): State<AppState>, Json(body): Json<ClassifyReq>) -> Json<ClassifyResp> {
    let score = state.classifier.classify(&body.name);
    let alternatives = advice::alternatives(&body.name, score.score);
    Json(ClassifyResp { score, alternatives })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoresResp {
    #[serde(flatten)]
    bundle: ScoreBundle,
    insight: &'static str,
}

async fn scores(State(state): State<AppState>) -> Response {
    let (bundle, status) = state.scores().await;
    let insight = advice::insight(bundle.overall_score);
    let mut resp = Json(ScoresResp { bundle, insight }).into_response();
    resp.headers_mut()
        .insert(CACHE_HEADER, HeaderValue::from_static(status.as_str()));
    resp
}

async fn clear_scores(State(state): State<AppState>) -> StatusCode {
    state.cache.clear();
    info!("score cache cleared");
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MerchantView {
    id: String,
    name: String,
    color: String,
    connected: bool,
    transactions: usize,
    total_spent: f64,
    score: Option<ScoreAggregate>,
    rating: Option<&'static MerchantRating>,
}

async fn merchants(State(state): State<AppState>) -> Json<Vec<MerchantView>> {
    let (bundle, _) = state.scores().await;
    let aggregates: BTreeMap<String, ScoreAggregate> = state.aggregator.merchant_aggregates(&bundle);
    let session = state.session.read().await;

    let out = state
        .merchants
        .iter()
        .map(|m| {
            let t = totals([m]);
            MerchantView {
                id: m.id.clone(),
                name: m.name.clone(),
                color: m.color.clone(),
                connected: m.connected && session.is_connected(&m.id),
                transactions: t.transactions,
                total_spent: t.spent,
                score: aggregates.get(&m.name).copied(),
                rating: ratings::for_merchant(m),
            }
        })
        .collect();
    Json(out)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RewardsResp {
    #[serde(flatten)]
    rewards: Rewards,
    recommendations: Vec<Recommendation>,
}

async fn rewards_view(State(state): State<AppState>) -> Json<RewardsResp> {
    let (bundle, _) = state.scores().await;
    let spent = {
        let session = state.session.read().await;
        totals(session.connected_merchants(&state.merchants))
    };
    let progress = RewardProgress {
        overall_score: bundle.overall_score,
        transactions: bundle.scored_transactions.len(),
        total_spent: spent.spent,
    };

    let mut low: Vec<(String, u8)> = bundle
        .product_scores
        .iter()
        .filter(|p| p.score < advice::ALTERNATIVES_BELOW)
        .map(|p| (p.product_name.clone(), p.score))
        .collect();
    low.sort_by_key(|(_, s)| *s);

    Json(RewardsResp {
        rewards: rewards::evaluate(&progress, Utc::now().date_naive()),
        recommendations: advice::recommend(&low),
    })
}

// ------------------------------------------------------------
// Advisor
// ------------------------------------------------------------

#[derive(Serialize)]
struct SuggestResp {
    suggestion: String,
    alternatives: Vec<&'static str>,
    provider: &'static str,
}

async fn suggest(State(state): State<AppState>, Json(req): Json<SuggestRequest>) -> Json<SuggestResp> {
    let suggestion = state.advisor.suggest(&req).await;
    Json(SuggestResp {
        suggestion,
        alternatives: advice::alternatives(&req.product_name, req.current_score),
        provider: state.advisor.provider_name(),
    })
}

#[derive(Serialize)]
struct ChatResp {
    reply: String,
    provider: &'static str,
}

async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResp> {
    let reply = if state.advisor.is_enabled() {
        state.advisor.chat(&req).await
    } else {
        let overall = match req.context.as_ref().and_then(|c| c.overall_score) {
            Some(s) => Some(s),
            None => Some(state.scores().await.0.overall_score),
        };
        advice::canned_reply(&req.message, overall)
    };
    Json(ChatResp {
        reply,
        provider: state.advisor.provider_name(),
    })
}

// ------------------------------------------------------------
// Session
// ------------------------------------------------------------

async fn session(State(state): State<AppState>) -> Json<Session> {
    Json(state.session.read().await.clone())
}

async fn connect(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Session>, ApiError> {
    update_session(&state, &id, |s| s.connect(&id)).await
}

async fn disconnect(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Session>, ApiError> {
    update_session(&state, &id, |s| s.disconnect(&id)).await
}

/// Apply a connect/disconnect; a change invalidates the cached bundle.
async fn update_session<F>(state: &AppState, id: &str, op: F) -> Result<Json<Session>, ApiError>
where
    F: FnOnce(&mut Session) -> bool,
{
    if !state.merchants.iter().any(|m| m.id == id) {
        return Err(ApiError::UnknownMerchant(id.to_string()));
    }
    let mut session = state.session.write().await;
    if op(&mut *session) {
        state.cache.clear();
        info!(merchant = id, connected = session.is_connected(id), "session merchants changed");
    }
    Ok(Json(session.clone()))
}
