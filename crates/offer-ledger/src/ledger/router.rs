use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::clock::Clock;
use super::commission::{round_money, ShareBreakdown};
use super::compliance::{ComplianceReport, MissingEntry};
use super::dates::{deserialize_date, deserialize_optional_date};
use super::domain::{DailyEntry, OfferId, SubscriptionId};
use super::error::LedgerError;
use super::performance::OfferPerformance;
use super::repository::LedgerRepository;
use super::service::LedgerService;

/// Router builder exposing the ledger's HTTP endpoints.
pub fn ledger_router<R, C>(service: Arc<LedgerService<R, C>>) -> Router
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/api/v1/compliance", get(compliance_handler::<R, C>))
        .route(
            "/api/v1/offers/:offer_id/entries",
            post(resolve_entry_handler::<R, C>),
        )
        .route(
            "/api/v1/offers/:offer_id/shares",
            get(shares_handler::<R, C>),
        )
        .route(
            "/api/v1/offers/:offer_id/performance",
            get(performance_handler::<R, C>),
        )
        .route("/api/v1/billing/run", post(billing_handler::<R, C>))
        .route(
            "/api/v1/subscriptions/:subscription_id/next-payment",
            put(reschedule_handler::<R, C>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TodayQuery {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DateQuery {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RangeQuery {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) from: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) to: NaiveDate,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ResolveEntryRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) date: NaiveDate,
    pub(crate) revenue: Decimal,
    #[serde(default)]
    pub(crate) ads_spend: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BillingRunRequest {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RescheduleRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) next_payment_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct ComplianceView {
    pub today: NaiveDate,
    pub window_days: u32,
    pub compliance_rate: u8,
    pub active_offers: usize,
    pub compliant_offers: usize,
    pub due_today: Vec<MissingEntry>,
    pub overdue: Vec<MissingEntry>,
}

impl From<ComplianceReport> for ComplianceView {
    fn from(report: ComplianceReport) -> Self {
        Self {
            today: report.today,
            window_days: report.window_days,
            compliance_rate: report.compliance_rate,
            active_offers: report.active_offers,
            compliant_offers: report.compliant_offers,
            due_today: report.due_today().cloned().collect(),
            overdue: report.overdue().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub id: String,
    pub offer_id: OfferId,
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub ads_spend: Decimal,
    pub net_profit: Decimal,
}

impl From<&DailyEntry> for EntryView {
    fn from(entry: &DailyEntry) -> Self {
        Self {
            id: entry.id.0.clone(),
            offer_id: entry.offer_id.clone(),
            date: entry.date,
            revenue: entry.revenue,
            ads_spend: entry.ads_spend,
            net_profit: entry.net_profit(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParticipantShareView {
    pub member_id: String,
    pub share_percent: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SharesView {
    pub offer_id: OfferId,
    pub date: NaiveDate,
    pub payout_model: &'static str,
    pub base: Decimal,
    pub team_pot_percent: Decimal,
    pub team_share: Decimal,
    pub participants: Vec<ParticipantShareView>,
    pub warnings: Vec<String>,
}

impl SharesView {
    fn new(offer_id: OfferId, date: NaiveDate, breakdown: ShareBreakdown) -> Self {
        Self {
            offer_id,
            date,
            payout_model: breakdown.payout_model.label(),
            base: round_money(breakdown.base),
            team_pot_percent: breakdown.team_pot_percent,
            team_share: round_money(breakdown.team_share),
            participants: breakdown
                .participants
                .into_iter()
                .map(|share| ParticipantShareView {
                    member_id: share.member_id.0,
                    share_percent: share.share_percent,
                    amount: round_money(share.amount),
                })
                .collect(),
            warnings: breakdown
                .warnings
                .iter()
                .map(|warning| warning.message())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PerformanceView {
    pub offer_id: OfferId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_recorded: usize,
    pub revenue: Decimal,
    pub ads_spend: Decimal,
    pub net_profit: Decimal,
    pub team_share: Decimal,
    pub cached_team_share_drift: Decimal,
    pub participants: Vec<ParticipantShareView>,
    pub warnings: Vec<String>,
}

impl From<OfferPerformance> for PerformanceView {
    fn from(performance: OfferPerformance) -> Self {
        Self {
            offer_id: performance.offer_id,
            from: performance.from,
            to: performance.to,
            days_recorded: performance.days_recorded,
            revenue: round_money(performance.revenue),
            ads_spend: round_money(performance.ads_spend),
            net_profit: round_money(performance.net_profit),
            team_share: round_money(performance.team_share),
            cached_team_share_drift: round_money(performance.cached_team_share_drift),
            participants: performance
                .participants
                .into_iter()
                .map(|share| ParticipantShareView {
                    member_id: share.member_id.0,
                    share_percent: share.share_percent,
                    amount: round_money(share.amount),
                })
                .collect(),
            warnings: performance
                .warnings
                .iter()
                .map(|warning| warning.message())
                .collect(),
        }
    }
}

pub(crate) fn error_response(error: LedgerError) -> Response {
    let status = match &error {
        LedgerError::Conflict { .. } => StatusCode::CONFLICT,
        LedgerError::OfferNotFound(_)
        | LedgerError::SubscriptionNotFound(_)
        | LedgerError::EntryNotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::ExternalService(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

pub(crate) async fn compliance_handler<R, C>(
    State(service): State<Arc<LedgerService<R, C>>>,
    Query(query): Query<TodayQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    match service.scan_compliance(query.today).await {
        Ok(report) => (StatusCode::OK, Json(ComplianceView::from(report))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn resolve_entry_handler<R, C>(
    State(service): State<Arc<LedgerService<R, C>>>,
    Path(offer_id): Path<String>,
    Json(request): Json<ResolveEntryRequest>,
) -> Response
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    let offer_id = OfferId(offer_id);
    match service
        .resolve_daily_entry(&offer_id, request.date, request.revenue, request.ads_spend)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(EntryView::from(&entry))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn shares_handler<R, C>(
    State(service): State<Arc<LedgerService<R, C>>>,
    Path(offer_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    let offer_id = OfferId(offer_id);
    match service.shares(&offer_id, query.date).await {
        Ok(breakdown) => {
            let view = SharesView::new(offer_id, query.date, breakdown);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn performance_handler<R, C>(
    State(service): State<Arc<LedgerService<R, C>>>,
    Path(offer_id): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Response
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    let offer_id = OfferId(offer_id);
    match service.performance(&offer_id, query.from, query.to).await {
        Ok(performance) => {
            (StatusCode::OK, Json(PerformanceView::from(performance))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn billing_handler<R, C>(
    State(service): State<Arc<LedgerService<R, C>>>,
    request: Option<Json<BillingRunRequest>>,
) -> Response
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    let today = request.and_then(|Json(request)| request.today);
    match service.run_billing_pass(today).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reschedule_handler<R, C>(
    State(service): State<Arc<LedgerService<R, C>>>,
    Path(subscription_id): Path<String>,
    Json(request): Json<RescheduleRequest>,
) -> Response
where
    R: LedgerRepository + 'static,
    C: Clock + 'static,
{
    let id = SubscriptionId(subscription_id);
    match service
        .reschedule_subscription(&id, request.next_payment_date)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(error) => error_response(error),
    }
}
