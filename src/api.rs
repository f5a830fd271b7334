// src/api.rs
use crate::error::ServiceError;
use crate::models::{StockQuery, UpdateRequest};
use crate::service::{normalize_symbol, StockService};
use log::{error, info};
use percent_encoding::percent_decode_str;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn routes(
    service: Arc<StockService>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let get = warp::path!("stock" / String)
        .and(warp::get())
        .and(warp::query::<StockQuery>())
        .and(with_service(service.clone()))
        .and_then(get_stock_handler);

    let update = warp::path!("stock" / String)
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_service(service.clone()))
        .and_then(update_stock_handler);

    let amount = warp::path!("stock" / String / "amount")
        .and(warp::get())
        .and(with_service(service))
        .and_then(get_amount_handler);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_credentials(true)
        .allow_methods(vec![
            "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS",
        ])
        .allow_headers(vec![
            "accept",
            "accept-language",
            "authorization",
            "cache-control",
            "content-language",
            "content-type",
            "origin",
            "x-requested-with",
        ]);

    get.or(update)
        .or(amount)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log("stock_enricher::api"))
}

fn with_service(
    service: Arc<StockService>,
) -> impl Filter<Extract = (Arc<StockService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

// Path segments arrive percent-encoded ("BRK%2EB").
fn decode_symbol(raw: &str) -> Result<String, Rejection> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|symbol| symbol.into_owned())
        .map_err(|e| {
            warp::reject::custom(ServiceError::Validation(format!(
                "symbol is not valid UTF-8: {}",
                e
            )))
        })
}

async fn get_stock_handler(
    symbol: String,
    query: StockQuery,
    service: Arc<StockService>,
) -> Result<impl Reply, Rejection> {
    let symbol = decode_symbol(&symbol)?;
    let result = match query.date {
        Some(date) => service.get_stock_data_on(&symbol, Some(date)).await,
        None => service.get_stock_data(&symbol).await,
    };
    match result {
        Ok(view) => {
            info!("Stock data for {} retrieved successfully.", view.pricing.symbol);
            Ok(warp::reply::json(&view))
        }
        Err(e) => {
            error!("Failed to retrieve stock data for {}: {}", symbol, e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn update_stock_handler(
    symbol: String,
    request: UpdateRequest,
    service: Arc<StockService>,
) -> Result<impl Reply, Rejection> {
    let symbol = decode_symbol(&symbol)?;
    let amount = u64::try_from(request.amount).map_err(|_| {
        warp::reject::custom(ServiceError::Validation(format!(
            "amount must be greater than or equal to 0, got {}",
            request.amount
        )))
    })?;

    match service.update_amount(&symbol, amount) {
        Ok(result) => {
            info!("{}", result.message);
            Ok(warp::reply::with_status(
                warp::reply::json(&result),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Failed to update amount for {}: {}", symbol, e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn get_amount_handler(
    symbol: String,
    service: Arc<StockService>,
) -> Result<impl Reply, Rejection> {
    let symbol = normalize_symbol(&decode_symbol(&symbol)?);
    let amount = service.get_amount(&symbol);
    Ok(warp::reply::json(&json!({ "symbol": symbol, "amount": amount })))
}

/// Turns rejections into `{"detail": ...}` responses.
///
/// Internal failures are logged by the handlers; only a generic message leaves the process.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if let Some(e) = err.find::<ServiceError>() {
        let detail = match e {
            ServiceError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (e.status(), detail)
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if let Some(e) = err.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "detail": detail })),
        status,
    ))
}
