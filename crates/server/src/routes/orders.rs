//! Storefront order routes.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::order::normalize_items;
use crate::models::{CreateOrderRequest, PlacedOrder};
use crate::services::{orders, payment_qr};
use crate::state::AppState;

/// `POST /api/orders` - place an order from inline items.
#[instrument(skip(state, request), fields(lines = request.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    Json(mut request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    request.details.validate().map_err(AppError::BadRequest)?;
    let items = normalize_items(&request.items).map_err(AppError::BadRequest)?;

    add_breadcrumb("checkout", "Order from inline items", None);
    let placed = orders::place_order(&state, &request.details, &items).await?;

    Ok((StatusCode::CREATED, Json(placed)))
}

/// `GET /api/orders/{number}/payment-qr` - SVG QR code for a bank transfer.
#[instrument(skip(state))]
pub async fn payment_qr(
    State(state): State<AppState>,
    Path(order_number): Path<i64>,
) -> Result<Response> {
    let order = OrderRepository::new(state.pool())
        .get_by_number(order_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_number}")))?;

    let descriptor = payment_qr::descriptor_for(&order, &state.config().store).ok_or_else(|| {
        AppError::NotFound("no QR payment for this order".to_string())
    })?;

    svg_response(&descriptor.to_spd())
}

/// Render an SPD payload as an SVG response.
pub(crate) fn svg_response(payload: &str) -> Result<Response> {
    let svg = payment_qr::render_svg(payload)
        .map_err(|e| AppError::Internal(format!("QR rendering failed: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "private, max-age=300"),
        ],
        svg,
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_response_headers() {
        let response = svg_response("SPD*1.0*ACC:CZ6508000000192000145399*AM:10.00*CC:CZK").unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/svg+xml"
        );
    }
}
