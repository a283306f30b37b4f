use std::path::PathBuf;

use actix_files::NamedFile;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use khipu::{parse_amount, verify_notification, KhipuError, ParameterSet, PaymentRequest};

use crate::error::NotifyError;
use crate::metrics::{self, GATEWAY_LATENCY, NOTIFICATIONS, PAYMENTS_CREATED};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreatePaymentForm {
    pub subject: Option<String>,
    pub amount: Option<String>,
}

#[derive(Deserialize)]
pub struct ReturnQuery {
    pub payment_id: Option<String>,
}

fn page_path(state: &AppState, name: &str) -> PathBuf {
    PathBuf::from(&state.config.static_dir).join(name)
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Back to the checkout page with a user-visible message.
fn redirect_with_message(message: &str, kind: &str) -> HttpResponse {
    redirect_to(&format!(
        "/?message={}&type={kind}",
        khipu::encoding::encode_value(message)
    ))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[get("/")]
pub async fn index(state: web::Data<AppState>) -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async(page_path(&state, "index.html")).await?)
}

#[post("/create_payment")]
pub async fn create_payment(
    state: web::Data<AppState>,
    form: web::Form<CreatePaymentForm>,
) -> HttpResponse {
    let form = form.into_inner();
    let (subject, amount_raw) = match (non_empty(form.subject), non_empty(form.amount)) {
        (Some(s), Some(a)) => (s, a),
        _ => {
            tracing::warn!("payment form is missing subject or amount");
            PAYMENTS_CREATED.with_label_values(&["invalid"]).inc();
            return redirect_with_message("Error: missing description or amount", "error");
        }
    };

    let config = &state.config;
    let amount = match parse_amount(&amount_raw, config.max_amount) {
        Ok(a) => a,
        Err(KhipuError::AmountExceedsLimit { amount, max }) => {
            tracing::warn!(amount, max, "payment amount exceeds limit");
            PAYMENTS_CREATED.with_label_values(&["invalid"]).inc();
            return redirect_with_message(
                &format!(
                    "The maximum amount is ${max} {}. Please enter a smaller amount.",
                    config.currency
                ),
                "warning",
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, input = %amount_raw, "rejected payment amount");
            PAYMENTS_CREATED.with_label_values(&["invalid"]).inc();
            return redirect_with_message(&format!("Error: {e}"), "error");
        }
    };

    let request = PaymentRequest::new(
        config.receiver_id.as_str(),
        subject,
        amount,
        config.callback_urls(),
    )
    .with_currency(config.currency.as_str())
    .with_bank_id(config.bank_id.clone());

    tracing::info!(
        subject = %request.subject,
        amount,
        currency = %request.currency,
        transaction_id = %request.transaction_id,
        "creating payment"
    );

    let start = std::time::Instant::now();
    let result = state.client.create_payment(&request).await;
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(created) => match created.redirect_url() {
            Some(url) => {
                PAYMENTS_CREATED.with_label_values(&["success"]).inc();
                GATEWAY_LATENCY
                    .with_label_values(&["success"])
                    .observe(elapsed);
                redirect_to(url)
            }
            None => {
                PAYMENTS_CREATED.with_label_values(&["error"]).inc();
                redirect_with_message(
                    "Error starting the payment with Khipu. Please try again.",
                    "error",
                )
            }
        },
        Err(e) => {
            PAYMENTS_CREATED.with_label_values(&["error"]).inc();
            GATEWAY_LATENCY.with_label_values(&["error"]).observe(elapsed);
            tracing::error!(error = %e, "payment creation failed");
            let message = match e {
                KhipuError::Gateway { message, .. } => {
                    format!("Error connecting to Khipu: {message}")
                }
                KhipuError::MissingRedirect => {
                    "Error starting the payment with Khipu. Please try again.".to_string()
                }
                other => format!("Network or unknown error: {other}"),
            };
            redirect_with_message(&message, "error")
        }
    }
}

#[get("/khipu/success")]
pub async fn payment_success(
    state: web::Data<AppState>,
    query: web::Query<ReturnQuery>,
) -> actix_web::Result<NamedFile> {
    let payment_id = query.payment_id.as_deref().unwrap_or("N/A");
    tracing::info!(payment_id = %payment_id, "payer returned after payment");
    Ok(NamedFile::open_async(page_path(&state, "success.html")).await?)
}

#[get("/khipu/cancel")]
pub async fn payment_cancel(
    state: web::Data<AppState>,
    query: web::Query<ReturnQuery>,
) -> actix_web::Result<NamedFile> {
    let payment_id = query.payment_id.as_deref().unwrap_or("N/A");
    tracing::info!(payment_id = %payment_id, "payer cancelled payment");
    Ok(NamedFile::open_async(page_path(&state, "cancel.html")).await?)
}

/// Parse the notification body as JSON or, by default, as a form.
fn parse_notification(req: &HttpRequest, body: &[u8]) -> Result<ParameterSet, NotifyError> {
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);

    let parsed = if is_json {
        ParameterSet::from_json(body)
    } else {
        ParameterSet::from_form(body)
    };
    parsed.map_err(|e| NotifyError::MalformedBody(e.to_string()))
}

/// Gateway callback. 200 once verified and dispatched; 400 when the body or
/// `hash` is missing; 401 on a signature mismatch.
#[post("/khipu/notify")]
pub async fn notify(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, NotifyError> {
    let verified = parse_notification(&req, &body).and_then(|params| {
        verify_notification(params, &state.config.secret).map_err(NotifyError::from)
    });

    let notification = match verified {
        Ok(n) => n,
        Err(e) => {
            NOTIFICATIONS.with_label_values(&[e.label()]).inc();
            tracing::warn!(error = %e, "rejected payment notification");
            return Err(e);
        }
    };

    tracing::info!(
        payment_id = notification.payment_id.as_deref().unwrap_or("N/A"),
        status = %notification.status,
        "notification signature verified"
    );
    state.handler.on_notification(&notification);
    NOTIFICATIONS.with_label_values(&["verified"]).inc();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Notification received and processed",
    })))
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "khipu-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/metrics")]
pub async fn metrics_endpoint(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match &state.config.metrics_token {
        Some(token) => {
            let authorized = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| khipu::hmac::constant_time_eq(t.as_bytes(), token.as_bytes()))
                .unwrap_or(false);

            if !authorized {
                return HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "unauthorized",
                    "message": "Valid Bearer token required for /metrics"
                }));
            }
        }
        None if !state.config.public_metrics => {
            return HttpResponse::Forbidden().json(serde_json::json!({
                "error": "forbidden",
                "message": "Set METRICS_TOKEN or KHIPU_PUBLIC_METRICS=true to access /metrics"
            }));
        }
        None => {}
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

/// Register every route on an app or scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(create_payment)
        .service(payment_success)
        .service(payment_cancel)
        .service(notify)
        .service(health)
        .service(metrics_endpoint);
}
