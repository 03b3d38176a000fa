use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};
use uuid::Uuid;

use std::sync::Arc;

use crate::{accounts, campaigns, disputes, orders};
use engine::Engine;

static ACCOUNT_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-account-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// The authenticated caller, resolved from the `x-account-id` header.
///
/// Identity verification against the payment gateway happens upstream; here
/// the header must simply name an existing settlement account.
#[derive(Clone, Copy, Debug)]
pub struct Caller(pub Uuid);

/// `TypedHeader` for the custom account header.
#[derive(Debug)]
struct AccountHeader(Uuid);

impl Header for AccountHeader {
    fn name() -> &'static axum::http::HeaderName {
        &ACCOUNT_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let Ok(value) = value.parse() else {
            return Err(AxumError::invalid());
        };

        Ok(AccountHeader(value))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        let as_string = self.0.to_string();
        match axum::http::HeaderValue::from_str(&as_string) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-account-id header"),
        }
    }
}

async fn auth(
    account_header: Option<TypedHeader<AccountHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(AccountHeader(account_id))) = account_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if state.engine.account(account_id).await.is_err() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(Caller(account_id));
    Ok(next.run(request).await)
}

/// Builds the full application router around an engine.
pub fn app(engine: Engine) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
    })
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts/{id}", get(accounts::get))
        .route("/accounts/deposit", post(accounts::deposit))
        .route("/accounts/withdraw", post(accounts::withdraw))
        .route("/accounts/transactions", get(accounts::list_transactions))
        .route("/campaigns", post(campaigns::create))
        .route("/campaigns/{id}", get(campaigns::get))
        .route("/campaigns/{id}/transition", post(campaigns::transition))
        .route(
            "/campaigns/{id}/bids",
            get(campaigns::list_bids).post(campaigns::place_bid),
        )
        .route("/campaigns/{id}/complete", post(campaigns::complete))
        .route("/campaigns/{id}/cancel", post(campaigns::cancel))
        .route("/campaigns/{id}/disputes", post(disputes::raise))
        .route("/bids/{id}/accept", post(campaigns::accept_bid))
        .route("/bids/{id}/withdraw", post(campaigns::withdraw_bid))
        .route("/disputes/{id}", get(disputes::get))
        .route("/disputes/{id}/review", post(disputes::review))
        .route("/disputes/{id}/resolve", post(disputes::resolve))
        .route("/disputes/{id}/close", post(disputes::close))
        .route("/orders", post(orders::fulfill))
        .route("/orders/{id}", get(orders::get))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        // Registration happens before a caller has an account to present.
        .route("/accounts", post(accounts::create))
        .with_state(state)
}

pub async fn run(engine: Engine) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
