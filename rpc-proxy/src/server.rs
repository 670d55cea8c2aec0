use crate::config::Config;
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use eth_rpc_proxy_core::rpc_client::{RpcClient, Upstream};
use eth_rpc_proxy_core::types::{ClientRequest, MaybeBatch, RpcResponse, JSONRPC_VERSION};
use hyper::service::{make_service_fn, service_fn};
use hyper::{header, Body, Method, Request, Response, Server as HttpServer, StatusCode};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value as JsonValue;
use std::convert::Infallible;
use std::sync::Arc;

pub struct Server {}

struct AppData<U> {
    metrics: Arc<Metrics>,
    handler: Arc<Handler<U>>,
}

impl<U> Clone for AppData<U> {
    fn clone(&self) -> Self {
        Self {
            metrics: self.metrics.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl Server {
    pub async fn run(config: Config) -> Result<()> {
        let metrics = Metrics::new();
        let metrics = Arc::new(metrics);

        let limiter = RateLimiter::new(config.rate_limit, metrics.clone())?;
        let limiter = Arc::new(limiter);

        let rpc_client = RpcClient::new(&config.rpc).map_err(Error::CreateRpcClient)?;

        let req_handler = Handler::new(
            rpc_client,
            limiter,
            config.max_block_range,
            metrics.clone(),
        );
        let req_handler = Arc::new(req_handler);

        let app_data = AppData {
            metrics,
            handler: req_handler,
        };

        let make_service = make_service_fn(move |_| {
            let app_data = app_data.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| handler(app_data.clone(), req))) }
        });

        let server = HttpServer::try_bind(&config.server_addr)
            .map_err(Error::BindHttpServer)?
            .http1_preserve_header_case(true)
            .http1_title_case_headers(true)
            .serve(make_service);

        log::info!(
            "proxying {} on {}, max eth_getLogs block range is {}",
            config.rpc.target_rpc,
            config.server_addr,
            config.max_block_range
        );

        server.await.map_err(Error::RunHttpServer)
    }
}

async fn handler<U: Upstream>(
    app_data: AppData<U>,
    req: Request<Body>,
) -> hyper::Result<Response<Body>> {
    let res = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => metrics_handler(app_data).await,
        (&Method::POST, "/") => rpc_handler(app_data, req).await,
        (&Method::POST, "/batch") => batch_handler(app_data, req).await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap()),
    };

    match res {
        Ok(res) => Ok(res),
        Err(e @ (Error::InvalidRequestBody(_) | Error::MalformedRequest)) => {
            log::debug!("invalid request:\n{}", e);
            let resp = RpcResponse::error(
                JSONRPC_VERSION.to_owned(),
                JsonValue::Null,
                e.to_rpc_error(),
            );
            Ok(json_response(StatusCode::BAD_REQUEST, &resp))
        }
        Err(e) => Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(e.to_string()))
            .unwrap()),
    }
}

async fn read_body(req: Request<Body>) -> Result<Box<RawValue>> {
    let body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|_| Error::InvalidRequestBody(None))?;

    serde_json::from_slice(body.as_ref()).map_err(|e| Error::InvalidRequestBody(Some(e)))
}

async fn rpc_handler<U: Upstream>(app_data: AppData<U>, req: Request<Body>) -> Result<Response<Body>> {
    let body = read_body(req).await?;

    let res = if body.get().trim_start().starts_with('[') {
        MaybeBatch::Batch(app_data.handler.handle_batch_value(&body).await?)
    } else {
        let rpc_req = ClientRequest::from_raw(body).map_err(|e| Error::InvalidRequestBody(Some(e)))?;
        MaybeBatch::Single(app_data.handler.handle_single(rpc_req).await)
    };

    Ok(json_response(StatusCode::OK, &res))
}

async fn batch_handler<U: Upstream>(
    app_data: AppData<U>,
    req: Request<Body>,
) -> Result<Response<Body>> {
    let body = read_body(req).await?;

    let res = app_data.handler.handle_batch_value(&body).await?;

    Ok(json_response(StatusCode::OK, &res))
}

async fn metrics_handler<U>(app_data: AppData<U>) -> Result<Response<Body>> {
    let body = app_data.metrics.encode()?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )
        .body(Body::from(body))
        .unwrap())
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let body = serde_json::to_string(body).unwrap();

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}
