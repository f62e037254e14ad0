//! Rate limiting middleware for public write routes.

use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::Method,
};
use blog_shared::ErrorResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use blog_core::ports::RateLimiter;

use crate::observability::RequestId;

/// Rate limiting middleware factory. Only writes count against the quota;
/// without a limiter every request passes.
pub struct RateLimitMiddleware {
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl RateLimitMiddleware {
    pub fn new(limiter: Option<Arc<dyn RateLimiter>>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        let limiter = match &self.limiter {
            Some(limiter) if !matches!(*req.method(), Method::GET | Method::HEAD) => {
                limiter.clone()
            }
            _ => {
                return Box::pin(async move {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                });
            }
        };

        let key = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        Box::pin(async move {
            match limiter.check(&key).await {
                Ok(result) if !result.allowed => {
                    tracing::warn!(client = %key, "Rate limit exceeded");

                    let retry_after = result.reset_after.as_secs().max(1);
                    let mut error = ErrorResponse::new(429, "Too Many Requests").with_detail(
                        format!("Rate limit exceeded. Try again in {} seconds.", retry_after),
                    );
                    if let Some(request_id) = req.extensions().get::<RequestId>() {
                        error = error.with_request_id(request_id.as_str());
                    }

                    let response = HttpResponse::TooManyRequests()
                        .insert_header(("X-RateLimit-Remaining", "0"))
                        .insert_header(("Retry-After", retry_after.to_string()))
                        .json(error);

                    Ok(req.into_response(response).map_into_right_body())
                }
                Ok(_) => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    tracing::error!(error = %e, "Rate limiter error, failing open");
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test, web};
    use blog_core::ports::{RateLimitError, RateLimitResult};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Allows the first `quota` checks.
    struct FixedQuota {
        quota: u32,
        used: AtomicU32,
    }

    #[async_trait::async_trait]
    impl RateLimiter for FixedQuota {
        async fn check(&self, _key: &str) -> Result<RateLimitResult, RateLimitError> {
            let used = self.used.fetch_add(1, Ordering::SeqCst);
            Ok(RateLimitResult {
                allowed: used < self.quota,
                reset_after: Duration::from_secs(30),
            })
        }
    }

    fn limiter(quota: u32) -> Option<Arc<dyn RateLimiter>> {
        Some(Arc::new(FixedQuota {
            quota,
            used: AtomicU32::new(0),
        }))
    }

    #[actix_web::test]
    async fn test_rejects_writes_over_quota() {
        let app = test::init_service(
            App::new().service(
                web::resource("/write")
                    .wrap(RateLimitMiddleware::new(limiter(1)))
                    .route(web::post().to(|| async { HttpResponse::Ok().finish() })),
            ),
        )
        .await;

        let first = test::call_service(&app, test::TestRequest::post().uri("/write").to_request()).await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = test::call_service(&app, test::TestRequest::post().uri("/write").to_request()).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers().get("Retry-After").unwrap(), "30");
    }

    #[actix_web::test]
    async fn test_reads_are_not_counted() {
        let app = test::init_service(
            App::new().service(
                web::resource("/form")
                    .wrap(RateLimitMiddleware::new(limiter(0)))
                    .route(web::get().to(|| async { HttpResponse::Ok().finish() })),
            ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/form").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_no_limiter_passes_everything() {
        let app = test::init_service(
            App::new().service(
                web::resource("/write")
                    .wrap(RateLimitMiddleware::new(None))
                    .route(web::post().to(|| async { HttpResponse::Ok().finish() })),
            ),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::post().uri("/write").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
