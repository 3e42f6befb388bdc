// web-server/src/middleware/auth_gate.rs
use std::rc::Rc;

use actix::Addr;
use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    web, Error, HttpResponse,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};

use crate::session::{current_user, AuthSettings};
use crate::session_registry::SessionRegistryActor;
use crate::store::ProfileStore;

/// Redirects unauthenticated requests for protected paths to `/`
#[derive(Debug, Clone, Default)]
pub struct AuthGate;

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthGateMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let settings = req.app_data::<web::Data<AuthSettings>>().cloned();
        let registry = req.app_data::<web::Data<Addr<SessionRegistryActor>>>().cloned();
        let store = req.app_data::<web::Data<dyn ProfileStore>>().cloned();

        let gated = match (settings, registry, store) {
            (Some(settings), Some(registry), Some(store)) if settings.is_protected(req.path()) => {
                Some((settings, registry, store))
            }
            _ => None,
        };

        let service = Rc::clone(&self.service);
        Box::pin(async move {
            if let Some((settings, registry, store)) = gated {
                let session = match current_user(req.request(), &settings, &registry, &**store).await {
                    Ok(session) => session,
                    Err(e) => {
                        tracing::error!("Session check failed: {}", e);
                        None
                    }
                };

                if session.is_none() {
                    tracing::error!(
                        "Cannot access protected route: {}, redirecting ..",
                        req.path()
                    );
                    let response = HttpResponse::TemporaryRedirect()
                        .insert_header((header::LOCATION, "/"))
                        .finish();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }

            service.call(req).await.map(ServiceResponse::map_into_left_body)
        })
    }
}
