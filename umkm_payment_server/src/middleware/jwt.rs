//! Bearer token middleware.
//!
//! Reads the `Authorization: Bearer <token>` header, verifies the token and stores the resulting [`JwtClaims`] in the
//! request extensions, where handlers and the [ACL middleware](super::AclMiddlewareFactory) pick them up. Requests
//! without a valid token are answered with a 401 and never reach the wrapped service.
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;

use crate::{
    auth::{JwtClaims, TokenVerifier},
    errors::{AuthError, ServerError},
};

pub struct JwtMiddlewareFactory {
    verifier: TokenVerifier,
}

impl JwtMiddlewareFactory {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(JwtMiddlewareService { verifier: self.verifier.clone(), service: Rc::new(service) })
    }
}

pub struct JwtMiddlewareService<S> {
    verifier: TokenVerifier,
    service: Rc<S>,
}

fn bearer_token(req: &ServiceRequest) -> Result<&str, AuthError> {
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::ValidationError(e.to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::ValidationError("Expected a bearer token".to_string()))
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let claims = bearer_token(&req).and_then(|token| self.verifier.verify(token));
        Box::pin(async move {
            match claims {
                Ok(claims) => {
                    trace!("🔐️ Request to {} authenticated for user #{} ({})", req.path(), claims.sub, claims.role);
                    req.extensions_mut().insert::<JwtClaims>(claims);
                    service.call(req).await.map(ServiceResponse::map_into_left_body)
                },
                Err(e) => {
                    debug!("🔐️ Unauthenticated request to {}. {e}", req.path());
                    let err = ServerError::AuthenticationError(e);
                    Ok(req.error_response(err).map_into_right_body())
                },
            }
        })
    }
}
