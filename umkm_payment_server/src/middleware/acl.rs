//! Role-based access control middleware.
//!
//! Place it on any route or scope that sits behind the [JWT middleware](super::JwtMiddlewareFactory). The role in the
//! request's claims must be one of the roles the route allows, otherwise a 403 Forbidden response is returned.

use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::{ok, Ready};
use log::*;
use umkm_payment_engine::db_types::Role;

use crate::{
    auth::JwtClaims,
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    allowed_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(allowed_roles: &[Role]) -> Self {
        AclMiddlewareFactory { allowed_roles: allowed_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AclMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AclMiddlewareService { allowed_roles: self.allowed_roles.clone(), service: Rc::new(service) })
    }
}

pub struct AclMiddlewareService<S> {
    allowed_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
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
        let role = req.extensions().get::<JwtClaims>().map(|c| c.role);
        let check = match role {
            None => {
                warn!("🔐️ No JWT claims found in request extensions. Is the route behind the JWT middleware?");
                Err(AuthError::MissingToken)
            },
            Some(role) if self.allowed_roles.contains(&role) => Ok(()),
            Some(role) => Err(AuthError::InsufficientPermissions(format!("{role} may not access this resource"))),
        };
        Box::pin(async move {
            match check {
                Ok(()) => service.call(req).await.map(ServiceResponse::map_into_left_body),
                Err(e) => {
                    debug!("🔐️ Access to {} denied. {e}", req.path());
                    Ok(req.error_response(ServerError::AuthenticationError(e)).map_into_right_body())
                },
            }
        })
    }
}
