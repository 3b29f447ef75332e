//! Route-level authorization.
//!
//! A [`Requirement`] names the strongest check a route needs. Checking it
//! always walks the same ladder, so a permission check can never run before
//! the authenticated and activated checks:
//!
//! ```text
//! Authenticated ⊂ Activated ⊂ Permission(code)
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::security::principal::Principal;
use crate::store::PermissionStore;

/// The strongest check a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Activated,
    Permission(&'static str),
}

impl Requirement {
    /// Run every check up to and including this one, in order.
    pub async fn check(
        self,
        principal: &Principal,
        permissions: &dyn PermissionStore,
    ) -> Result<(), ApiError> {
        let user = principal.user().ok_or(ApiError::AuthenticationRequired)?;
        if self == Self::Authenticated {
            return Ok(());
        }

        if !user.activated {
            return Err(ApiError::AccountInactive);
        }
        let Self::Permission(code) = self else {
            return Ok(());
        };

        let granted = permissions
            .get_all_for_user(user.id)
            .await
            .map_err(ApiError::system)?;
        if granted.includes(code) {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied)
        }
    }
}

/// Middleware state for one route's requirement.
#[derive(Clone)]
pub struct Gate {
    requirement: Requirement,
    permissions: Arc<dyn PermissionStore>,
}

impl Gate {
    pub fn new(requirement: Requirement, permissions: Arc<dyn PermissionStore>) -> Self {
        Self {
            requirement,
            permissions,
        }
    }
}

/// Middleware: enforce the gate's requirement for the attached principal.
pub async fn authorize(State(gate): State<Gate>, request: Request, next: Next) -> Response {
    let Some(principal) = request.extensions().get::<Principal>() else {
        return ApiError::system("missing principal in request context").into_response();
    };

    let verdict = gate
        .requirement
        .check(principal, gate.permissions.as_ref())
        .await;
    match verdict {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
