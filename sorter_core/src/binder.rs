//! Package-to-cart binding at package creation time.

use std::sync::Arc;

use crate::error::{ArgumentError, BindError};
use crate::resolver::CartAtChuteResolver;

/// Thin façade over the resolver for the package creation call site.
/// Stateless: never mutates ring or chute state.
#[derive(Debug, Clone)]
pub struct PackageCartBinder {
    resolver: Arc<CartAtChuteResolver>,
}

impl PackageCartBinder {
    pub fn new(resolver: Arc<CartAtChuteResolver>) -> Self {
        Self { resolver }
    }

    /// Cart number the new package will ride on to reach `chute_id`.
    pub fn bind_cart_for_new_package(
        &self,
        package_id: &str,
        chute_id: u32,
    ) -> Result<i32, BindError> {
        if package_id.trim().is_empty() {
            return Err(ArgumentError::EmptyPackageId.into());
        }
        match self.resolver.resolve_current_cart_number_for_chute(chute_id) {
            Ok(cart) => {
                tracing::debug!(package_id, chute_id, cart, "package bound to cart");
                Ok(cart)
            }
            Err(source) if source.is_not_ready() => Err(BindError::CartStateNotReady {
                package_id: package_id.to_owned(),
                chute_id,
                source,
            }),
            Err(source) => {
                tracing::error!(package_id, chute_id, error = %source, "cart binding failed");
                Err(BindError::Unexpected {
                    package_id: package_id.to_owned(),
                    chute_id,
                    source,
                })
            }
        }
    }
}
