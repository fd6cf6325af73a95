/// Router Module Index
///
/// Routes are split by access level so that the authentication layer is applied to a
/// whole router at once in `create_router`, never endpoint by endpoint.

/// Routes accessible to anyone (read-only review access, health check).
pub mod public;

/// Review write routes. Wrapped in `auth::auth_middleware`, which authenticates the caller
/// and restricts writes to the 'user' and 'admin' roles.
pub mod authenticated;
