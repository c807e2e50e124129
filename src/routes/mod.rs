/// Router Module Index
///
/// Routes are split by access level and merged in `create_router`. Authentication is
/// applied to a whole module through a route layer, so a handler added to
/// `authenticated` can never be reached anonymously by accident. Finer-grained,
/// role- and ownership-based checks live in the `policy` module.

/// Routes reachable without a token.
pub mod public;

/// Routes behind the `AuthenticatedActor` route layer.
pub mod authenticated;
