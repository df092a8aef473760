/// Router Module Index
///
/// Splits the storefront's HTTP routes by who may call them. Access control itself is
/// not applied here: every request passes the access gate (`gate::access_gate`), which
/// redirects anonymous callers to the login page unless the path is public. The split
/// mirrors the gate's default public set so a reader can see at a glance what is open.

/// The named route table used for view-name resolution and reversing.
pub mod table;

/// Views reachable without a session.
pub mod public;

/// Views that need a session.
pub mod authenticated;

/// The artisan portal, nested under `/artisan`. Handlers send buyers back home.
pub mod artisan;
