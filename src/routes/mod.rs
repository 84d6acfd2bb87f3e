/// Router Module Index
///
/// Routes are grouped by who is meant to reach them. The grouping is documentary:
/// access is enforced by the route guard middleware evaluating the configured
/// `RoutePolicy`, so it keeps working when route lists are changed through the
/// environment.

/// Routes accessible to everyone (landing page, health, session snapshot).
pub mod public;

/// Pages and endpoints for visitors without a session (sign-in, sign-up).
pub mod guest;

/// Routes that need a signed-in user.
pub mod authenticated;
