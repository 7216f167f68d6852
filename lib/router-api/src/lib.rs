//! Datum Router API types shared by the version routing control plane
//!
//! This library defines:
//! - ApiDefinition: the title, version and vhost of a deployed API
//! - Route: a data-plane route with its match regex and optional path rewrite
//! - RouteRegex: the capability the control plane needs to rewrite a route in place
//! - LifecycleEvent: API create/update/delete notifications

pub mod api;
pub mod event;
pub mod route;

pub use api::ApiDefinition;
pub use event::LifecycleEvent;
pub use route::{RegexRewrite, Route, RouteAction, RouteMatch, RouteRegex};
