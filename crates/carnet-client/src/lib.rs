//! Carnet client library
//!
//! Client side of the Carnet blog service.
//!
//! This crate provides:
//! - Session manager with silent re-authentication on launch
//! - Capability resolver for owner/admin gated actions
//! - REST transport attaching the bearer token to every request
//! - Persistent single-slot token store

pub mod capability;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod token_store;

pub use capability::{can_publish, can_view_admin_area, navigation, Capabilities, NavItem, Owned};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use models::{
    Article, ArticleUpdate, AuthorRef, Category, Comment, Identity, LoginResponse, NewArticle, Role,
    UserSummary,
};
pub use session::{IdentityProvider, SessionManager, SessionState};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
