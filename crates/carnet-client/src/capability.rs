//! Capability resolution.
//!
//! Edit is owner-only. Delete is owner-or-admin. The admin area is
//! admin-only. Nothing is granted without a signed-in user.

use crate::models::{Article, Comment, Identity};

/// Something with an owning user.
pub trait Owned {
    /// Id of the owner, `None` when the owner is unknown.
    fn owner_id(&self) -> Option<&str>;
}

impl Owned for Article {
    fn owner_id(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.id.as_str())
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.id.as_str())
    }
}

/// Bare owner id, for callers holding only the id.
impl Owned for str {
    fn owner_id(&self) -> Option<&str> {
        Some(self)
    }
}

/// Actions allowed on one resource for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_view_admin_area: bool,
}

impl Capabilities {
    /// Resolve capabilities of `user` on `resource`.
    pub fn resolve<R: Owned + ?Sized>(user: Option<&Identity>, resource: &R) -> Self {
        let Some(user) = user else {
            return Self::default();
        };

        let is_admin = user.is_admin();
        let can_edit = resource.owner_id() == Some(user.id.as_str());

        Self {
            can_edit,
            can_delete: can_edit || is_admin,
            can_view_admin_area: is_admin,
        }
    }
}

/// Whether `user` may view the admin area.
pub fn can_view_admin_area(user: Option<&Identity>) -> bool {
    user.is_some_and(Identity::is_admin)
}

/// Whether `user` may publish articles and comments.
pub fn can_publish(user: Option<&Identity>) -> bool {
    user.is_some()
}

/// Entry of the header menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Home,
    Admin,
    Register,
    Login,
    Logout,
}

impl NavItem {
    pub fn label(self) -> &'static str {
        match self {
            NavItem::Home => "Accueil",
            NavItem::Admin => "Administration",
            NavItem::Register => "Inscription",
            NavItem::Login => "Connexion",
            NavItem::Logout => "Déconnexion",
        }
    }
}

/// Header menu for `user`, in display order.
pub fn navigation(user: Option<&Identity>) -> Vec<NavItem> {
    let mut items = vec![NavItem::Home];
    if can_view_admin_area(user) {
        items.push(NavItem::Admin);
    }
    match user {
        None => items.extend([NavItem::Register, NavItem::Login]),
        Some(_) => items.push(NavItem::Logout),
    }
    items
}
