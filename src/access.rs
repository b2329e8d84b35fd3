//! Annotate-capability gate. The engine only asks "may this visitor
//! annotate?"; who keeps the allow-list and how tokens travel is the
//! host's business.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Opaque precondition consumed at mount time: when false, the tool UI
/// never mounts at all.
pub trait AnnotateAccess: Send + Sync {
    fn can_annotate(&self) -> bool;
}

/// Fixed answer, for hosts that resolve access server-side.
#[derive(Debug, Clone, Copy)]
pub struct StaticAccess(pub bool);

impl AnnotateAccess for StaticAccess {
    fn can_annotate(&self) -> bool {
        self.0
    }
}

/// Who is looking at the page right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visitor {
    SignedIn { user_id: String },
    Guest { token: Option<String> },
}

/// Reference policy: signed-in visitors must be on the allow-list,
/// guests must present the currently valid token while guest access is
/// enabled. Regenerating the token invalidates every outstanding link.
pub struct AccessPolicy {
    allow_list: Mutex<HashSet<String>>,
    guest_enabled: Mutex<bool>,
    guest_token: Mutex<Option<String>>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self {
            allow_list: Mutex::new(HashSet::new()),
            guest_enabled: Mutex::new(false),
            guest_token: Mutex::new(None),
        }
    }

    pub fn allow_user(&self, user_id: &str) {
        self.allow_list.lock().unwrap().insert(user_id.to_string());
    }

    pub fn revoke_user(&self, user_id: &str) {
        self.allow_list.lock().unwrap().remove(user_id);
    }

    pub fn set_guest_access(&self, enabled: bool) {
        *self.guest_enabled.lock().unwrap() = enabled;
    }

    pub fn regenerate_guest_token(&self) -> String {
        let token = Uuid::new_v4().to_string();
        *self.guest_token.lock().unwrap() = Some(token.clone());
        token
    }

    /// Shareable page link carrying the current token; mints one on
    /// first use.
    pub fn guest_url(&self, page_url: &str, guest_param: &str) -> String {
        let token = {
            let mut guard = self.guest_token.lock().unwrap();
            guard
                .get_or_insert_with(|| Uuid::new_v4().to_string())
                .clone()
        };
        let joiner = if page_url.contains('?') { '&' } else { '?' };
        format!("{page_url}{joiner}{guest_param}={token}")
    }

    pub fn check(&self, visitor: &Visitor) -> bool {
        match visitor {
            Visitor::SignedIn { user_id } => self.allow_list.lock().unwrap().contains(user_id),
            Visitor::Guest { token } => {
                if !*self.guest_enabled.lock().unwrap() {
                    return false;
                }
                let stored = self.guest_token.lock().unwrap();
                matches!((stored.as_deref(), token.as_deref()),
                    (Some(stored), Some(provided)) if stored == provided)
            }
        }
    }

    /// Bind the policy to one visitor, producing the opaque gate the
    /// tool consumes.
    pub fn for_visitor(self: &Arc<Self>, visitor: Visitor) -> VisitorAccess {
        VisitorAccess {
            policy: Arc::clone(self),
            visitor,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new()
    }
}

pub struct VisitorAccess {
    policy: Arc<AccessPolicy>,
    visitor: Visitor,
}

impl AnnotateAccess for VisitorAccess {
    fn can_annotate(&self) -> bool {
        self.policy.check(&self.visitor)
    }
}
