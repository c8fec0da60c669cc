use thiserror::Error;

use bazaar_core::{DomainError, UserId, VendorId};

use crate::Role;

/// A fully resolved actor for authorization decisions.
///
/// Built by the transport layer from the authenticated account; carries
/// no storage handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// What an operation asks permission to do.
///
/// Resource-scoped capabilities carry the ownership facts the decision needs,
/// so `authorize` never performs IO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability<'a> {
    PlaceOrder,
    ManageOwnAccount,
    RegisterVendor,
    /// `/vendors/me` surface and product creation.
    ManageCatalog,
    ViewVendorOrders,
    Administer,
    /// Customer cancellation; only the order owner, whatever their role.
    CancelOrder { owner: UserId },
    ViewOrder {
        owner: UserId,
        vendors: &'a [VendorId],
        actor_vendor: Option<VendorId>,
    },
    UpdateOrderStatus {
        vendors: &'a [VendorId],
        actor_vendor: Option<VendorId>,
    },
    EditProduct {
        product_vendor: VendorId,
        actor_vendor: Option<VendorId>,
    },
}

impl Capability<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::PlaceOrder => "orders.place",
            Capability::ManageOwnAccount => "account.manage",
            Capability::RegisterVendor => "vendors.register",
            Capability::ManageCatalog => "catalog.manage",
            Capability::ViewVendorOrders => "orders.vendor.read",
            Capability::Administer => "admin",
            Capability::CancelOrder { .. } => "orders.cancel",
            Capability::ViewOrder { .. } => "orders.read",
            Capability::UpdateOrderStatus { .. } => "orders.status.write",
            Capability::EditProduct { .. } => "catalog.product.write",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("User role '{role}' is not authorized to access this route")]
    RoleDenied { role: Role },

    #[error("Not authorized to {0}")]
    NotOwner(&'static str),
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// Decide whether `actor` may exercise `capability`.
///
/// - No IO
/// - No panics
/// - Pure function of the actor's role and the ownership facts supplied
pub fn authorize(actor: &Actor, capability: &Capability<'_>) -> Result<(), AuthzError> {
    let role_denied = || AuthzError::RoleDenied { role: actor.role };

    match *capability {
        Capability::PlaceOrder | Capability::ManageOwnAccount | Capability::RegisterVendor => Ok(()),

        Capability::ManageCatalog | Capability::ViewVendorOrders => match actor.role {
            Role::Vendor | Role::Admin => Ok(()),
            Role::User => Err(role_denied()),
        },

        Capability::Administer => {
            if actor.is_admin() {
                Ok(())
            } else {
                Err(role_denied())
            }
        }

        Capability::CancelOrder { owner } => {
            if owner == actor.user_id {
                Ok(())
            } else {
                Err(AuthzError::NotOwner("cancel this order"))
            }
        }

        Capability::ViewOrder {
            owner,
            vendors,
            actor_vendor,
        } => {
            if actor.is_admin() || owner == actor.user_id || holds_any(actor, vendors, actor_vendor) {
                Ok(())
            } else {
                Err(AuthzError::NotOwner("view this order"))
            }
        }

        Capability::UpdateOrderStatus {
            vendors,
            actor_vendor,
        } => match actor.role {
            Role::Admin => Ok(()),
            Role::Vendor if holds_any(actor, vendors, actor_vendor) => Ok(()),
            Role::Vendor => Err(AuthzError::NotOwner("update this order")),
            Role::User => Err(role_denied()),
        },

        Capability::EditProduct {
            product_vendor,
            actor_vendor,
        } => match actor.role {
            Role::Admin => Ok(()),
            Role::Vendor if actor_vendor == Some(product_vendor) => Ok(()),
            Role::Vendor => Err(AuthzError::NotOwner("update this product")),
            Role::User => Err(role_denied()),
        },
    }
}

fn holds_any(actor: &Actor, vendors: &[VendorId], actor_vendor: Option<VendorId>) -> bool {
    actor.role == Role::Vendor && actor_vendor.is_some_and(|v| vendors.contains(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor::new(UserId::new(), role)
    }

    #[test]
    fn role_scoped_capabilities() {
        assert!(authorize(&actor(Role::User), &Capability::PlaceOrder).is_ok());
        assert!(authorize(&actor(Role::User), &Capability::ManageCatalog).is_err());
        assert!(authorize(&actor(Role::Vendor), &Capability::ManageCatalog).is_ok());
        assert!(authorize(&actor(Role::Vendor), &Capability::Administer).is_err());
        assert!(authorize(&actor(Role::Admin), &Capability::Administer).is_ok());
        assert!(authorize(&actor(Role::Admin), &Capability::ViewVendorOrders).is_ok());
    }

    #[test]
    fn role_denial_message_names_the_role() {
        let err = authorize(&actor(Role::User), &Capability::Administer).unwrap_err();
        assert_eq!(err.to_string(), "User role 'user' is not authorized to access this route");
        assert!(matches!(DomainError::from(err), DomainError::Forbidden(_)));
    }

    #[test]
    fn only_owner_may_cancel() {
        let owner = actor(Role::User);
        let cap = Capability::CancelOrder { owner: owner.user_id };
        assert!(authorize(&owner, &cap).is_ok());
        assert!(authorize(&actor(Role::User), &cap).is_err());
        assert!(authorize(&actor(Role::Admin), &cap).is_err());
    }

    #[test]
    fn vendor_status_update_requires_a_line_item() {
        let mine = VendorId::new();
        let theirs = VendorId::new();
        let vendor = actor(Role::Vendor);

        let in_order = [mine, theirs];
        let not_in_order = [theirs];

        assert!(authorize(
            &vendor,
            &Capability::UpdateOrderStatus { vendors: &in_order, actor_vendor: Some(mine) }
        )
        .is_ok());
        assert!(authorize(
            &vendor,
            &Capability::UpdateOrderStatus { vendors: &not_in_order, actor_vendor: Some(mine) }
        )
        .is_err());
        assert!(authorize(
            &vendor,
            &Capability::UpdateOrderStatus { vendors: &in_order, actor_vendor: None }
        )
        .is_err());
        assert!(authorize(
            &actor(Role::Admin),
            &Capability::UpdateOrderStatus { vendors: &not_in_order, actor_vendor: None }
        )
        .is_ok());
    }

    #[test]
    fn order_visible_to_owner_vendor_and_admin() {
        let owner = actor(Role::User);
        let vendor = actor(Role::Vendor);
        let vendor_id = VendorId::new();
        let vendors = [vendor_id];
        let cap = |actor_vendor| Capability::ViewOrder {
            owner: owner.user_id,
            vendors: &vendors,
            actor_vendor,
        };

        assert!(authorize(&owner, &cap(None)).is_ok());
        assert!(authorize(&vendor, &cap(Some(vendor_id))).is_ok());
        assert!(authorize(&vendor, &cap(Some(VendorId::new()))).is_err());
        assert!(authorize(&actor(Role::User), &cap(None)).is_err());
        assert!(authorize(&actor(Role::Admin), &cap(None)).is_ok());
    }

    #[test]
    fn product_edit_limited_to_owning_vendor() {
        let owned = VendorId::new();
        let vendor = actor(Role::Vendor);
        let edit = |actor_vendor| Capability::EditProduct {
            product_vendor: owned,
            actor_vendor,
        };

        assert!(authorize(&vendor, &edit(Some(owned))).is_ok());
        assert!(authorize(&vendor, &edit(Some(VendorId::new()))).is_err());
        assert!(authorize(&actor(Role::User), &edit(None)).is_err());
        assert!(authorize(&actor(Role::Admin), &edit(None)).is_ok());
    }
}
