use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use bazaar_core::{OrderId, ProductId, UserId, VendorId, newest_first};
use bazaar_parties::{User, UserQuery, Vendor, VendorQuery, normalize_email};
use bazaar_products::{Product, ProductQuery};
use bazaar_sales::{Order, OrderQuery};

use super::{Store, StoreError, UnitOfWork};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<UserId, User>,
    vendors: HashMap<VendorId, Vendor>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory store for tests/dev.
///
/// One async mutex guards every collection. A unit of work holds the guard
/// until it is committed or dropped, so units of work are fully serialized;
/// plain reads queue behind them and never observe staged writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted<T: bazaar_core::Entity>(mut records: Vec<T>) -> Vec<T> {
    newest_first(&mut records);
    records
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.inner.clone().lock_owned().await;
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            users: Staged::default(),
            vendors: Staged::default(),
            products: Staged::default(),
            orders: Staged::default(),
        }))
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let data = self.inner.lock().await;
        Ok(data.users.values().find(|u| u.email == email).cloned())
    }

    async fn users(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let data = self.inner.lock().await;
        Ok(sorted(data.users.values().filter(|u| query.matches(u)).cloned().collect()))
    }

    async fn vendor(&self, id: VendorId) -> Result<Option<Vendor>, StoreError> {
        Ok(self.inner.lock().await.vendors.get(&id).cloned())
    }

    async fn vendor_by_user(&self, user_id: UserId) -> Result<Option<Vendor>, StoreError> {
        let data = self.inner.lock().await;
        Ok(data.vendors.values().find(|v| v.user_id == user_id).cloned())
    }

    async fn vendors(&self, query: &VendorQuery) -> Result<Vec<Vendor>, StoreError> {
        let data = self.inner.lock().await;
        Ok(sorted(data.vendors.values().filter(|v| query.matches(v)).cloned().collect()))
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.lock().await.products.get(&id).cloned())
    }

    async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let data = self.inner.lock().await;
        Ok(query.apply(data.products.values().cloned()))
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn orders(&self, query: &OrderQuery) -> Result<Vec<Order>, StoreError> {
        let data = self.inner.lock().await;
        Ok(sorted(data.orders.values().filter(|o| query.matches(o)).cloned().collect()))
    }
}

/// Pending writes for one collection; `None` marks a deletion.
#[derive(Debug)]
struct Staged<K, V>(HashMap<K, Option<V>>);

impl<K, V> Default for Staged<K, V> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<K: Copy + Eq + Hash, V: Clone> Staged<K, V> {
    fn get(&self, committed: &HashMap<K, V>, key: &K) -> Option<V> {
        match self.0.get(key) {
            Some(staged) => staged.clone(),
            None => committed.get(key).cloned(),
        }
    }

    /// Committed records overlaid with staged writes.
    fn view<'a>(&'a self, committed: &'a HashMap<K, V>) -> impl Iterator<Item = &'a V> + 'a {
        committed
            .iter()
            .filter(|(k, _)| !self.0.contains_key(*k))
            .map(|(_, v)| v)
            .chain(self.0.values().flatten())
    }

    fn apply(self, committed: &mut HashMap<K, V>) {
        for (key, value) in self.0 {
            match value {
                Some(v) => {
                    committed.insert(key, v);
                }
                None => {
                    committed.remove(&key);
                }
            }
        }
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Collections>,
    users: Staged<UserId, User>,
    vendors: Staged<VendorId, Vendor>,
    products: Staged<ProductId, Product>,
    orders: Staged<OrderId, Order>,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&self.guard.users, &id))
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .view(&self.guard.users)
            .find(|u| u.email == email)
            .cloned())
    }

    async fn vendor(&mut self, id: VendorId) -> Result<Option<Vendor>, StoreError> {
        Ok(self.vendors.get(&self.guard.vendors, &id))
    }

    async fn vendor_by_user(&mut self, user_id: UserId) -> Result<Option<Vendor>, StoreError> {
        Ok(self
            .vendors
            .view(&self.guard.vendors)
            .find(|v| v.user_id == user_id)
            .cloned())
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(&self.guard.products, &id))
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&self.guard.orders, &id))
    }

    async fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        let taken = self
            .users
            .view(&self.guard.users)
            .any(|u| u.id != user.id && u.email == user.email);
        if taken {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        self.users.0.insert(user.id, Some(user.clone()));
        Ok(())
    }

    async fn save_vendor(&mut self, vendor: &Vendor) -> Result<(), StoreError> {
        let taken = self
            .vendors
            .view(&self.guard.vendors)
            .any(|v| v.id != vendor.id && v.user_id == vendor.user_id);
        if taken {
            return Err(StoreError::Conflict(format!(
                "user {} already has a vendor profile",
                vendor.user_id
            )));
        }
        self.vendors.0.insert(vendor.id, Some(vendor.clone()));
        Ok(())
    }

    async fn save_product(&mut self, product: &Product) -> Result<(), StoreError> {
        self.products.0.insert(product.id, Some(product.clone()));
        Ok(())
    }

    async fn save_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.orders.0.insert(order.id, Some(order.clone()));
        Ok(())
    }

    async fn delete_user(&mut self, id: UserId) -> Result<(), StoreError> {
        self.users.0.insert(id, None);
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        self.products.0.insert(id, None);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self {
            mut guard,
            users,
            vendors,
            products,
            orders,
        } = *self;
        users.apply(&mut guard.users);
        vendors.apply(&mut guard.vendors);
        products.apply(&mut guard.products);
        orders.apply(&mut guard.orders);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use bazaar_auth::Role;
    use bazaar_parties::NewUser;

    use super::*;

    fn user(email: &str) -> User {
        User::register(
            NewUser {
                name: "Test".to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                phone: None,
                address: None,
                role: Role::User,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn commit_publishes_staged_writes() {
        let store = InMemoryStore::new();
        let u = user("a@example.com");

        let mut uow = store.begin().await.unwrap();
        uow.save_user(&u).await.unwrap();
        assert_eq!(uow.user(u.id).await.unwrap(), Some(u.clone()));
        uow.commit().await.unwrap();

        assert_eq!(store.user(u.id).await.unwrap(), Some(u));
    }

    #[tokio::test]
    async fn dropped_unit_of_work_discards_writes() {
        let store = InMemoryStore::new();
        let u = user("a@example.com");

        {
            let mut uow = store.begin().await.unwrap();
            uow.save_user(&u).await.unwrap();
        }

        assert_eq!(store.user(u.id).await.unwrap(), None);
        assert!(store.users(&UserQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.save_user(&user("dup@example.com")).await.unwrap();
        let err = uow.save_user(&user("DUP@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn staged_delete_hides_record_inside_unit() {
        let store = InMemoryStore::new();
        let u = user("gone@example.com");
        let mut uow = store.begin().await.unwrap();
        uow.save_user(&u).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.delete_user(u.id).await.unwrap();
        assert_eq!(uow.user(u.id).await.unwrap(), None);
        assert_eq!(uow.user_by_email("gone@example.com").await.unwrap(), None);
        uow.commit().await.unwrap();

        assert_eq!(store.user_by_email("gone@example.com").await.unwrap(), None);
    }
}
