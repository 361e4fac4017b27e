//! MongoDB access layer.
//!
//! One repository instance wraps the shared client and typed collection
//! handles; it is cloned into the application state and passed by reference
//! everywhere. Multi-document flows (checkout, cancellation) go through the
//! `*_session` variants so the caller can wrap them in one transaction.

use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, Bson, DateTime, Document};
use mongodb::options::{
    CollectionOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
    UpdateOptions,
};
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};
use std::collections::HashMap;
use store_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    CartItem, Order, OrderCancellation, OrderStatus, PaymentStatus, PaymentTransaction, Product,
    StatusHistoryEntry, User, WishlistItem,
};

fn bson_err(e: mongodb::bson::ser::Error) -> AppError {
    AppError::InternalError(anyhow::anyhow!("BSON serialization error: {}", e))
}

#[derive(Clone)]
pub struct StoreRepository {
    client: Client,
    users: Collection<User>,
    products: Collection<Product>,
    orders: Collection<Order>,
    transactions: Collection<PaymentTransaction>,
    cancellations: Collection<OrderCancellation>,
    cart_items: Collection<CartItem>,
    wishlist_items: Collection<WishlistItem>,
}

impl StoreRepository {
    pub fn new(client: &Client, db: &Database) -> Self {
        // Every filter in this module compares `_id`/`user_id` against
        // `Uuid::to_string()`, so documents must store uuids as strings,
        // not BSON binary.
        let options = CollectionOptions::builder()
            .human_readable_serialization(true)
            .build();
        Self {
            client: client.clone(),
            users: db.collection_with_options("users", options.clone()),
            products: db.collection_with_options("products", options.clone()),
            orders: db.collection_with_options("orders", options.clone()),
            transactions: db.collection_with_options("transactions", options.clone()),
            cancellations: db.collection_with_options("order_cancellations", options.clone()),
            cart_items: db.collection_with_options("cart_items", options.clone()),
            wishlist_items: db.collection_with_options("wishlist_items", options),
        }
    }

    /// Create the indexes the storefront relies on. The unique index on
    /// `order_cancellations.order_id` backs the once-per-order audit
    /// guarantee; the rest serve the hot query paths.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let unique = |name: &str| {
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build()
        };

        self.cancellations
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "order_id": 1 })
                    .options(unique("unique_cancellation_per_order_idx"))
                    .build()],
                None,
            )
            .await?;

        self.orders
            .create_indexes(
                [
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "created_at": -1 })
                        .options(
                            IndexOptions::builder()
                                .name("user_orders_idx".to_string())
                                .build(),
                        )
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "status": 1, "created_at": -1 })
                        .options(
                            IndexOptions::builder()
                                .name("status_orders_idx".to_string())
                                .build(),
                        )
                        .build(),
                ],
                None,
            )
            .await?;

        self.transactions
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "order_id": 1 })
                    .options(unique("transaction_per_order_idx"))
                    .build()],
                None,
            )
            .await?;

        self.cart_items
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "user_id": 1, "product_id": 1, "size": 1, "color": 1 })
                    .options(unique("cart_line_idx"))
                    .build()],
                None,
            )
            .await?;

        self.wishlist_items
            .create_indexes(
                [IndexModel::builder()
                    .keys(doc! { "user_id": 1, "product_id": 1 })
                    .options(unique("wishlist_line_idx"))
                    .build()],
                None,
            )
            .await?;

        tracing::info!("storefront indexes initialized");
        Ok(())
    }

    pub async fn start_session(&self) -> Result<ClientSession, AppError> {
        Ok(self.client.start_session(None).await?)
    }

    // ==================== Users ====================

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert_one(user, None).await?;
        Ok(())
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.find_one(doc! { "_id": id.to_string() }, None).await?)
    }

    pub async fn users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>, AppError> {
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let cursor = self
            .users
            .find(doc! { "_id": { "$in": ids } }, None)
            .await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    /// Ids of users whose email matches the search term (case-insensitive
    /// substring). Used by the admin order search.
    pub async fn user_ids_matching_email(&self, term: &str) -> Result<Vec<String>, AppError> {
        let cursor = self
            .users
            .find(
                doc! { "email": { "$regex": regex_escape(term), "$options": "i" } },
                None,
            )
            .await?;
        let users: Vec<User> = cursor.try_collect().await?;
        Ok(users.into_iter().map(|u| u.id.to_string()).collect())
    }

    // ==================== Products ====================

    pub async fn insert_product(&self, product: &Product) -> Result<(), AppError> {
        self.products.insert_one(product, None).await?;
        Ok(())
    }

    pub async fn find_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self
            .products
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?)
    }

    /// Atomically restore `quantity` units of stock and return the updated
    /// product. `$inc` keeps concurrent restorations commutative.
    pub async fn restore_inventory_session(
        &self,
        product_id: Uuid,
        quantity: i64,
        session: &mut ClientSession,
    ) -> Result<Option<Product>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .products
            .find_one_and_update_with_session(
                doc! { "_id": product_id.to_string() },
                doc! {
                    "$inc": { "inventory": quantity },
                    "$set": { "updated_at": DateTime::now() }
                },
                options,
                session,
            )
            .await?)
    }

    /// Atomically take `quantity` units of stock, guarded so inventory never
    /// goes negative. Returns `None` when stock is insufficient.
    pub async fn reserve_inventory_session(
        &self,
        product_id: Uuid,
        quantity: i64,
        session: &mut ClientSession,
    ) -> Result<Option<Product>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .products
            .find_one_and_update_with_session(
                doc! {
                    "_id": product_id.to_string(),
                    "inventory": { "$gte": quantity }
                },
                doc! {
                    "$inc": { "inventory": -quantity },
                    "$set": { "updated_at": DateTime::now() }
                },
                options,
                session,
            )
            .await?)
    }

    // ==================== Orders ====================

    pub async fn insert_order(&self, order: &Order) -> Result<(), AppError> {
        self.orders.insert_one(order, None).await?;
        Ok(())
    }

    pub async fn insert_order_session(
        &self,
        order: &Order,
        session: &mut ClientSession,
    ) -> Result<(), AppError> {
        self.orders
            .insert_one_with_session(order, None, session)
            .await?;
        Ok(())
    }

    pub async fn find_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self
            .orders
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?)
    }

    pub async fn find_order_session(
        &self,
        id: Uuid,
        session: &mut ClientSession,
    ) -> Result<Option<Order>, AppError> {
        Ok(self
            .orders
            .find_one_with_session(doc! { "_id": id.to_string() }, None, session)
            .await?)
    }

    pub async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self
            .orders
            .find(doc! { "user_id": user_id.to_string() }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Admin status update: set the status (and notes when given) and append
    /// one history entry, as a single document write. Unless the target is
    /// CANCELLED itself, the filter excludes cancelled orders, so a
    /// cancellation that commits between the caller's read and this write
    /// cannot be overwritten.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
        admin_notes: Option<&str>,
        entry: &StatusHistoryEntry,
    ) -> Result<bool, AppError> {
        let mut filter = doc! { "_id": order_id.to_string() };
        if status != OrderStatus::Cancelled {
            filter.insert(
                "status",
                doc! { "$ne": OrderStatus::Cancelled.as_str() },
            );
        }

        let mut set = doc! {
            "status": status.as_str(),
            "updated_at": DateTime::now(),
        };
        if let Some(notes) = admin_notes {
            set.insert("admin_notes", notes);
        }
        let update = doc! {
            "$set": set,
            "$push": { "status_history": to_bson(entry).map_err(bson_err)? },
        };
        let result = self.orders.update_one(filter, update, None).await?;
        Ok(result.matched_count > 0)
    }

    /// Conditional cancellation write. The status guard is part of the
    /// filter, so under the transaction's isolation a racing cancellation
    /// matches zero documents instead of double-cancelling.
    pub async fn mark_order_cancelled_session(
        &self,
        order_id: Uuid,
        reason: &str,
        entry: &StatusHistoryEntry,
        session: &mut ClientSession,
    ) -> Result<bool, AppError> {
        let cancellable: Vec<&str> = [OrderStatus::Pending, OrderStatus::Processing]
            .iter()
            .map(OrderStatus::as_str)
            .collect();
        let result = self
            .orders
            .update_one_with_session(
                doc! {
                    "_id": order_id.to_string(),
                    "status": { "$in": cancellable },
                },
                doc! {
                    "$set": {
                        "status": OrderStatus::Cancelled.as_str(),
                        "cancellation_reason": reason,
                        "updated_at": DateTime::now(),
                    },
                    "$push": { "status_history": to_bson(entry).map_err(bson_err)? },
                },
                None,
                session,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    pub async fn count_orders(&self, filter: Document) -> Result<u64, AppError> {
        Ok(self.orders.count_documents(filter, None).await?)
    }

    pub async fn list_orders(
        &self,
        filter: Document,
        skip: u64,
        limit: i64,
    ) -> Result<Vec<Order>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit)
            .build();
        let cursor = self.orders.find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    // ==================== Payment transactions ====================

    pub async fn insert_transaction(
        &self,
        transaction: &PaymentTransaction,
    ) -> Result<(), AppError> {
        self.transactions.insert_one(transaction, None).await?;
        Ok(())
    }

    pub async fn find_transaction_for_order_session(
        &self,
        order_id: Uuid,
        session: &mut ClientSession,
    ) -> Result<Option<PaymentTransaction>, AppError> {
        Ok(self
            .transactions
            .find_one_with_session(doc! { "order_id": order_id.to_string() }, None, session)
            .await?)
    }

    pub async fn mark_transaction_refunded_session(
        &self,
        transaction_id: Uuid,
        session: &mut ClientSession,
    ) -> Result<(), AppError> {
        self.transactions
            .update_one_with_session(
                doc! { "_id": transaction_id.to_string() },
                doc! {
                    "$set": {
                        "status": to_bson(&PaymentStatus::Refunded).map_err(bson_err)?,
                        "updated_at": DateTime::now(),
                    }
                },
                None,
                session,
            )
            .await?;
        Ok(())
    }

    // ==================== Cancellations ====================

    pub async fn insert_cancellation_session(
        &self,
        cancellation: &OrderCancellation,
        session: &mut ClientSession,
    ) -> Result<(), AppError> {
        self.cancellations
            .insert_one_with_session(cancellation, None, session)
            .await?;
        Ok(())
    }

    pub async fn count_cancellations_for_order(&self, order_id: Uuid) -> Result<u64, AppError> {
        Ok(self
            .cancellations
            .count_documents(doc! { "order_id": order_id.to_string() }, None)
            .await?)
    }

    // ==================== Cart ====================

    /// Insert-or-merge a cart line keyed by (user, product, size, color).
    /// An existing line gets its quantity bumped; a new one is created by
    /// the upsert.
    pub async fn upsert_cart_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i64,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Result<(), AppError> {
        let now = DateTime::now();
        let filter = doc! {
            "user_id": user_id.to_string(),
            "product_id": product_id.to_string(),
            "size": size.map(Bson::from).unwrap_or(Bson::Null),
            "color": color.map(Bson::from).unwrap_or(Bson::Null),
        };
        let update = doc! {
            "$inc": { "quantity": quantity },
            "$set": { "updated_at": now },
            "$setOnInsert": {
                "_id": Uuid::new_v4().to_string(),
                "created_at": now,
            },
        };
        let options = UpdateOptions::builder().upsert(true).build();
        self.cart_items.update_one(filter, update, options).await?;
        Ok(())
    }

    pub async fn cart_items_for_user(&self, user_id: Uuid) -> Result<Vec<CartItem>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();
        let cursor = self
            .cart_items
            .find(doc! { "user_id": user_id.to_string() }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_cart_item(&self, id: Uuid) -> Result<Option<CartItem>, AppError> {
        Ok(self
            .cart_items
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?)
    }

    pub async fn set_cart_item_quantity(&self, id: Uuid, quantity: i64) -> Result<(), AppError> {
        self.cart_items
            .update_one(
                doc! { "_id": id.to_string() },
                doc! { "$set": { "quantity": quantity, "updated_at": DateTime::now() } },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn delete_cart_item(&self, id: Uuid) -> Result<bool, AppError> {
        let result = self
            .cart_items
            .delete_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), AppError> {
        self.cart_items
            .delete_many(doc! { "user_id": user_id.to_string() }, None)
            .await?;
        Ok(())
    }

    pub async fn clear_cart_session(
        &self,
        user_id: Uuid,
        session: &mut ClientSession,
    ) -> Result<(), AppError> {
        self.cart_items
            .delete_many_with_session(doc! { "user_id": user_id.to_string() }, None, session)
            .await?;
        Ok(())
    }

    // ==================== Wishlist ====================

    /// Unique index on (user, product) turns duplicates into `Conflict`.
    pub async fn insert_wishlist_item(&self, item: &WishlistItem) -> Result<(), AppError> {
        self.wishlist_items.insert_one(item, None).await?;
        Ok(())
    }

    pub async fn wishlist_for_user(&self, user_id: Uuid) -> Result<Vec<WishlistItem>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self
            .wishlist_items
            .find(doc! { "user_id": user_id.to_string() }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn delete_wishlist_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = self
            .wishlist_items
            .delete_one(
                doc! {
                    "user_id": user_id.to_string(),
                    "product_id": product_id.to_string(),
                },
                None,
            )
            .await?;
        Ok(result.deleted_count > 0)
    }
}

/// Escape a user-supplied search term for use inside `$regex`.
pub(crate) fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::regex_escape;

    #[test]
    fn regex_escape_neutralizes_metacharacters() {
        assert_eq!(regex_escape("a.b+c"), "a\\.b\\+c");
        assert_eq!(regex_escape("plain"), "plain");
        assert_eq!(regex_escape("x(y)$"), "x\\(y\\)\\$");
    }
}
