// src/services/pos_service.rs

use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::Product,
        sales::{PaymentMethod, Sale},
    },
    services::cart::{Cart, CartItem, CartTotals, SaleStore},
};

/// Uma sessão de caixa: o carrinho de um usuário dentro de uma empresa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterKey {
    pub company_id: Uuid,
    pub user_id: Uuid,
}

// O que o painel recebe após cada operação no carrinho
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub discount_percent: Decimal,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub checkout_pending: bool,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().to_vec(),
            discount_percent: cart.discount_percent(),
            totals: cart.totals(),
            checkout_pending: cart.checkout_in_flight(),
        }
    }
}

/// Carrinhos em memória, um por sessão de caixa. Somem quando o processo reinicia.
#[derive(Default)]
pub struct CartRegistry {
    carts: Arc<DashMap<RegisterKey, Cart>>,
}

impl CartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self, key: RegisterKey) -> CartView {
        self.carts
            .get(&key)
            .map(|cart| CartView::from(&*cart))
            .unwrap_or_else(|| CartView::from(&Cart::new()))
    }

    /// Aplica `f` ao carrinho, recusando alterações durante uma finalização.
    fn mutate(&self, key: RegisterKey, f: impl FnOnce(&mut Cart)) -> Result<CartView, AppError> {
        let mut cart = self.carts.entry(key).or_default();
        if cart.checkout_in_flight() {
            return Err(AppError::CheckoutInProgress);
        }
        f(&mut cart);
        Ok(CartView::from(&*cart))
    }

    pub fn add_item(&self, key: RegisterKey, product: &Product) -> Result<CartView, AppError> {
        self.mutate(key, |cart| cart.add_item(product))
    }

    pub fn update_quantity(&self, key: RegisterKey, product_id: Uuid, quantity: i32) -> Result<CartView, AppError> {
        self.mutate(key, |cart| cart.update_quantity(product_id, quantity))
    }

    pub fn remove_item(&self, key: RegisterKey, product_id: Uuid) -> Result<CartView, AppError> {
        self.mutate(key, |cart| cart.remove_item(product_id))
    }

    pub fn set_discount(&self, key: RegisterKey, discount_percent: Decimal) -> Result<CartView, AppError> {
        self.mutate(key, |cart| cart.set_discount(discount_percent))
    }

    pub fn clear(&self, key: RegisterKey) -> Result<(), AppError> {
        if let Some(cart) = self.carts.get(&key) {
            if cart.checkout_in_flight() {
                return Err(AppError::CheckoutInProgress);
            }
        }
        self.carts.remove(&key);
        Ok(())
    }

    /// Finaliza a venda da sessão.
    ///
    /// O carrinho do mapa fica marcado como pendente e uma cópia dele é
    /// finalizada numa tarefa própria, que segue até o fim mesmo se a
    /// requisição cair. Enquanto isso, outra finalização recebe `CheckoutInProgress`.
    pub async fn checkout(
        &self,
        key: RegisterKey,
        store: Arc<dyn SaleStore>,
        client_id: Option<Uuid>,
        payment_method: PaymentMethod,
    ) -> Result<Sale, AppError> {
        let mut session = {
            // Sem carrinho no mapa não há o que finalizar; nada é inserido
            let mut cart = self.carts.get_mut(&key).ok_or(AppError::EmptyCart)?;
            let snapshot = cart.clone();
            cart.begin_checkout(key.user_id, client_id, payment_method)?;
            snapshot
        };

        tracing::debug!(company_id = %key.company_id, total = %session.compute_total(), "Finalizando venda");

        let mut release = CheckoutRelease {
            carts: self.carts.clone(),
            key,
            succeeded: false,
        };
        let task = tokio::spawn(async move {
            let result = session
                .finalize(store.as_ref(), key.company_id, key.user_id, client_id, payment_method)
                .await;
            release.succeeded = result.is_ok();
            drop(release);
            result
        });

        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(AppError::InternalServerError(anyhow::anyhow!(
                "Tarefa de finalização interrompida: {}",
                e
            ))),
        };

        match &result {
            Ok(sale) => tracing::info!(
                company_id = %key.company_id,
                sale_id = %sale.id,
                total = %sale.total_amount,
                "Venda finalizada no PDV"
            ),
            Err(e) => tracing::warn!(company_id = %key.company_id, "Falha ao finalizar venda: {}", e),
        }

        result
    }
}

/// Fecha a finalização quando sai de escopo, inclusive em pânico ou abort.
/// Sucesso: o carrinho sai do mapa. Falha: os itens ficam para nova tentativa.
struct CheckoutRelease {
    carts: Arc<DashMap<RegisterKey, Cart>>,
    key: RegisterKey,
    succeeded: bool,
}

impl Drop for CheckoutRelease {
    fn drop(&mut self) {
        if self.succeeded {
            self.carts.remove(&self.key);
        } else if let Some(mut cart) = self.carts.get_mut(&self.key) {
            cart.finish_checkout(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sales::SaleDraft;
    use crate::services::cart::tests::{product, RecordingStore};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn key() -> RegisterKey {
        RegisterKey {
            company_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }

    /// Segura a criação da venda até `release` ser notificado.
    #[derive(Default)]
    struct GatedStore {
        entered: Notify,
        release: Notify,
        inner: RecordingStore,
    }

    #[async_trait]
    impl SaleStore for GatedStore {
        async fn create_sale(&self, company_id: Uuid, draft: SaleDraft) -> Result<Sale, AppError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.create_sale(company_id, draft).await
        }
    }

    struct PanickingStore;

    #[async_trait]
    impl SaleStore for PanickingStore {
        async fn create_sale(&self, _company_id: Uuid, _draft: SaleDraft) -> Result<Sale, AppError> {
            panic!("falha simulada no banco");
        }
    }

    // Espera a tarefa de finalização soltar o carrinho
    async fn wait_until_released(registry: &CartRegistry, k: RegisterKey) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while registry.view(k).checkout_pending {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("carrinho continuou travado");
    }

    #[test]
    fn sessions_are_isolated() {
        let registry = CartRegistry::new();
        let (a, b) = (key(), key());
        registry.add_item(a, &product(Decimal::TEN)).unwrap();

        assert_eq!(registry.view(a).items.len(), 1);
        assert!(registry.view(b).items.is_empty());
    }

    #[test]
    fn view_reports_totals() {
        let registry = CartRegistry::new();
        let k = key();
        let p = product(Decimal::TEN);
        registry.add_item(k, &p).unwrap();
        registry.update_quantity(k, p.id, 3).unwrap();
        let view = registry.set_discount(k, Decimal::from(50)).unwrap();

        assert_eq!(view.totals.subtotal, Decimal::from(30));
        assert_eq!(view.totals.total, Decimal::from(15));
        assert!(!view.checkout_pending);
    }

    #[tokio::test]
    async fn empty_cart_never_reaches_the_store() {
        let registry = CartRegistry::new();
        let store = Arc::new(RecordingStore::default());

        let err = registry
            .checkout(key(), store.clone(), None, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::EmptyCart));
        assert!(store.drafts.lock().unwrap().is_empty());
        assert!(registry.carts.is_empty());
    }

    #[tokio::test]
    async fn successful_checkout_drops_the_session_entry() {
        let registry = CartRegistry::new();
        let k = key();
        registry.add_item(k, &product(Decimal::TEN)).unwrap();

        registry
            .checkout(k, Arc::new(RecordingStore::default()), None, PaymentMethod::Cash)
            .await
            .unwrap();

        assert!(!registry.carts.contains_key(&k));
        assert!(registry.view(k).items.is_empty());
    }

    #[tokio::test]
    async fn failed_checkout_keeps_items_for_retry() {
        let registry = CartRegistry::new();
        let k = key();
        registry.add_item(k, &product(Decimal::TEN)).unwrap();
        let failing = Arc::new(RecordingStore { fail: true, ..Default::default() });

        assert!(registry.checkout(k, failing, None, PaymentMethod::Cash).await.is_err());
        let view = registry.view(k);
        assert_eq!(view.items.len(), 1);
        assert!(!view.checkout_pending);

        registry
            .checkout(k, Arc::new(RecordingStore::default()), None, PaymentMethod::Cash)
            .await
            .unwrap();
        assert!(registry.view(k).items.is_empty());
    }

    #[tokio::test]
    async fn concurrent_checkout_is_rejected_while_first_is_pending() {
        let registry = Arc::new(CartRegistry::new());
        let store = Arc::new(GatedStore::default());
        let k = key();
        let p = product(Decimal::TEN);
        registry.add_item(k, &p).unwrap();

        let first = {
            let registry = registry.clone();
            let store = store.clone();
            tokio::spawn(async move { registry.checkout(k, store, None, PaymentMethod::Pix).await })
        };
        store.entered.notified().await;

        assert!(registry.view(k).checkout_pending);
        let second = registry.checkout(k, store.clone(), None, PaymentMethod::Pix).await;
        assert!(matches!(second, Err(AppError::CheckoutInProgress)));
        assert!(matches!(registry.add_item(k, &p), Err(AppError::CheckoutInProgress)));
        assert!(matches!(registry.clear(k), Err(AppError::CheckoutInProgress)));

        store.release.notify_one();
        let sale = first.await.unwrap().unwrap();

        assert_eq!(sale.total_amount, Decimal::TEN);
        assert_eq!(store.inner.drafts.lock().unwrap().len(), 1);
        assert!(registry.view(k).items.is_empty());
    }

    #[tokio::test]
    async fn dropped_request_still_completes_and_unlocks_the_cart() {
        let registry = Arc::new(CartRegistry::new());
        let store = Arc::new(GatedStore::default());
        let k = key();
        let p = product(Decimal::TEN);
        registry.add_item(k, &p).unwrap();

        let request = {
            let registry = registry.clone();
            let store = store.clone();
            tokio::spawn(async move { registry.checkout(k, store, None, PaymentMethod::Cash).await })
        };
        store.entered.notified().await;

        // Cliente desconectou no meio do checkout
        request.abort();
        assert!(request.await.unwrap_err().is_cancelled());

        store.release.notify_one();
        wait_until_released(&registry, k).await;

        assert_eq!(store.inner.drafts.lock().unwrap().len(), 1);
        assert!(registry.view(k).items.is_empty());
        assert_eq!(registry.add_item(k, &p).unwrap().items.len(), 1);
        registry.clear(k).unwrap();
    }

    #[tokio::test]
    async fn dropped_request_with_failing_store_keeps_items() {
        let registry = Arc::new(CartRegistry::new());
        let store = Arc::new(GatedStore {
            inner: RecordingStore { fail: true, ..Default::default() },
            ..Default::default()
        });
        let k = key();
        registry.add_item(k, &product(Decimal::TEN)).unwrap();

        let request = {
            let registry = registry.clone();
            let store = store.clone();
            tokio::spawn(async move { registry.checkout(k, store, None, PaymentMethod::Cash).await })
        };
        store.entered.notified().await;
        request.abort();

        store.release.notify_one();
        wait_until_released(&registry, k).await;

        assert_eq!(registry.view(k).items.len(), 1);
        let retry = registry
            .checkout(k, Arc::new(RecordingStore::default()), None, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(retry.total_amount, Decimal::TEN);
    }

    #[tokio::test]
    async fn panicking_store_unlocks_the_cart() {
        let registry = CartRegistry::new();
        let k = key();
        registry.add_item(k, &product(Decimal::TEN)).unwrap();

        let err = registry
            .checkout(k, Arc::new(PanickingStore), None, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InternalServerError(_)));
        let view = registry.view(k);
        assert!(!view.checkout_pending);
        assert_eq!(view.items.len(), 1);
    }
}
