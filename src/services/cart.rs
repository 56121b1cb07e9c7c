// src/services/cart.rs
//
// Carrinho do PDV: lista ordenada de (produto, preço unitário, quantidade)
// de uma sessão de caixa, com subtotal, desconto e total derivados.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::Product,
        sales::{PaymentMethod, Sale, SaleDraft, SaleDraftItem},
    },
};

/// Destino da venda finalizada. Em produção é o Postgres (`SalesService`);
/// nos testes, um dublê em memória.
#[async_trait]
pub trait SaleStore: Send + Sync {
    async fn create_sale(&self, company_id: Uuid, draft: SaleDraft) -> Result<Sale, AppError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
    discount_percent: Decimal,
    checkout_in_flight: bool,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn discount_percent(&self) -> Decimal {
        self.discount_percent
    }

    pub fn checkout_in_flight(&self) -> bool {
        self.checkout_in_flight
    }

    /// Produto já no carrinho: +1. Senão entra no fim com quantidade 1.
    /// O saldo em estoque não é consultado aqui; a baixa na finalização é quem barra.
    pub fn add_item(&mut self, product: &Product) {
        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(item) => item.quantity += 1,
            None => self.items.push(CartItem {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                quantity: 1,
            }),
        }
    }

    /// Quantidade <= 0 remove o item. Produto ausente: nada acontece.
    pub fn update_quantity(&mut self, product_id: Uuid, new_quantity: i32) {
        if new_quantity <= 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            item.quantity = new_quantity;
        }
    }

    pub fn remove_item(&mut self, product_id: Uuid) {
        self.items.retain(|i| i.product_id != product_id);
    }

    /// Sem clamp: fora de [0, 100] o total pode ficar negativo.
    pub fn set_discount(&mut self, discount_percent: Decimal) {
        self.discount_percent = discount_percent;
    }

    pub fn compute_subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn compute_discount(subtotal: Decimal, discount_percent: Decimal) -> Decimal {
        subtotal * discount_percent / Decimal::ONE_HUNDRED
    }

    pub fn compute_total(&self) -> Decimal {
        self.totals().total
    }

    pub fn totals(&self) -> CartTotals {
        let subtotal = self.compute_subtotal();
        let discount = Self::compute_discount(subtotal, self.discount_percent);
        CartTotals {
            subtotal,
            discount,
            total: subtotal - discount,
        }
    }

    /// Marca a finalização como pendente e congela o pedido de venda.
    /// Uma segunda chamada antes de `finish_checkout` é recusada.
    pub fn begin_checkout(
        &mut self,
        user_id: Uuid,
        client_id: Option<Uuid>,
        payment_method: PaymentMethod,
    ) -> Result<SaleDraft, AppError> {
        if self.checkout_in_flight {
            return Err(AppError::CheckoutInProgress);
        }
        if self.items.is_empty() {
            return Err(AppError::EmptyCart);
        }

        self.checkout_in_flight = true;
        let totals = self.totals();

        Ok(SaleDraft {
            user_id,
            client_id,
            payment_method,
            items: self
                .items
                .iter()
                .map(|i| SaleDraftItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
            subtotal: totals.subtotal,
            discount_amount: totals.discount,
            total_amount: totals.total,
        })
    }

    /// Sucesso: esvazia e zera o desconto. Falha: mantém tudo para nova tentativa.
    pub fn finish_checkout(&mut self, succeeded: bool) {
        self.checkout_in_flight = false;
        if succeeded {
            self.items.clear();
            self.discount_percent = Decimal::ZERO;
        }
    }

    /// Envia exatamente um pedido de criação de venda ao `store`.
    pub async fn finalize(
        &mut self,
        store: &dyn SaleStore,
        company_id: Uuid,
        user_id: Uuid,
        client_id: Option<Uuid>,
        payment_method: PaymentMethod,
    ) -> Result<Sale, AppError> {
        let draft = self.begin_checkout(user_id, client_id, payment_method)?;
        let result = store.create_sale(company_id, draft).await;
        self.finish_checkout(result.is_ok());
        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{catalog::ProductStatus, sales::SaleStatus};
    use chrono::Utc;
    use std::sync::Mutex;

    pub(crate) fn product(price: Decimal) -> Product {
        Product {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            category_id: None,
            supplier_id: None,
            name: format!("Produto {}", price),
            sku: None,
            barcode: None,
            description: None,
            price,
            cost_price: Decimal::ZERO,
            stock_quantity: 10,
            min_stock: 2,
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Dublê que grava os pedidos recebidos e responde conforme `fail`.
    #[derive(Default)]
    pub(crate) struct RecordingStore {
        pub fail: bool,
        pub drafts: Mutex<Vec<SaleDraft>>,
    }

    #[async_trait]
    impl SaleStore for RecordingStore {
        async fn create_sale(&self, company_id: Uuid, draft: SaleDraft) -> Result<Sale, AppError> {
            self.drafts.lock().unwrap().push(draft.clone());
            if self.fail {
                return Err(AppError::InsufficientStock);
            }
            Ok(Sale {
                id: Uuid::new_v4(),
                company_id,
                client_id: draft.client_id,
                user_id: draft.user_id,
                total_amount: draft.total_amount,
                discount_amount: draft.discount_amount,
                payment_method: Some(draft.payment_method.as_str().to_string()),
                status: SaleStatus::Completed,
                created_at: Utc::now(),
            })
        }
    }

    fn dec(v: i64, scale: u32) -> Decimal {
        Decimal::new(v, scale)
    }

    fn scenario_cart() -> Cart {
        // [{price: 10, qty: 2}, {price: 5, qty: 3}]
        let a = product(dec(10, 0));
        let b = product(dec(5, 0));
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&a);
        cart.add_item(&b);
        cart.update_quantity(b.id, 3);
        cart
    }

    #[test]
    fn subtotal_is_sum_of_price_times_final_quantity() {
        let products: Vec<Product> = (1..=4).map(|p| product(dec(p * 250, 2))).collect();
        let mut cart = Cart::new();
        for (n, p) in products.iter().enumerate() {
            for _ in 0..=n {
                cart.add_item(p);
            }
        }

        let expected: Decimal = products
            .iter()
            .enumerate()
            .map(|(n, p)| p.price * Decimal::from(n as i32 + 1))
            .sum();
        assert_eq!(cart.compute_subtotal(), expected);
    }

    #[test]
    fn adding_twice_equals_add_then_update_to_two() {
        let p = product(dec(799, 2));

        let mut twice = Cart::new();
        twice.add_item(&p);
        twice.add_item(&p);

        let mut updated = Cart::new();
        updated.add_item(&p);
        updated.update_quantity(p.id, 2);

        assert_eq!(twice.items(), updated.items());
    }

    #[test]
    fn update_to_zero_equals_remove() {
        let a = product(dec(10, 0));
        let b = product(dec(5, 0));

        let mut zeroed = Cart::new();
        zeroed.add_item(&a);
        zeroed.add_item(&b);
        zeroed.update_quantity(a.id, 0);

        let mut removed = Cart::new();
        removed.add_item(&a);
        removed.add_item(&b);
        removed.remove_item(a.id);

        assert_eq!(zeroed.items(), removed.items());
        assert_eq!(zeroed.items().len(), 1);
    }

    #[test]
    fn negative_quantity_also_removes_and_unknown_ids_are_ignored() {
        let a = product(dec(10, 0));
        let mut cart = Cart::new();
        cart.add_item(&a);

        cart.update_quantity(Uuid::new_v4(), 7);
        cart.remove_item(Uuid::new_v4());
        assert_eq!(cart.items()[0].quantity, 1);

        cart.update_quantity(a.id, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn items_keep_insertion_order() {
        let a = product(dec(1, 0));
        let b = product(dec(2, 0));
        let mut cart = Cart::new();
        cart.add_item(&b);
        cart.add_item(&a);
        cart.add_item(&b);

        let ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[test]
    fn ten_percent_discount_scenario() {
        let mut cart = scenario_cart();
        assert_eq!(cart.compute_subtotal(), dec(35, 0));

        cart.set_discount(dec(10, 0));
        let totals = cart.totals();
        assert_eq!(totals.discount, dec(35, 1));
        assert_eq!(totals.total, dec(315, 1));
    }

    #[test]
    fn out_of_range_discount_goes_negative() {
        let mut cart = scenario_cart();
        cart.set_discount(dec(150, 0));

        let totals = cart.totals();
        assert_eq!(totals.discount, dec(525, 1));
        // 35 - 52.5: sem clamp o total fica negativo
        assert_eq!(cart.compute_total(), dec(-175, 1));
        assert!(cart.compute_total().is_sign_negative());
    }

    #[test]
    fn compute_discount_is_proportional() {
        assert_eq!(Cart::compute_discount(dec(200, 0), dec(25, 0)), dec(50, 0));
        assert_eq!(Cart::compute_discount(dec(200, 0), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn empty_cart_cannot_begin_checkout() {
        let mut cart = Cart::new();
        let err = cart.begin_checkout(Uuid::new_v4(), None, PaymentMethod::Cash).unwrap_err();
        assert!(matches!(err, AppError::EmptyCart));
        assert!(!cart.checkout_in_flight());
    }

    #[test]
    fn second_begin_is_rejected_while_pending() {
        let mut cart = scenario_cart();
        let user = Uuid::new_v4();
        let draft = cart.begin_checkout(user, None, PaymentMethod::Pix).unwrap();
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.total_amount, dec(35, 0));

        let err = cart.begin_checkout(user, None, PaymentMethod::Pix).unwrap_err();
        assert!(matches!(err, AppError::CheckoutInProgress));
    }

    #[tokio::test]
    async fn finalize_success_clears_cart_and_discount() {
        let store = RecordingStore::default();
        let mut cart = scenario_cart();
        cart.set_discount(dec(10, 0));
        let client = Some(Uuid::new_v4());

        let sale = cart
            .finalize(&store, Uuid::new_v4(), Uuid::new_v4(), client, PaymentMethod::DebitCard)
            .await
            .unwrap();

        assert_eq!(sale.total_amount, dec(315, 1));
        assert_eq!(sale.discount_amount, dec(35, 1));
        assert_eq!(sale.client_id, client);
        assert!(cart.is_empty());
        assert_eq!(cart.discount_percent(), Decimal::ZERO);
        assert_eq!(store.drafts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn finalize_failure_preserves_cart() {
        let store = RecordingStore { fail: true, ..Default::default() };
        let mut cart = scenario_cart();
        cart.set_discount(dec(10, 0));
        let before = cart.items().to_vec();

        let err = cart
            .finalize(&store, Uuid::new_v4(), Uuid::new_v4(), None, PaymentMethod::Cash)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock));
        assert_eq!(cart.items(), before.as_slice());
        assert_eq!(cart.discount_percent(), dec(10, 0));
        assert!(!cart.checkout_in_flight());
    }
}
