// src/services/report_service.rs
//
// Relatórios derivados de listas já carregadas. As funções livres são puras:
// não alteram a entrada e a mesma lista sempre produz a mesma saída.

use std::collections::BTreeMap;

use chrono::{Days, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, SalesRepository},
    models::{
        catalog::Product,
        dashboard::{DailySales, StockValueReport},
        sales::{PaymentMethod, Sale, SaleStatus},
    },
};

// Teto de vendas carregadas por relatório
const MAX_REPORT_SALES: i64 = 50_000;

/// Produtos ativos com saldo no mínimo ou abaixo dele, na ordem recebida.
pub fn low_stock_filter(products: &[Product]) -> Vec<&Product> {
    products.iter().filter(|p| p.is_low_stock()).collect()
}

/// Σ preço × saldo dos produtos ativos.
pub fn total_stock_value(products: &[Product]) -> Decimal {
    products
        .iter()
        .filter(|p| p.is_active())
        .map(|p| p.price * Decimal::from(p.stock_quantity))
        .sum()
}

/// Vendas concluídas agrupadas por dia (UTC) em `days` baldes contíguos
/// terminando em `today`, do mais antigo ao mais recente. Dia sem venda = 0.
/// Janela que começaria antes do menor dia representável vem vazia.
pub fn rolling_window_aggregate(sales: &[Sale], days: u32, today: NaiveDate) -> Vec<DailySales> {
    if days == 0 {
        return Vec::new();
    }
    let Some(start) = window_start(days, today) else {
        return Vec::new();
    };
    let mut buckets: Vec<DailySales> = (0..days)
        .map(|offset| DailySales {
            date: start + Duration::days(i64::from(offset)),
            total: Decimal::ZERO,
            count: 0,
        })
        .collect();

    for sale in sales.iter().filter(|s| s.status == SaleStatus::Completed) {
        let day = sale.created_at.date_naive();
        if day < start || day > today {
            continue;
        }
        let bucket = &mut buckets[(day - start).num_days() as usize];
        bucket.total += sale.total_amount;
        bucket.count += 1;
    }

    buckets
}

// Primeiro dia de uma janela de `days` dias terminando em `today`
fn window_start(days: u32, today: NaiveDate) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(days.max(1) - 1)))
}

/// Contagem de vendas concluídas por forma de pagamento.
/// Forma ausente ou desconhecida conta como dinheiro.
pub fn payment_method_breakdown(sales: &[Sale]) -> BTreeMap<String, u64> {
    let mut breakdown = BTreeMap::new();
    for sale in sales.iter().filter(|s| s.status == SaleStatus::Completed) {
        let method = PaymentMethod::from_label(sale.payment_method.as_deref());
        *breakdown.entry(method.as_str().to_string()).or_insert(0) += 1;
    }
    breakdown
}

#[derive(Clone, Default)]
pub struct ReportService {
    catalog_repo: CatalogRepository,
    sales_repo: SalesRepository,
}

impl ReportService {
    pub fn new(catalog_repo: CatalogRepository, sales_repo: SalesRepository) -> Self {
        Self { catalog_repo, sales_repo }
    }

    pub async fn sales_window<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<DailySales>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let Some(start) = window_start(days, today) else {
            return Ok(Vec::new());
        };
        let since = start.and_time(NaiveTime::MIN).and_utc();

        let sales = self
            .sales_repo
            .list_sales(executor, company_id, Some(since), MAX_REPORT_SALES)
            .await?;

        Ok(rolling_window_aggregate(&sales, days, today))
    }

    pub async fn payment_breakdown<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        days: u32,
    ) -> Result<BTreeMap<String, u64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Sem limite inferior quando a janela passa do calendário
        let since = Utc::now().checked_sub_days(Days::new(u64::from(days)));
        let sales = self
            .sales_repo
            .list_sales(executor, company_id, since, MAX_REPORT_SALES)
            .await?;

        Ok(payment_method_breakdown(&sales))
    }

    pub async fn stock_value<'e, E>(&self, executor: E, company_id: Uuid) -> Result<StockValueReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = self.catalog_repo.list_products(executor, company_id, None).await?;

        Ok(StockValueReport {
            total_stock_value: total_stock_value(&products),
            active_products: products.iter().filter(|p| p.is_active()).count(),
            low_stock_products: low_stock_filter(&products).len(),
        })
    }

    pub async fn low_stock<'e, E>(&self, executor: E, company_id: Uuid) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = self.catalog_repo.list_products(executor, company_id, None).await?;
        Ok(low_stock_filter(&products).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::ProductStatus;
    use crate::services::cart::tests::product;
    use chrono::DateTime;

    fn stocked(price: i64, stock: i32, min: i32, status: ProductStatus) -> Product {
        let mut p = product(Decimal::from(price));
        p.stock_quantity = stock;
        p.min_stock = min;
        p.status = status;
        p
    }

    fn sale_at(at: &str, total: i64, method: Option<&str>, status: SaleStatus) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            client_id: None,
            user_id: Uuid::nil(),
            total_amount: Decimal::from(total),
            discount_amount: Decimal::ZERO,
            payment_method: method.map(str::to_string),
            status,
            created_at: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn low_stock_keeps_order_and_skips_inactive() {
        let products = vec![
            stocked(10, 1, 5, ProductStatus::Active),
            stocked(10, 0, 5, ProductStatus::Inactive),
            stocked(10, 9, 5, ProductStatus::Active),
            stocked(10, 5, 5, ProductStatus::Active),
        ];

        let low = low_stock_filter(&products);

        assert_eq!(low.len(), 2);
        assert_eq!(low[0].id, products[0].id);
        assert_eq!(low[1].id, products[3].id);
        assert!(low.iter().all(|p| p.status == ProductStatus::Active));
    }

    #[test]
    fn stock_value_ignores_inactive_products() {
        let products = vec![
            stocked(10, 3, 0, ProductStatus::Active),
            stocked(7, 2, 0, ProductStatus::Active),
            stocked(1000, 50, 0, ProductStatus::Inactive),
        ];
        assert_eq!(total_stock_value(&products), Decimal::from(44));
    }

    #[test]
    fn empty_product_list() {
        assert_eq!(total_stock_value(&[]), Decimal::ZERO);
        assert!(low_stock_filter(&[]).is_empty());
    }

    #[test]
    fn window_always_has_requested_length() {
        let today = day("2026-03-10");
        for days in [1, 7, 30] {
            let buckets = rolling_window_aggregate(&[], days, today);
            assert_eq!(buckets.len(), days as usize);
            assert_eq!(buckets.last().unwrap().date, today);
            assert!(buckets.iter().all(|b| b.total.is_zero() && b.count == 0));
        }
        assert!(rolling_window_aggregate(&[], 0, today).is_empty());
    }

    #[test]
    fn window_past_the_calendar_is_empty() {
        let today = day("2026-03-10");
        let sales = vec![sale_at("2026-03-10T09:00:00Z", 20, None, SaleStatus::Completed)];

        assert!(rolling_window_aggregate(&sales, u32::MAX, today).is_empty());
        assert_eq!(rolling_window_aggregate(&sales, 1, NaiveDate::MIN).len(), 1);
        assert!(rolling_window_aggregate(&[], 2, NaiveDate::MIN).is_empty());
    }

    #[test]
    fn window_buckets_completed_sales_by_day() {
        let today = day("2026-03-10");
        let sales = vec![
            sale_at("2026-03-10T09:00:00Z", 20, None, SaleStatus::Completed),
            sale_at("2026-03-10T23:59:59Z", 5, None, SaleStatus::Completed),
            sale_at("2026-03-04T00:00:00Z", 7, None, SaleStatus::Completed),
            // fora da janela
            sale_at("2026-03-03T23:59:59Z", 100, None, SaleStatus::Completed),
            sale_at("2026-03-11T00:00:00Z", 100, None, SaleStatus::Completed),
            // não concluídas
            sale_at("2026-03-09T12:00:00Z", 100, None, SaleStatus::Cancelled),
            sale_at("2026-03-09T12:00:00Z", 100, None, SaleStatus::Pending),
        ];

        let buckets = rolling_window_aggregate(&sales, 7, today);

        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].date, day("2026-03-04"));
        assert_eq!(buckets[0].total, Decimal::from(7));
        assert_eq!(buckets[6].total, Decimal::from(25));
        assert_eq!(buckets[6].count, 2);
        assert_eq!(buckets[5].count, 0);
        let dates: Vec<NaiveDate> = buckets.iter().map(|b| b.date).collect();
        assert!(dates.windows(2).all(|w| w[1] - w[0] == Duration::days(1)));
    }

    #[test]
    fn breakdown_defaults_missing_and_unknown_to_cash() {
        let at = "2026-03-10T10:00:00Z";
        let sales = vec![
            sale_at(at, 1, Some("pix"), SaleStatus::Completed),
            sale_at(at, 1, Some("PIX"), SaleStatus::Completed),
            sale_at(at, 1, None, SaleStatus::Completed),
            sale_at(at, 1, Some(""), SaleStatus::Completed),
            sale_at(at, 1, Some("cheque"), SaleStatus::Completed),
            sale_at(at, 1, Some("credit_card"), SaleStatus::Completed),
            sale_at(at, 1, Some("credit_card"), SaleStatus::Cancelled),
        ];

        let breakdown = payment_method_breakdown(&sales);

        assert_eq!(breakdown.get("pix"), Some(&2));
        assert_eq!(breakdown.get("cash"), Some(&3));
        assert_eq!(breakdown.get("credit_card"), Some(&1));
        assert_eq!(breakdown.values().sum::<u64>(), 6);
    }

    #[test]
    fn reports_do_not_mutate_input() {
        let sales = vec![sale_at("2026-03-10T10:00:00Z", 3, None, SaleStatus::Completed)];
        let snapshot = sales.clone();
        let first = rolling_window_aggregate(&sales, 7, day("2026-03-10"));
        let second = rolling_window_aggregate(&sales, 7, day("2026-03-10"));
        assert_eq!(first, second);
        assert_eq!(sales[0].id, snapshot[0].id);
        assert_eq!(payment_method_breakdown(&sales), payment_method_breakdown(&snapshot));
    }
}
