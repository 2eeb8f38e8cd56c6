//! CSV export of products, orders and customers, and product import.

use bizgrow_core::{Money, StoreId};
use chrono::FixedOffset;
use thiserror::Error;

use crate::supabase::{Customer, Order, Product, ProductInput};

/// Columns of the product CSV, in export order.
pub const PRODUCT_COLUMNS: [&str; 7] = [
    "name",
    "description",
    "price",
    "category",
    "stock_quantity",
    "is_available",
    "image_url",
];

const ORDER_COLUMNS: [&str; 9] = [
    "order_id",
    "date",
    "customer_name",
    "customer_phone",
    "customer_address",
    "items",
    "total_amount",
    "status",
    "payment_method",
];

const CUSTOMER_COLUMNS: [&str; 7] = [
    "name",
    "phone",
    "email",
    "address",
    "total_orders",
    "total_spent",
    "created_at",
];

/// Errors reading or writing CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush CSV output: {0}")]
    Write(String),

    #[error("Missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("The file has no product rows")]
    Empty,
}

/// A rejected import row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line in the file; the header is line 1.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Parsed import: good rows ready to insert plus the rejected ones.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub products: Vec<ProductInput>,
    pub errors: Vec<RowError>,
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, CsvError> {
    writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.error().to_string()))
}

fn opt(value: Option<&String>) -> &str {
    value.map_or("", String::as_str)
}

/// Export products with the import column layout.
///
/// # Errors
///
/// Returns an error if a record cannot be written.
pub fn export_products(products: &[Product]) -> Result<Vec<u8>, CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(PRODUCT_COLUMNS)?;
    for product in products {
        let price = product.price.plain();
        let stock = product.stock_quantity.to_string();
        writer.write_record([
            product.name.as_str(),
            opt(product.description.as_ref()),
            price.as_str(),
            opt(product.category.as_ref()),
            stock.as_str(),
            if product.is_available { "true" } else { "false" },
            opt(product.image_url.as_ref()),
        ])?;
    }
    finish(writer)
}

/// Export orders; dates are written in the store's local time.
///
/// # Errors
///
/// Returns an error if a record cannot be written.
pub fn export_orders(orders: &[Order], offset: FixedOffset) -> Result<Vec<u8>, CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ORDER_COLUMNS)?;
    for order in orders {
        let items = order
            .items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join("; ");
        let id = order.id.to_string();
        let date = order
            .created_at
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let total = order.total_amount.plain();
        writer.write_record([
            id.as_str(),
            date.as_str(),
            order.customer_name.as_str(),
            order.customer_phone.as_str(),
            opt(order.customer_address.as_ref()),
            items.as_str(),
            total.as_str(),
            order.status.as_str(),
            order.payment_method.label(),
        ])?;
    }
    finish(writer)
}

/// Export customers.
///
/// # Errors
///
/// Returns an error if a record cannot be written.
pub fn export_customers(customers: &[Customer]) -> Result<Vec<u8>, CsvError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CUSTOMER_COLUMNS)?;
    for customer in customers {
        let orders = customer.total_orders.to_string();
        let spent = customer.total_spent.plain();
        let since = customer.created_at.format("%Y-%m-%d").to_string();
        writer.write_record([
            customer.name.as_str(),
            customer.phone.as_str(),
            opt(customer.email.as_ref()),
            opt(customer.address.as_ref()),
            orders.as_str(),
            spent.as_str(),
            since.as_str(),
        ])?;
    }
    finish(writer)
}

/// Parse a product CSV for `store_id`.
///
/// The header row is required and matched case-insensitively; `name` and
/// `price` must be present, the other columns are optional. Rows that fail
/// to parse are reported and skipped.
///
/// # Errors
///
/// Returns an error if the header is unreadable, a required column is
/// missing, or the file has no data rows.
pub fn import_products(content: &[u8], store_id: StoreId) -> Result<ImportReport, CsvError> {
    let content = content.strip_prefix("\u{FEFF}".as_bytes()).unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let name_col = column("name").ok_or(CsvError::MissingColumn("name"))?;
    let price_col = column("price").ok_or(CsvError::MissingColumn("price"))?;
    let description_col = column("description");
    let category_col = column("category");
    let stock_col = column("stock_quantity");
    let available_col = column("is_available");
    let image_col = column("image_url");

    let mut report = ImportReport::default();
    let mut rows = 0usize;
    let mut last_line = 1;
    for result in reader.records() {
        rows += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e
                    .position()
                    .map_or(last_line + 1, |pos| line_at(content, pos));
                last_line = line;
                report.errors.push(RowError {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map_or(last_line + 1, |pos| line_at(content, pos));
        last_line = line;
        let field = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .map(str::to_string)
                .filter(|v| !v.is_empty())
        };

        match parse_row(
            store_id,
            field(Some(name_col)),
            field(Some(price_col)),
            field(description_col),
            field(category_col),
            field(stock_col),
            field(available_col),
            field(image_col),
        ) {
            Ok(product) => report.products.push(product),
            Err(message) => report.errors.push(RowError { line, message }),
        }
    }

    if rows == 0 {
        return Err(CsvError::Empty);
    }
    Ok(report)
}

/// 1-based line a record starts on.
///
/// The reader records a position before skipping blank lines, so leading
/// terminators are stepped over here. Newlines inside quoted fields of
/// earlier records are counted.
fn line_at(content: &[u8], position: &csv::Position) -> usize {
    let start = usize::try_from(position.byte())
        .unwrap_or(usize::MAX)
        .min(content.len());
    let skipped = content
        .get(start..)
        .unwrap_or_default()
        .iter()
        .take_while(|b| matches!(b, b'\r' | b'\n'))
        .count();
    let before = content.get(..start + skipped).unwrap_or(content);
    1 + before.iter().filter(|b| **b == b'\n').count()
}

#[allow(clippy::too_many_arguments)]
fn parse_row(
    store_id: StoreId,
    name: Option<String>,
    price: Option<String>,
    description: Option<String>,
    category: Option<String>,
    stock: Option<String>,
    available: Option<String>,
    image_url: Option<String>,
) -> Result<ProductInput, String> {
    let name = name.ok_or("name is required")?;
    let price = price.ok_or("price is required")?;
    let price = Money::parse_input(&price).map_err(|e| format!("price: {e}"))?;
    let stock_quantity = match stock {
        Some(raw) => raw
            .parse::<i32>()
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| format!("stock_quantity '{raw}' is not a whole number"))?,
        None => 0,
    };
    let is_available = match available {
        Some(raw) => parse_bool(&raw).ok_or_else(|| format!("is_available '{raw}' is not yes/no"))?,
        None => true,
    };

    Ok(ProductInput {
        store_id,
        name,
        description,
        price,
        category,
        image_url,
        stock_quantity,
        is_available,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bizgrow_core::{OrderId, OrderStatus, PaymentMethod, ProductId};
    use chrono::{TimeZone, Utc};

    use crate::supabase::OrderItem;

    #[test]
    fn test_import_reads_columns_in_any_order_and_case() {
        let csv = "Price,NAME,Category,is_available\n120,Masala Chai,Beverages,no\n40,Rusk,,\n";
        let store_id = StoreId::random();
        let report = import_products(csv.as_bytes(), store_id).unwrap();

        assert!(report.errors.is_empty());
        assert_eq!(report.products.len(), 2);
        let chai = &report.products[0];
        assert_eq!(chai.name, "Masala Chai");
        assert_eq!(chai.price, Money::from_rupees(120));
        assert_eq!(chai.category.as_deref(), Some("Beverages"));
        assert!(!chai.is_available);
        assert_eq!(chai.store_id, store_id);
        let rusk = &report.products[1];
        assert_eq!(rusk.category, None);
        assert!(rusk.is_available);
        assert_eq!(rusk.stock_quantity, 0);
    }

    #[test]
    fn test_import_reports_bad_rows_with_line_numbers() {
        let csv = "\u{FEFF}name,price,stock_quantity\nChai,120,5\n,10,1\nRusk,abc,1\nSamosa,15,-2\nTea,20,3\n";
        let report = import_products(csv.as_bytes(), StoreId::random()).unwrap();

        assert_eq!(report.products.len(), 2);
        let lines: Vec<usize> = report.errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
        assert_eq!(report.errors[0].to_string(), "Line 3: name is required");
    }

    #[test]
    fn test_import_line_numbers_count_blank_lines() {
        let csv = "name,price\nTea,10\n\nBad,abc\n";
        let report = import_products(csv.as_bytes(), StoreId::random()).unwrap();

        assert_eq!(report.products.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 4);
    }

    #[test]
    fn test_import_line_numbers_follow_multiline_descriptions() {
        let csv = "name,price,description\nTea,10,\"two\nlines\"\nBad,abc,x\n";
        let report = import_products(csv.as_bytes(), StoreId::random()).unwrap();

        assert_eq!(report.products.len(), 1);
        assert_eq!(report.products[0].description.as_deref(), Some("two\nlines"));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 4);
    }

    #[test]
    fn test_import_requires_header_columns() {
        let err = import_products(b"title,cost\nChai,10\n", StoreId::random()).unwrap_err();
        assert!(matches!(err, CsvError::MissingColumn("name")));

        let err = import_products(b"name,price\n", StoreId::random()).unwrap_err();
        assert!(matches!(err, CsvError::Empty));
    }

    fn product(name: &str, description: Option<&str>) -> Product {
        Product {
            id: ProductId::random(),
            store_id: StoreId::random(),
            name: name.to_string(),
            description: description.map(str::to_string),
            price: Money::parse_input("99.50").unwrap(),
            category: Some("Snacks".to_string()),
            image_url: None,
            stock_quantity: 7,
            is_available: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_export_products_round_trips_through_import() {
        let products = vec![
            product("Chai, large", Some("Strong \"kadak\" chai")),
            product("Rusk", None),
        ];
        let bytes = export_products(&products).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("name,description,price,category,stock_quantity,is_available,image_url\n"));

        let report = import_products(&bytes, StoreId::random()).unwrap();
        assert!(report.errors.is_empty());
        assert_eq!(report.products[0].name, "Chai, large");
        assert_eq!(
            report.products[0].description.as_deref(),
            Some("Strong \"kadak\" chai")
        );
        assert_eq!(report.products[1].stock_quantity, 7);
    }

    #[test]
    fn test_export_orders_uses_local_time_and_item_summary() {
        let order = Order {
            id: OrderId::random(),
            store_id: StoreId::random(),
            customer_id: None,
            customer_name: "Ravi".to_string(),
            customer_phone: "9876543210".to_string(),
            customer_address: None,
            items: vec![
                OrderItem {
                    product_id: ProductId::random(),
                    name: "Chai".to_string(),
                    price: Money::from_rupees(120),
                    quantity: 2,
                },
                OrderItem {
                    product_id: ProductId::random(),
                    name: "Rusk".to_string(),
                    price: Money::from_rupees(40),
                    quantity: 1,
                },
            ],
            total_amount: Money::from_rupees(280),
            status: OrderStatus::Shipped,
            payment_method: PaymentMethod::Upi,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap(),
        };
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let text = String::from_utf8(export_orders(&[order], ist).unwrap()).unwrap();
        let row = text.lines().nth(1).unwrap();

        assert!(row.contains("2026-03-02 01:30"));
        assert!(row.contains("Chai x2; Rusk x1"));
        assert!(row.contains(",280.00,shipped,UPI"));
    }
}
