//! Ready-made CSV documents and transactions for tests.

use crate::clean::parse_invoice_date;
use crate::records::CanonicalTransaction;

/// Data rows in [`sample_csv`].
pub const SAMPLE_ROWS: usize = 17;
/// Transactions [`sample_csv`] yields with default cleaning options.
pub const SAMPLE_TRANSACTIONS: usize = 13;
/// Distinct customers among those transactions.
pub const SAMPLE_CUSTOMERS: usize = 5;
/// Distinct invoices among those transactions.
pub const SAMPLE_BASKETS: usize = 7;

/// A small online-retail export using the default column names.
///
/// Besides clean rows it holds one exact duplicate, one row without a
/// customer, one negative quantity and one zero price, so every cleaning
/// stage removes exactly one row.
///
/// # Example
///
/// ```
/// use ironcart::io::ingest::{IngestOptions, ingest_str};
/// use ironcart::testing::{SAMPLE_ROWS, sample_csv};
///
/// let res = ingest_str(&sample_csv(), &IngestOptions::default());
/// assert_eq!(res.row_count, SAMPLE_ROWS);
/// ```
#[must_use]
pub fn sample_csv() -> String {
    [
        "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country",
        "536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,12/1/2010 8:26,2.55,17850,United Kingdom",
        "536365,71053,WHITE METAL LANTERN,6,12/1/2010 8:26,3.39,17850,United Kingdom",
        "536366,22633,HAND WARMER UNION JACK,6,12/1/2010 8:28,1.85,17850,United Kingdom",
        "536367,84879,ASSORTED COLOUR BIRD ORNAMENT,32,12/1/2010 8:34,1.69,13047,United Kingdom",
        "536367,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,12/1/2010 8:34,2.55,13047,United Kingdom",
        "536367,71053,WHITE METAL LANTERN,6,12/1/2010 8:34,3.39,13047,United Kingdom",
        "536368,22960,JAM MAKING SET WITH JARS,6,12/1/2010 8:34,4.25,13047,United Kingdom",
        "536370,22728,\"ALARM CLOCK BAKELIKE PINK\",24,12/1/2010 8:45,3.75,12583,France",
        "536370,85123A,WHITE HANGING HEART T-LIGHT HOLDER,12,12/1/2010 8:45,2.55,12583,France",
        "536370,71053,WHITE METAL LANTERN,12,12/1/2010 8:45,3.39,12583,France",
        "536370,71053,WHITE METAL LANTERN,12,12/1/2010 8:45,3.39,12583,France",
        "536371,22086,PAPER CHAIN KIT 50'S CHRISTMAS,80,12/1/2010 9:00,2.55,,United Kingdom",
        "C536379,D,Discount,-1,12/1/2010 9:41,27.50,14527,United Kingdom",
        "536380,22961,\"SET 7 BABUSHKA NESTING BOXES, RED\",2,12/2/2010 9:41,8.50,14527,United Kingdom",
        "536381,85123A,WHITE HANGING HEART T-LIGHT HOLDER,4,12/3/2010 10:00,2.95,15311,United Kingdom",
        "536381,71053,WHITE METAL LANTERN,4,12/3/2010 10:00,3.75,15311,United Kingdom",
        "536382,22727,ALARM CLOCK BAKELIKE RED,4,12/3/2010 11:00,0,15311,United Kingdom",
    ]
    .join("\n")
}

/// Build a canonical transaction directly, bypassing ingestion.
///
/// # Panics
///
/// Panics if `date` is not a date [`parse_invoice_date`] accepts.
#[must_use]
pub fn transaction(
    customer_id: &str,
    invoice_id: &str,
    description: &str,
    date: &str,
    quantity: f64,
    unit_price: f64,
) -> CanonicalTransaction {
    let invoice_date =
        parse_invoice_date(date).unwrap_or_else(|| panic!("fixture date {date:?} does not parse"));
    CanonicalTransaction {
        customer_id: customer_id.to_string(),
        invoice_id: invoice_id.to_string(),
        description: description.to_string(),
        invoice_date,
        quantity,
        unit_price,
        total_price: quantity * unit_price,
    }
}

/// Two invoices, each holding Bread and Milk.
#[must_use]
pub fn bread_milk_transactions() -> Vec<CanonicalTransaction> {
    vec![
        transaction("C1", "INV1", "Bread", "2024-01-01", 1.0, 2.0),
        transaction("C1", "INV1", "Milk", "2024-01-01", 1.0, 1.5),
        transaction("C2", "INV2", "Bread", "2024-01-02", 2.0, 2.0),
        transaction("C2", "INV2", "Milk", "2024-01-02", 1.0, 1.5),
    ]
}
