use anyhow::Result;
use ironcart::combine::ExecMode;
use ironcart::config::{Settings, SettingsError};
use ironcart::validation::Validate;

const FULL: &str = r#"
[ingest]
row_limit = 500
chunk_size = 4096

[mapping]
customer_id = "Customer ID"
invoice_id = "Invoice"

[cleaning]
remove_duplicate_transactions = false

[basket]
min_support = 0.02
min_confidence = 0.3
min_lift = 1.2

[cltv]
profit_margin = 0.25
discount_rate = 0.05
churn_override = 0.4

[execution]
parallel = true
threads = 4
"#;

#[test]
fn full_document_parses() -> Result<()> {
    let s = Settings::from_toml_str(FULL)?;
    assert_eq!(s.ingest.row_limit, 500);
    assert_eq!(s.ingest.chunk_size, 4096);
    assert_eq!(s.mapping.customer_id, "Customer ID");
    assert_eq!(s.mapping.invoice_id, "Invoice");
    // unspecified keys keep their defaults
    assert_eq!(s.mapping.unit_price, "UnitPrice");
    assert!(!s.cleaning.remove_duplicate_transactions);
    assert!(s.cleaning.remove_null_customer_id);
    assert_eq!(s.basket.min_lift, 1.2);
    assert_eq!(s.cltv.churn_override, Some(0.4));
    assert_eq!(s.execution.threads, Some(4));
    assert_eq!(s.execution.mode(), ExecMode::parallel());
    assert!(s.is_valid());
    Ok(())
}

#[test]
fn out_of_range_values_are_all_reported() {
    let s = Settings::from_toml_str(
        r#"
        [ingest]
        row_limit = 0

        [basket]
        min_support = 1.5
        min_lift = -1.0

        [cltv]
        churn_override = 2.0
        "#,
    )
    .unwrap();
    let errors = s.validate().unwrap_err();
    let fields: Vec<&str> = errors.iter().filter_map(|e| e.field.as_deref()).collect();
    assert_eq!(
        fields,
        vec![
            "ingest.row_limit",
            "basket.min_support",
            "basket.min_lift",
            "cltv.churn_override"
        ]
    );
}

#[test]
fn mistyped_value_is_a_parse_error() {
    let err = Settings::from_toml_str("[ingest]\nrow_limit = \"many\"").unwrap_err();
    assert!(matches!(err, SettingsError::ParseError(_)));
}

#[test]
fn missing_file_is_reported() {
    let err = Settings::from_file("/no/such/ironcart.toml").unwrap_err();
    assert!(matches!(err, SettingsError::FileNotFound(_)));
}

#[test]
fn load_reads_and_validates_a_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let good = dir.path().join("good.toml");
    std::fs::write(&good, "[basket]\nmin_support = 0.5\n")?;
    let s = Settings::from_file(&good)?;
    assert_eq!(s.basket.min_support, 0.5);

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[basket]\nmin_confidence = 7.0\n")?;
    let err = Settings::load(Some(bad.as_path())).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidConfig(ref msg) if msg.contains("min_confidence")));
    Ok(())
}

#[test]
fn sequential_by_default() {
    assert_eq!(Settings::default().execution.mode(), ExecMode::Sequential);
}
