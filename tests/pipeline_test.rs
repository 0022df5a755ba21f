// End-to-end: CSV files in, cleaned dataset + audit artifacts out

use basket_hygiene::sink::{
    self, AUDIT_JSON, CHANGELOG, DIM_CALENDAR, DIM_CAMPAIGN, DIM_HOUSEHOLD, FACT_REDEMPTIONS,
    FACT_TRANSACTIONS,
};
use basket_hygiene::{
    read_campaigns, read_demographics, read_product_catalog, read_redemptions, read_transactions,
    AuditReport, CleaningConfig,
    ParseErrorPolicy, Pipeline, PipelineError, PipelineOutput, PARSE_REJECTED,
};
use std::fs;
use std::path::{Path, PathBuf};

const TRANSACTIONS: &str = "\
household_key,BASKET_ID,DAY,PRODUCT_ID,QUANTITY,SALES_VALUE,STORE_ID,RETAIL_DISC,TRANS_TIME,WEEK_NO,COUPON_DISC,COUPON_MATCH_DISC
1,100,1,10,2,3.00,1,-0.50,0930,1,0,0
1,100,1,11,1,2.00,1,0.10,0930,1,0,0
2,101,2,20,10,30.00,1,0,1200,1,0,0
2,101,2,21,1,1.50,1,0,1200,1,-0.25,0
3,102,3,30,100,2.00,2,0,0815,1,0,0
3,102,3,31,200,400.00,2,0,0815,1,0,0
4,103,711,10,-200,-90.00,2,0,2359,102,0,0
";

const DEMOGRAPHICS: &str = "\
AGE_DESC,MARITAL_STATUS_CODE,INCOME_DESC,HOMEOWNER_DESC,HH_COMP_DESC,HOUSEHOLD_SIZE_DESC,KID_CATEGORY_DESC,household_key
65+,A,35-49K,Homeowner,2 Adults No Kids,2,None/Unknown,1
45-54,,50-74K,Unknown,Single Female,1,None/Unknown,3
";

const PRODUCTS: &str = "\
PRODUCT_ID,MANUFACTURER,DEPARTMENT,BRAND,COMMODITY_DESC,SUB_COMMODITY_DESC,CURR_SIZE_OF_PRODUCT
10,2,GROCERY,National,SOFT DRINKS,SOFT DRINKS 12/18&15PK CAN CAR,12 OZ
11,2,GROCERY,National,BAG SNACKS,POTATO CHIPS,11.5 OZ
20,69,KIOSK-GAS,Private,COUPON/MISC ITEMS,GASOLINE-REG UNLEADED,
21,2,GROCERY,National,CANDY - PACKAGED,CANDY BARS,2 OZ
30,69,MISC SALES TRAN,Private,COUPON/MISC ITEMS,LOYALTY TOKENS,
31,2,GROCERY,National,FLUID MILK PRODUCTS,FLUID MILK WHITE ONLY,1 GA
";

struct Fixture {
    _dir: tempfile::TempDir,
    transactions: PathBuf,
    demographics: PathBuf,
    products: PathBuf,
    out: PathBuf,
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn fixture(transactions: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();

    Fixture {
        transactions: write(&root, "transaction_data.csv", transactions),
        demographics: write(&root, "hh_demographic.csv", DEMOGRAPHICS),
        products: write(&root, "product.csv", PRODUCTS),
        out: root.join("processed"),
        _dir: dir,
    }
}

fn run(fx: &Fixture, config: CleaningConfig) -> Result<PipelineOutput, PipelineError> {
    let raw_transactions = read_transactions(&fx.transactions).unwrap();
    let raw_demographics = read_demographics(&fx.demographics).unwrap();
    let catalog = read_product_catalog(&fx.products).unwrap();

    Pipeline::new(config)?
        .with_catalog(catalog)
        .run(&raw_transactions, &raw_demographics)
}

#[test]
fn test_full_run_from_csv() {
    let fx = fixture(TRANSACTIONS);
    let output = run(&fx, CleaningConfig::default()).unwrap();

    // row 2 surcharge, row 3 sub-commodity is gasoline but commodity is not,
    // row 5 loyalty token, row 6 over the cap
    assert_eq!(output.input_rows, 7);
    assert_eq!(output.audit.count("positive_discount"), 1);
    assert_eq!(output.audit.count("non_merchandise"), 0);
    assert_eq!(output.audit.count("loyalty_token"), 1);
    assert_eq!(output.audit.count("quantity_cap"), 1);
    assert_eq!(output.dataset.len(), 4);
    assert!(output.is_consistent());

    let products: Vec<u64> = output.dataset.iter().map(|r| r.transaction.product_id).collect();
    assert_eq!(products, vec![10, 20, 21, 10]);
}

#[test]
fn test_every_cleaned_row_satisfies_invariants() {
    let fx = fixture(TRANSACTIONS);
    let config = CleaningConfig::default();
    let output = run(&fx, config.clone()).unwrap();

    for record in &output.dataset {
        let t = &record.transaction;
        assert!(t.retail_disc <= 0.0 && t.coupon_disc <= 0.0);
        assert!(!t.commodity_desc.contains("FUEL") && !t.commodity_desc.contains("GASOLINE"));
        assert!(t.quantity <= config.quantity_cap);
        if t.sales_value > 0.0 {
            if let Some(price) = t.unit_price() {
                assert!(price >= config.unit_price_floor);
            }
        }
        assert!(record.date.is_some());
    }
}

#[test]
fn test_artifacts_written() {
    let fx = fixture(TRANSACTIONS);
    let config = CleaningConfig::default();
    let output = run(&fx, config.clone()).unwrap();

    sink::write_all(&fx.out, &output, &config.demographic_sentinel).unwrap();

    let fact = fs::read_to_string(fx.out.join(FACT_TRANSACTIONS)).unwrap();
    assert_eq!(fact.lines().count(), 1 + output.dataset.len());
    // household 4 is a shadow customer on day 711
    let last = fact.lines().last().unwrap();
    assert!(last.contains("2025-12-11"));
    assert!(last.contains("23:59:00"));
    assert!(last.ends_with("false,Unknown,Unknown,Unknown,Unknown,Unknown,Unknown,Unknown"));

    let households = fs::read_to_string(fx.out.join(DIM_HOUSEHOLD)).unwrap();
    // household 2 loses every row to the rules but keeps its dimension row
    assert_eq!(households.lines().count(), 1 + 4);

    let calendar = fs::read_to_string(fx.out.join(DIM_CALENDAR)).unwrap();
    assert_eq!(calendar.lines().count(), 1 + 711);

    let json = fs::read_to_string(fx.out.join(AUDIT_JSON)).unwrap();
    let audit: AuditReport = serde_json::from_str(&json).unwrap();
    assert_eq!(audit, output.audit);

    let log = fs::read_to_string(fx.out.join(CHANGELOG)).unwrap();
    assert!(log.contains("## Issue 1:"));
}

#[test]
fn test_same_input_same_fingerprint() {
    let fx = fixture(TRANSACTIONS);

    let first = run(&fx, CleaningConfig::default()).unwrap();
    let second = run(
        &fx,
        CleaningConfig {
            chunk_size: 1,
            ..CleaningConfig::default()
        },
    )
    .unwrap();

    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
}

#[test]
fn test_malformed_row_policies() {
    let broken = TRANSACTIONS.replace("3,102,3,30,100,2.00", "3,102,3,30,lots,2.00");
    let fx = fixture(&broken);

    let err = run(&fx, CleaningConfig::default()).unwrap_err();
    assert!(err.to_string().contains("transactions row 5"));
    assert!(err.to_string().contains("QUANTITY"));

    let output = run(
        &fx,
        CleaningConfig {
            parse_error_policy: ParseErrorPolicy::Skip,
            ..CleaningConfig::default()
        },
    )
    .unwrap();

    assert_eq!(output.audit.count(PARSE_REJECTED), 1);
    assert_eq!(output.audit.count("loyalty_token"), 0);
    assert!(output.is_consistent());
}

#[test]
fn test_config_file_thresholds() {
    let fx = fixture(TRANSACTIONS);
    let config_path = write(
        fx.transactions.parent().unwrap(),
        "cleaning.toml",
        "quantity_cap = 500\nunit_price_floor = 0.01\n",
    );

    let config = CleaningConfig::from_file(&config_path).unwrap();
    let output = run(&fx, config).unwrap();

    assert_eq!(output.audit.count("quantity_cap"), 0);
    assert_eq!(output.audit.count("loyalty_token"), 0);
    assert_eq!(output.dataset.len(), 6);
}

#[test]
fn test_promotions_written_alongside_transactions() {
    let fx = fixture(TRANSACTIONS);
    let root = fx.transactions.parent().unwrap();
    let campaigns = write(
        root,
        "campaign_desc.csv",
        "DESCRIPTION,CAMPAIGN,START_DAY,END_DAY\nTypeB,24,659,719\nTypeA,8,412,460\n",
    );
    let redemptions = write(
        root,
        "coupon_redempt.csv",
        "household_key,DAY,COUPON_UPC,CAMPAIGN\n1,421,10000085364,8\n",
    );

    let config = CleaningConfig::default();
    let output = Pipeline::new(config.clone())
        .unwrap()
        .with_catalog(read_product_catalog(&fx.products).unwrap())
        .with_campaigns(read_campaigns(&campaigns).unwrap())
        .with_redemptions(read_redemptions(&redemptions).unwrap())
        .run(
            &read_transactions(&fx.transactions).unwrap(),
            &read_demographics(&fx.demographics).unwrap(),
        )
        .unwrap();

    // promotions never touch the transaction accounting
    assert_eq!(output.dataset.len(), 4);
    assert!(output.is_consistent());

    sink::write_all(&fx.out, &output, &config.demographic_sentinel).unwrap();

    let dim = fs::read_to_string(fx.out.join(DIM_CAMPAIGN)).unwrap();
    let lines: Vec<&str> = dim.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "TypeB,24,659,719,Targeted,2025-10-20,2025-12-19,60");
    assert_eq!(lines[2], "TypeA,8,412,460,Personalized,2025-02-15,2025-04-04,48");

    let facts = fs::read_to_string(fx.out.join(FACT_REDEMPTIONS)).unwrap();
    assert_eq!(facts.lines().nth(1), Some("1,421,10000085364,8,2025-02-24"));
}
