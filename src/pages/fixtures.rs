//! Small in-memory datasets shared by the page tests.

use crate::source::{Table, Value};
use chrono::NaiveDate;

fn day(y: i32, m: u32, d: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn n(v: f64) -> Value {
    Value::Number(v)
}

fn t(s: &str) -> Value {
    Value::text(s)
}

pub fn campaign() -> Table {
    Table::infer(
        &[
            "date", "channel", "region", "campaign_type", "impressions", "clicks", "conversions", "spend", "revenue",
            "ctr", "cpa", "roas",
        ],
        vec![
            vec![day(2024, 1, 1), t("Search"), t("North"), t("Brand"), n(1000.0), n(50.0), n(20.0), n(200.0), n(500.0), n(0.05), n(10.0), n(2.5)],
            vec![day(2024, 1, 2), t("Email"), t("South"), t("Promo"), n(800.0), n(40.0), n(10.0), n(100.0), n(200.0), n(0.05), n(10.0), n(2.0)],
            vec![day(2024, 1, 3), t("Search"), t("South"), t("Brand"), n(1200.0), n(60.0), n(20.0), n(220.0), n(500.0), n(0.05), n(11.0), n(2.5)],
            vec![day(2024, 1, 4), t("Social"), t("North"), t("Promo"), n(600.0), n(30.0), n(10.0), n(150.0), n(400.0), n(0.05), n(15.0), n(3.0)],
        ],
    )
    .unwrap()
}

pub fn customers() -> Table {
    Table::infer(
        &[
            "customer_id", "age", "income", "lifetime_value", "satisfaction_score", "customer_segment",
            "acquisition_channel", "nps_category", "churn", "number_of_purchases", "engagement_score",
        ],
        vec![
            vec![n(1.0), n(25.0), n(40000.0), n(1000.0), n(4.0), t("Budget"), t("Email"), t("Promoter"), n(0.0), n(5.0), n(70.0)],
            vec![n(2.0), n(35.0), n(60000.0), n(2000.0), n(3.0), t("Budget"), t("Search"), t("Passive"), n(1.0), n(3.0), n(50.0)],
            vec![n(3.0), n(45.0), n(80000.0), n(3000.0), n(5.0), t("Premium"), t("Search"), t("Promoter"), n(0.0), n(10.0), n(90.0)],
            vec![n(4.0), n(55.0), n(100000.0), n(4500.0), n(2.0), t("Premium"), t("Social"), t("Detractor"), n(1.0), n(2.0), n(30.0)],
            vec![n(5.0), n(30.0), n(50000.0), n(1500.0), n(4.0), t("Standard"), t("Email"), t("Promoter"), n(0.0), n(6.0), n(60.0)],
            vec![n(6.0), n(40.0), n(70000.0), n(2500.0), n(3.0), t("Standard"), t("Social"), t("Passive"), n(0.0), n(4.0), n(55.0)],
        ],
    )
    .unwrap()
}

pub fn products() -> Table {
    Table::infer(
        &[
            "product_name", "category", "subcategory", "region", "quarter", "year", "sales", "units_sold", "profit",
            "profit_margin", "avg_rating", "review_count", "return_rate",
        ],
        vec![
            vec![t("Laptop"), t("Electronics"), t("Computers"), t("North"), t("Q1 2023"), n(2023.0), n(5000.0), n(5.0), n(1000.0), n(20.0), n(4.5), n(10.0), n(2.0)],
            vec![t("Phone"), t("Electronics"), t("Mobile"), t("South"), t("Q2 2023"), n(2023.0), n(3000.0), n(10.0), n(900.0), n(30.0), n(4.0), n(20.0), n(4.0)],
            vec![t("Laptop"), t("Electronics"), t("Computers"), t("South"), t("Q1 2024"), n(2024.0), n(4000.0), n(4.0), n(800.0), n(20.0), n(4.5), n(5.0), n(2.0)],
            vec![t("Sofa"), t("Furniture"), t("Living"), t("North"), t("Q3 2023"), n(2023.0), n(1500.0), n(3.0), n(150.0), n(10.0), n(3.5), n(8.0), n(6.0)],
            vec![t("Desk"), t("Furniture"), t("Office"), t("North"), t("Q1 2024"), n(2024.0), n(500.0), n(2.0), n(100.0), n(20.0), n(4.0), n(2.0), n(1.0)],
        ],
    )
    .unwrap()
}

pub fn geography() -> Table {
    Table::infer(
        &[
            "state", "region", "revenue", "customers", "market_penetration", "yoy_growth", "satisfaction",
        ],
        vec![
            vec![t("Maharashtra"), t("West"), n(900.0), n(300.0), n(12.0), n(15.0), n(4.2)],
            vec![t("Karnataka"), t("South"), n(700.0), n(250.0), n(10.0), n(22.0), n(4.4)],
            vec![t("Delhi"), t("North"), n(650.0), n(280.0), n(14.0), n(8.0), n(4.0)],
            vec![t("Kerala"), t("South"), n(300.0), n(90.0), n(6.0), n(18.0), n(4.6)],
            vec![t("Bihar"), t("East"), n(150.0), n(60.0), n(3.0), n(5.0), n(3.8)],
        ],
    )
    .unwrap()
}

pub fn attribution() -> Table {
    Table::infer(
        &["channel", "first_touch", "last_touch", "linear"],
        vec![
            vec![t("Search"), n(40.0), n(20.0), n(30.0)],
            vec![t("Email"), n(10.0), n(35.0), n(20.0)],
            vec![t("Social"), n(30.0), n(30.0), n(30.0)],
        ],
    )
    .unwrap()
}

pub fn funnel() -> Table {
    Table::infer(
        &["stage", "visitors"],
        vec![
            vec![t("Awareness"), n(10000.0)],
            vec![t("Interest"), n(5000.0)],
            vec![t("Consideration"), n(2000.0)],
            vec![t("Purchase"), n(500.0)],
        ],
    )
    .unwrap()
}

pub fn correlations() -> Table {
    Table::infer(
        &["variable", "spend", "revenue", "churn"],
        vec![
            vec![t("spend"), n(1.0), n(0.85), n(-0.2)],
            vec![t("revenue"), n(0.85), n(1.0), n(-0.75)],
            vec![t("churn"), n(-0.2), n(-0.75), n(1.0)],
        ],
    )
    .unwrap()
}

pub fn journey() -> Table {
    Table::infer(
        &["customer_id", "touchpoint", "step", "converted"],
        vec![
            vec![n(1.0), t("Search"), n(1.0), n(0.0)],
            vec![n(1.0), t("Email"), n(2.0), n(1.0)],
            vec![n(2.0), t("Search"), n(1.0), n(0.0)],
            vec![n(2.0), t("Social"), n(2.0), n(0.0)],
            vec![n(3.0), t("Search"), n(1.0), n(1.0)],
        ],
    )
    .unwrap()
}

pub fn leads() -> Table {
    Table::infer(
        &["lead_id", "actual_converted", "predicted_class", "predicted_probability"],
        vec![
            vec![n(1.0), n(0.0), n(0.0), n(0.1)],
            vec![n(2.0), n(0.0), n(1.0), n(0.6)],
            vec![n(3.0), n(1.0), n(1.0), n(0.8)],
            vec![n(4.0), n(1.0), n(1.0), n(0.9)],
        ],
    )
    .unwrap()
}

pub fn features() -> Table {
    Table::infer(
        &["feature", "importance", "std"],
        vec![
            vec![t("page_views"), n(0.35), n(0.02)],
            vec![t("email_opens"), n(0.25), n(0.03)],
            vec![t("time_on_site"), n(0.2), n(0.01)],
            vec![t("company_size"), n(0.15), n(0.02)],
            vec![t("industry"), n(0.05), n(0.01)],
        ],
    )
    .unwrap()
}

pub fn learning() -> Table {
    Table::infer(
        &["training_size", "train_score", "validation_score"],
        vec![
            vec![n(100.0), n(0.95), n(0.70)],
            vec![n(500.0), n(0.92), n(0.80)],
            vec![n(1000.0), n(0.90), n(0.85)],
        ],
    )
    .unwrap()
}
