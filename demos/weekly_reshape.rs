//! Weekly Reshape Example
//!
//! This example demonstrates:
//! - Categorical columns with an explicit level order
//! - Spreading a long table wide and gathering it back
//! - Multi-row summaries with reframe

use tidytable::{
    range, unique, ColumnValue, CsvOptions, MultiAggregation, PivotLongerOptions,
    PivotWiderOptions, Selector, SortKey, Table,
};

const ARRIVALS: &str = "\
hotel,weekday,arrivals
City Hotel,Wed,31
City Hotel,Mon,24
Resort Hotel,Mon,12
City Hotel,Fri,40
Resort Hotel,Sat,22
Resort Hotel,Wed,9
City Hotel,Sun,18
";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn main() -> tidytable::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    println!("=== TidyTable Weekly Reshape Example ===\n");

    let arrivals = Table::from_csv(ARRIVALS, &CsvOptions::default())?
        .factor("weekday", &WEEKDAYS)?
        .arrange(&[SortKey::asc("weekday")])?;
    println!("1. Arrivals in weekday order:");
    println!("{}\n", arrivals);

    println!("2. One column per weekday:");
    let wide = arrivals.pivot_wider_with(
        "weekday",
        "arrivals",
        &PivotWiderOptions {
            names_prefix: "day_".to_string(),
            values_fill: Some(ColumnValue::Int64(0)),
        },
    )?;
    println!("{}\n", wide);

    println!("3. Back to long form, dropping filled days:");
    let long = wide
        .pivot_longer_with(
            &[!Selector::from("hotel")],
            "weekday",
            "arrivals",
            &PivotLongerOptions {
                names_prefix: Some("day_".to_string()),
                values_drop_na: false,
            },
        )?
        .filter_expr("arrivals > 0")?;
    println!("{}\n", long);

    println!("4. Range and distinct weekdays per hotel:");
    let spread = arrivals.group_by(&["hotel"])?.reframe(&[
        MultiAggregation::new("arrival_range", range("arrivals")),
    ])?;
    println!("{}\n", spread);

    let days = arrivals
        .group_by(&["hotel"])?
        .reframe(&[MultiAggregation::new("weekday", unique("weekday"))])?;
    println!("{}", days);

    println!("\n=== Example Complete ===");
    Ok(())
}
