//! Hotel Bookings Example
//!
//! This example demonstrates:
//! - Loading a table from CSV text
//! - Selecting, filtering and adding columns
//! - Grouped summaries sorted by a computed column
//! - Joining a lookup table

use log::info;
use tidytable::{
    col, count_missing, ends_with, mean, n, starts_with, Aggregation, Assignment, CsvOptions,
    Position, Selector, SortKey, Table,
};

const BOOKINGS: &str = "\
hotel,is_canceled,lead_time,arrival_date_year,arrival_date_month,stays_in_weekend_nights,stays_in_week_nights,adults,children,country,adr
Resort Hotel,0,342,2015,July,0,0,2,0,PRT,0
Resort Hotel,0,737,2015,July,0,0,2,0,PRT,0
Resort Hotel,0,7,2015,July,0,1,1,0,GBR,75
Resort Hotel,0,13,2015,July,0,1,1,0,GBR,75
Resort Hotel,1,14,2015,July,0,2,2,0,GBR,98
Resort Hotel,0,0,2016,August,2,3,2,1,ESP,151.2
City Hotel,0,6,2016,August,0,2,2,,PRT,58.67
City Hotel,1,88,2016,August,0,4,2,0,PRT,76.5
City Hotel,0,65,2017,May,1,2,1,0,FRA,107
City Hotel,0,3,2017,May,1,1,2,2,DEU,156.6
City Hotel,1,107,2017,May,2,5,2,0,,103
";

const COUNTRIES: &str = "\
country,country_name
PRT,Portugal
GBR,United Kingdom
ESP,Spain
FRA,France
";

fn main() -> tidytable::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    println!("=== TidyTable Hotel Bookings Example ===\n");

    // 1. Load
    println!("1. Loading bookings...");
    let bookings = Table::from_csv(BOOKINGS, &CsvOptions::default())?;
    info!("loaded {} bookings", bookings.len());
    println!("{}\n", bookings.head(5));

    // 2. Select
    println!("2. Stay lengths only...");
    let stays = bookings.select(&[
        Selector::from("hotel"),
        starts_with("stays_"),
        ends_with("_nights"),
    ])?;
    println!("{}\n", stays.head(3));

    // 3. Mutate
    println!("3. Adding a kids flag and total nights...");
    let enriched = bookings.mutate(
        vec![
            Assignment::new("kids", |row| {
                Ok(row
                    .get_i64("children")?
                    .map(|c| if c > 0 { "children" } else { "none" }))
            }),
            Assignment::new("nights", |row| {
                let weekend = row.get_i64("stays_in_weekend_nights")?;
                let week = row.get_i64("stays_in_week_nights")?;
                Ok(weekend.zip(week).map(|(a, b)| a + b))
            }),
        ],
        Position::after("adults"),
    )?;
    println!("{:?}\n", enriched.column_names());

    // 4. Filter, group and summarize
    println!("4. Average daily rate of kept bookings...");
    let summary = enriched
        .filter_all(&[col("is_canceled").eq(0), col("kids").is_not_null()])?
        .group_by(&["hotel", "kids"])?
        .summarize(&[
            Aggregation::new("n", n()),
            Aggregation::new("mean_adr", mean("adr")),
            Aggregation::new("missing_country", count_missing("country")),
        ])?
        .arrange(&[SortKey::desc("mean_adr")])?;
    println!("{}\n", summary);

    // 5. Text filters
    println!("5. Long lead times outside Portugal...");
    let far = bookings.filter_expr("lead_time > 10 AND country NOT IN ('PRT') AND country IS NOT NULL")?;
    println!("{}\n", far.select_columns(&["hotel", "lead_time", "country"])?);

    // 6. Join
    println!("6. Attaching country names...");
    let countries = Table::from_csv(COUNTRIES, &CsvOptions::default())?;
    let named = bookings
        .select_columns(&["hotel", "country", "adr"])?
        .left_join(&countries, &["country"])?;
    println!("{}\n", named);

    println!("   Bookings per country:");
    println!("{}", named.count(&["country_name"])?);

    println!("\n=== Example Complete ===");
    Ok(())
}
