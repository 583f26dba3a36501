//! TidyTable - In-Memory Tidy Data Tables
//!
//! A small columnar table library for data wrangling: select, filter, arrange,
//! mutate, group and summarize, join and pivot. Tables are immutable values;
//! every operation returns a new table and leaves its input untouched.
//!
//! ```
//! use tidytable::{col, mean, Aggregation, CsvOptions, Table};
//!
//! let csv = "id,status,price\n1,stayed,100\n2,cancelled,80\n3,stayed,150\n";
//! let bookings = Table::from_csv(csv, &CsvOptions::default()).unwrap();
//!
//! let stayed = bookings.filter(&col("status").eq("stayed")).unwrap();
//! assert_eq!(stayed.len(), 2);
//!
//! let by_status = bookings
//!     .group_by(&["status"])
//!     .unwrap()
//!     .summarize(&[Aggregation::new("mean_price", mean("price"))])
//!     .unwrap();
//! assert_eq!(by_status.len(), 2);
//! ```

pub mod error;
pub mod column;
pub mod table;
pub mod expr;
pub mod select;
pub mod filter;
pub mod sort;
pub mod mutate;
pub mod group;
pub mod summarize;
pub mod join;
pub mod reshape;

pub use error::{Result, TableError};
pub use column::{Column, ColumnType, ColumnValue};
pub use table::{CsvOptions, RowView, Schema, Table, TableRowIterator};
pub use expr::{col, eval_expr, parse_expr, ColumnRef, CompareOp, Expr, Operand, Truth};
pub use select::{
    all_of, any_of, contains, ends_with, everything, last_col, matches, num_range, of_type,
    resolve_selectors, starts_with, Selector,
};
pub use sort::{SortKey, SortOrder};
pub use mutate::{Assignment, Position};
pub use group::{Group, GroupedTable};
pub use summarize::{
    count_missing, max, mean, min, n, range, unique, Aggregation, MultiAggregation, MultiReducer,
    Reducer,
};
pub use join::{JoinOptions, JoinType};
pub use reshape::{PivotLongerOptions, PivotWiderOptions};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn bookings() -> Table {
        let schema = Schema::new(vec![
            ("id".to_string(), ColumnType::Int64),
            ("status".to_string(), ColumnType::String),
            ("price".to_string(), ColumnType::Int64),
        ]);
        let mut table = Table::new(schema);
        for (id, status, price) in [(1, "stayed", 100), (2, "cancelled", 80), (3, "stayed", 150)] {
            let mut row = HashMap::new();
            row.insert("id".to_string(), ColumnValue::Int64(id));
            row.insert("status".to_string(), ColumnValue::String(status.to_string()));
            row.insert("price".to_string(), ColumnValue::Int64(price));
            table.append_row(row).unwrap();
        }
        table
    }

    const HOTELS: &str = "\
hotel,is_canceled,lead_time,arrival_date_year,arrival_date_month,stays_in_week_nights,adults,children,country,adr
Resort Hotel,0,342,2015,July,0,2,0,PRT,0
Resort Hotel,0,7,2015,July,1,1,0,GBR,75
Resort Hotel,1,13,2015,July,1,1,0,GBR,75
City Hotel,0,6,2016,August,2,2,,PRT,98
City Hotel,1,88,2016,August,4,2,1,,76.5
City Hotel,0,0,2017,May,2,1,0,ESP,107
";

    fn hotels() -> Table {
        Table::from_csv(HOTELS, &CsvOptions::default()).unwrap()
    }

    #[test]
    fn test_filter_scenario() {
        init_logging();
        let stayed = bookings().filter_expr("status == 'stayed'").unwrap();
        let ids: Vec<i64> = stayed.column("id").unwrap().iter().filter_map(ColumnValue::as_i64).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_count_scenario() {
        let out = bookings().summarize(&[Aggregation::new("count", n())]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get_value(0, "count").unwrap(), &ColumnValue::Int64(3));
    }

    #[test]
    fn test_grouped_mean_scenario() {
        let out = bookings()
            .group_by(&["status"])
            .unwrap()
            .summarize(&[Aggregation::new("mean", mean("price"))])
            .unwrap();
        assert_eq!(out.len(), 2);
        // ascending key order
        assert_eq!(out.get_value(0, "status").unwrap().as_string(), Some("cancelled"));
        assert_eq!(out.get_value(0, "mean").unwrap(), &ColumnValue::Float64(80.0));
        assert_eq!(out.get_value(1, "status").unwrap().as_string(), Some("stayed"));
        assert_eq!(out.get_value(1, "mean").unwrap(), &ColumnValue::Float64(125.0));
    }

    #[test]
    fn test_filter_rows_satisfy_predicate() {
        let t = hotels();
        let predicates = [
            "adr > 70",
            "children == 0 OR country IS NULL",
            "hotel != 'City Hotel' AND lead_time <= 13",
            "country NOT IN ('PRT')",
        ];
        for text in predicates {
            let expr = parse_expr(text).unwrap();
            let out = t.filter(&expr).unwrap();
            assert!(out.len() <= t.len());
            for row in out.iter_rows() {
                assert_eq!(eval_expr(&expr, &row).unwrap(), Truth::True, "{}", text);
            }
        }
    }

    #[test]
    fn test_summarize_row_counts() {
        let t = hotels();
        let grouped = t.group_by(&["hotel", "arrival_date_year"]).unwrap();
        let out = grouped.summarize(&[Aggregation::new("n", n())]).unwrap();
        assert_eq!(out.len(), t.distinct(&["hotel", "arrival_date_year"]).unwrap().len());
        assert_eq!(out.len(), grouped.len());

        let everything = t.summarize(&[Aggregation::new("n", n())]).unwrap();
        assert_eq!(everything.len(), 1);
    }

    #[test]
    fn test_join_never_matches_missing_keys() {
        let t = hotels();
        let countries = Table::from_csv(
            "country,name\nPRT,Portugal\nGBR,United Kingdom\n,Nowhere\n",
            &CsvOptions::default(),
        )
        .unwrap();
        let out = t.inner_join(&countries, &["country"]).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out.column("country").unwrap().null_count(), 0);
        for row in out.iter_rows() {
            let code = row.get_str("country").unwrap();
            let name = row.get_str("name").unwrap();
            let expected = match code {
                Some("PRT") => Some("Portugal"),
                Some("GBR") => Some("United Kingdom"),
                _ => None,
            };
            assert_eq!(name, expected);
        }
    }

    #[test]
    fn test_pivot_round_trip() {
        let long = Table::from_csv(
            "hotel,day,bookings\nCity,Mon,10\nCity,Tue,12\nResort,Mon,4\nResort,Tue,6\n",
            &CsvOptions::default(),
        )
        .unwrap();
        let wide = long.pivot_wider("day", "bookings").unwrap();
        let back = wide
            .pivot_longer(&[!Selector::from("hotel")], "day", "bookings")
            .unwrap();

        let triples = |t: &Table| -> BTreeSet<(String, String, String)> {
            t.iter_rows()
                .map(|row| {
                    (
                        row.get("hotel").unwrap().to_string(),
                        row.get("day").unwrap().to_string(),
                        row.get("bookings").unwrap().to_string(),
                    )
                })
                .collect()
        };
        assert_eq!(triples(&back), triples(&long));
        assert_eq!(back.len(), long.len());
    }

    #[test]
    fn test_notebook_pipeline() {
        init_logging();
        let t = hotels();

        let kids = t
            .mutate(
                vec![Assignment::new("kids", |row| {
                    Ok(row.get_i64("children")?.map(|c| if c > 0 { "children" } else { "none" }))
                })],
                Position::after("adults"),
            )
            .unwrap();
        assert_eq!(kids.column_names()[7], "kids");

        let out = kids
            .filter_all(&[col("is_canceled").eq(0), col("kids").is_not_null()])
            .unwrap()
            .group_by(&["hotel", "kids"])
            .unwrap()
            .summarize(&[
                Aggregation::new("n", n()),
                Aggregation::new("mean_adr", mean("adr")),
            ])
            .unwrap()
            .arrange(&[SortKey::desc("mean_adr")])
            .unwrap();

        assert_eq!(out.column_names(), vec!["hotel", "kids", "n", "mean_adr"]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get_value(0, "hotel").unwrap().as_string(), Some("City Hotel"));
        assert_eq!(out.get_value(0, "mean_adr").unwrap(), &ColumnValue::Float64(107.0));
        assert_eq!(out.get_value(1, "n").unwrap(), &ColumnValue::Int64(2));
        assert_eq!(out.get_value(1, "mean_adr").unwrap(), &ColumnValue::Float64(37.5));
    }

    #[test]
    fn test_weekday_reshape_uses_level_order() {
        let long = Table::from_csv(
            "day,hotel,n\nWed,City,3\nMon,City,1\nTue,Resort,2\nMon,Resort,5\n",
            &CsvOptions::default(),
        )
        .unwrap()
        .factor("day", &["Mon", "Tue", "Wed"])
        .unwrap();

        let totals = long
            .group_by(&["day"])
            .unwrap()
            .reframe(&[MultiAggregation::new("n_range", range("n"))])
            .unwrap();
        let days: Vec<String> = totals.column("day").unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(days, vec!["Mon", "Mon", "Tue", "Tue", "Wed", "Wed"]);

        let wide = long
            .arrange(&[SortKey::asc("day")])
            .unwrap()
            .pivot_wider("day", "n")
            .unwrap();
        assert_eq!(wide.column_names(), vec!["hotel", "Mon", "Tue", "Wed"]);
    }

    #[test]
    fn test_operations_leave_input_untouched() {
        let t = hotels();
        let before = t.clone();
        let _ = t.filter_expr("adr > 'x'");
        let _ = t.select_columns(&["nope"]);
        let _ = t.pivot_wider("hotel", "adr");
        assert_eq!(t, before);
    }
}
