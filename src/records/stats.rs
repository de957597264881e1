//! Dashboard numbers: average/best/shortest and the chart series.

use serde::Serialize;
use time::Date;

use super::repo_types::{iso_date, Record};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub average: Option<f64>,
    pub best: Option<f64>,
    pub shortest: Option<f64>,
    /// Oldest first.
    pub trend: Vec<TrendPoint>,
}

pub fn summarize(records: &[Record]) -> Summary {
    let count = records.len();
    let amounts = records.iter().map(|r| r.amount);
    let best = amounts.clone().reduce(f64::max);
    let shortest = amounts.clone().reduce(f64::min);
    let average = (count > 0).then(|| amounts.sum::<f64>() / count as f64);

    let mut trend: Vec<TrendPoint> = records
        .iter()
        .map(|r| TrendPoint {
            date: r.date,
            amount: r.amount,
        })
        .collect();
    trend.sort_by_key(|p| p.date);

    Summary {
        count,
        average,
        best,
        shortest,
        trend,
    }
}
