//! Monthly macroeconomic metrics aligned to daily rows by (year, month).

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::imputer::impute;
use crate::domain::indicator::Metric;

/// Calendar month used as the macro grid key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Self {
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// First day of the month.
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

/// Metric columns on a uniform monthly grid, oldest month first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacroTable {
    columns: Vec<String>,
    months: Vec<YearMonth>,
    /// `values[c][m]` is column `c` at grid month `m`.
    values: Vec<Vec<Metric>>,
}

impl MacroTable {
    /// Build from dated rows. Each row must carry one value per column; short
    /// rows leave the remaining columns undefined. When a month appears twice
    /// the first row wins. Missing months inside the span become gaps.
    pub fn from_rows(columns: Vec<String>, rows: Vec<(NaiveDate, Vec<Metric>)>) -> Self {
        let mut by_month: BTreeMap<YearMonth, Vec<Metric>> = BTreeMap::new();
        for (date, values) in rows {
            let key = YearMonth::of(date);
            if by_month.contains_key(&key) {
                tracing::warn!(year = key.year, month = key.month, "duplicate macro month ignored");
                continue;
            }
            by_month.insert(key, values);
        }

        let mut table = Self {
            values: vec![Vec::new(); columns.len()],
            columns,
            months: Vec::new(),
        };
        let (Some(&first), Some(&last)) = (by_month.keys().next(), by_month.keys().next_back())
        else {
            return table;
        };

        table.months = month_range(first, last);
        for month in &table.months {
            let row = by_month.get(month);
            for (c, column) in table.values.iter_mut().enumerate() {
                column.push(row.and_then(|r| r.get(c).copied().flatten()));
            }
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn months(&self) -> &[YearMonth] {
        &self.months
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Widen the grid so it also spans every month in `months`. New months
    /// start as gaps.
    pub fn extend_to<I>(&mut self, months: I)
    where
        I: IntoIterator<Item = YearMonth>,
    {
        let mut bounds = self.months.first().copied().zip(self.months.last().copied());
        for m in months {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(m), hi.max(m)),
                None => (m, m),
            });
        }
        let Some((lo, hi)) = bounds else {
            return;
        };
        if self.months.first() == Some(&lo) && self.months.last() == Some(&hi) {
            return;
        }

        let grid = month_range(lo, hi);
        let offset = self
            .months
            .first()
            .map_or(0, |first| (first.ordinal() - lo.ordinal()) as usize);
        for column in &mut self.values {
            let mut widened = vec![None; grid.len()];
            widened[offset..offset + column.len()].copy_from_slice(column);
            *column = widened;
        }
        self.months = grid;
    }

    /// Fill each column's gaps by linear regression over the grid index.
    pub fn impute(&mut self) {
        for (name, column) in self.columns.iter().zip(self.values.iter_mut()) {
            let gaps = column.iter().filter(|v| v.is_none()).count();
            if gaps == 0 {
                continue;
            }
            *column = impute(column);
            tracing::debug!(metric = %name, gaps, "imputed macro metric");
        }
    }

    /// Value of `column` for the month containing `date`.
    pub fn value(&self, column: &str, date: NaiveDate) -> Metric {
        let c = self.columns.iter().position(|name| name == column)?;
        let m = self.month_index(YearMonth::of(date))?;
        self.values[c][m]
    }

    /// Values of `columns` for the month containing `date`, in the order given.
    pub fn lookup(&self, columns: &[String], date: NaiveDate) -> Vec<Metric> {
        columns.iter().map(|c| self.value(c, date)).collect()
    }

    /// Rows of the grid, oldest month first.
    pub fn rows(&self) -> impl Iterator<Item = (YearMonth, Vec<Metric>)> + '_ {
        self.months
            .iter()
            .enumerate()
            .map(|(m, &month)| (month, self.values.iter().map(|col| col[m]).collect()))
    }

    fn month_index(&self, month: YearMonth) -> Option<usize> {
        let first = self.months.first()?;
        let offset = month.ordinal() - first.ordinal();
        usize::try_from(offset)
            .ok()
            .filter(|&i| i < self.months.len())
    }
}

fn month_range(first: YearMonth, last: YearMonth) -> Vec<YearMonth> {
    (first.ordinal()..=last.ordinal())
        .map(YearMonth::from_ordinal)
        .collect()
}
