use std::io::Read;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// One parsed CSV row, or the reason it could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParsedRow {
    Valid {
        line: u64,
        date: NaiveDate,
        revenue: Decimal,
        ads_spend: Decimal,
    },
    Rejected {
        line: u64,
        reason: String,
    },
}

/// Reads a daily activity export with `Date`, `Revenue` and an optional `Ads Spend` column.
pub(crate) fn parse_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for (index, record) in csv_reader.deserialize::<ActivityRow>().enumerate() {
        // header occupies line 1
        let line = index as u64 + 2;
        let row = record?;
        rows.push(row.into_parsed(line));
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ActivityRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Revenue")]
    revenue: String,
    #[serde(rename = "Ads Spend", default, deserialize_with = "empty_string_as_none")]
    ads_spend: Option<String>,
}

impl ActivityRow {
    fn into_parsed(self, line: u64) -> ParsedRow {
        let date = match NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => {
                return ParsedRow::Rejected {
                    line,
                    reason: format!("invalid date '{}'", self.date),
                }
            }
        };

        let revenue = match parse_amount(&self.revenue) {
            Some(amount) => amount,
            None => {
                return ParsedRow::Rejected {
                    line,
                    reason: format!("invalid revenue '{}'", self.revenue),
                }
            }
        };

        let ads_spend = match self.ads_spend.as_deref() {
            None => Decimal::ZERO,
            Some(raw) => match parse_amount(raw) {
                Some(amount) => amount,
                None => {
                    return ParsedRow::Rejected {
                        line,
                        reason: format!("invalid ads spend '{raw}'"),
                    }
                }
            },
        };

        ParsedRow::Valid {
            line,
            date,
            revenue,
            ads_spend,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Accepts plain decimals plus the `$` prefix and `,` grouping spreadsheets add.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && *ch != '$')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}
