//! Column coercion: every non-null SQL value becomes a string, SQL `NULL`
//! becomes `None`.
//!
//! Known types are decoded and rendered close to the database's own text
//! output. Anything else is read as text, or as raw bytes when it is not
//! valid UTF-8, so no non-null column is ever dropped.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{
    mysql::MySqlRow,
    postgres::{
        types::{PgInterval, PgMoney, PgTimeTz},
        PgRow,
    },
    sqlite::SqliteRow,
    types::{ipnetwork::IpNetwork, Decimal},
    Column, ColumnIndex, Decode, Row, TypeInfo, ValueRef,
};
use tracing::debug;

/// Rows that can render a column as text.
pub(crate) trait ColumnText: Row {
    /// # Errors
    /// Returns the driver error if the value cannot be decoded.
    fn column_text(&self, index: usize) -> Result<Option<String>, sqlx::Error>;
}

/// Render every column of a row as `(name, value)`, in select order.
pub(crate) fn columns<R: ColumnText>(row: &R) -> Result<Vec<(String, Option<String>)>, sqlx::Error> {
    row.columns()
        .iter()
        .map(|column| Ok((column.name().to_string(), row.column_text(column.ordinal())?)))
        .collect()
}

/// Type name of a non-null value, `None` for SQL `NULL`.
fn value_type<R>(row: &R, index: usize) -> Result<Option<String>, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
{
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(None);
    }

    Ok(Some(raw.type_info().name().to_uppercase()))
}

fn bool_text(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

fn bytes_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

/// Last resort for types without a dedicated decoder.
fn fallback_text<R>(row: &R, index: usize, type_name: &str) -> Result<String, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> String: Decode<'r, R::Database>,
    for<'r> Vec<u8>: Decode<'r, R::Database>,
{
    debug!("column {index}: no decoder for {type_name}, reading it as text");

    match row.try_get_unchecked::<String, _>(index) {
        Ok(text) => Ok(text),
        Err(_) => Ok(bytes_text(&row.try_get_unchecked::<Vec<u8>, _>(index)?)),
    }
}

/// Postgres array literal, `{a,b}`, quoting elements that need it.
fn array_text<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: ToString,
{
    let items: Vec<String> = items
        .into_iter()
        .map(|item| {
            let item = item.to_string();
            let plain = !item.is_empty()
                && !item.eq_ignore_ascii_case("null")
                && !item
                    .chars()
                    .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace());
            if plain {
                item
            } else {
                format!("\"{}\"", item.replace('\\', "\\\\").replace('"', "\\\""))
            }
        })
        .collect();

    format!("{{{}}}", items.join(","))
}

/// Postgres style interval: `1 year 2 mons 3 days 04:05:06.5`.
fn interval_text(months: i32, days: i32, microseconds: i64) -> String {
    fn unit(value: i32, singular: &str, plural: &str) -> Option<String> {
        match value {
            0 => None,
            1 | -1 => Some(format!("{value} {singular}")),
            _ => Some(format!("{value} {plural}")),
        }
    }

    let mut parts: Vec<String> = [
        unit(months / 12, "year", "years"),
        unit(months % 12, "mon", "mons"),
        unit(days, "day", "days"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if microseconds != 0 || parts.is_empty() {
        let sign = if microseconds < 0 { "-" } else { "" };
        let total = microseconds.unsigned_abs();
        let (secs, micros) = (total / 1_000_000, total % 1_000_000);
        let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);

        let mut clock = format!("{sign}{h:02}:{m:02}:{s:02}");
        if micros != 0 {
            let fraction = format!("{micros:06}");
            clock.push('.');
            clock.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

/// `inet` prints hosts without their full-length prefix, `cidr` always with it.
fn inet_text(network: IpNetwork, always_prefix: bool) -> String {
    let host_prefix = if network.is_ipv4() { 32 } else { 128 };
    if !always_prefix && network.prefix() == host_prefix {
        network.ip().to_string()
    } else {
        network.to_string()
    }
}

impl ColumnText for PgRow {
    fn column_text(&self, index: usize) -> Result<Option<String>, sqlx::Error> {
        let Some(type_name) = value_type(self, index)? else {
            return Ok(None);
        };

        let text = match type_name.as_str() {
            "BOOL" => bool_text(self.try_get::<bool, _>(index)?),
            "INT2" => self.try_get::<i16, _>(index)?.to_string(),
            "INT4" => self.try_get::<i32, _>(index)?.to_string(),
            "INT8" => self.try_get::<i64, _>(index)?.to_string(),
            "FLOAT4" => self.try_get::<f32, _>(index)?.to_string(),
            "FLOAT8" => self.try_get::<f64, _>(index)?.to_string(),
            "NUMERIC" => self.try_get::<Decimal, _>(index)?.to_string(),
            "MONEY" => self.try_get::<PgMoney, _>(index)?.to_decimal(2).to_string(),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
                self.try_get::<String, _>(index)?
            }
            "UUID" => self.try_get::<uuid::Uuid, _>(index)?.to_string(),
            "TIMESTAMP" => self.try_get::<NaiveDateTime, _>(index)?.to_string(),
            "TIMESTAMPTZ" => self.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339(),
            "DATE" => self.try_get::<NaiveDate, _>(index)?.to_string(),
            "TIME" => self.try_get::<NaiveTime, _>(index)?.to_string(),
            "TIMETZ" => {
                let value = self.try_get::<PgTimeTz<NaiveTime, FixedOffset>, _>(index)?;
                format!("{}{}", value.time, value.offset)
            }
            "INTERVAL" => {
                let value = self.try_get::<PgInterval, _>(index)?;
                interval_text(value.months, value.days, value.microseconds)
            }
            "INET" => inet_text(self.try_get::<IpNetwork, _>(index)?, false),
            "CIDR" => inet_text(self.try_get::<IpNetwork, _>(index)?, true),
            "JSON" | "JSONB" => self.try_get::<serde_json::Value, _>(index)?.to_string(),
            "BYTEA" => bytes_text(&self.try_get::<Vec<u8>, _>(index)?),
            "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
                array_text(self.try_get::<Vec<String>, _>(index)?)
            }
            "INT2[]" => array_text(self.try_get::<Vec<i16>, _>(index)?),
            "INT4[]" => array_text(self.try_get::<Vec<i32>, _>(index)?),
            "INT8[]" => array_text(self.try_get::<Vec<i64>, _>(index)?),
            "FLOAT8[]" => array_text(self.try_get::<Vec<f64>, _>(index)?),
            "NUMERIC[]" => array_text(self.try_get::<Vec<Decimal>, _>(index)?),
            "UUID[]" => array_text(self.try_get::<Vec<uuid::Uuid>, _>(index)?),
            "BOOL[]" => array_text(
                self.try_get::<Vec<bool>, _>(index)?
                    .into_iter()
                    .map(bool_text),
            ),
            other => fallback_text(self, index, other)?,
        };

        Ok(Some(text))
    }
}

impl ColumnText for MySqlRow {
    fn column_text(&self, index: usize) -> Result<Option<String>, sqlx::Error> {
        let Some(type_name) = value_type(self, index)? else {
            return Ok(None);
        };

        // MySQL integers decode from any width; pick signedness from the name.
        let text = match type_name.as_str() {
            name if name.ends_with(" UNSIGNED") => {
                self.try_get_unchecked::<u64, _>(index)?.to_string()
            }
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                self.try_get_unchecked::<i64, _>(index)?.to_string()
            }
            "FLOAT" => self.try_get_unchecked::<f32, _>(index)?.to_string(),
            "DOUBLE" => self.try_get_unchecked::<f64, _>(index)?.to_string(),
            "DATETIME" | "TIMESTAMP" => self.try_get::<NaiveDateTime, _>(index)?.to_string(),
            "DATE" => self.try_get::<NaiveDate, _>(index)?.to_string(),
            "TIME" => self.try_get::<NaiveTime, _>(index)?.to_string(),
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
                bytes_text(&self.try_get_unchecked::<Vec<u8>, _>(index)?)
            }
            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" | "DECIMAL" | "JSON" => self.try_get_unchecked::<String, _>(index)?,
            other => fallback_text(self, index, other)?,
        };

        Ok(Some(text))
    }
}

impl ColumnText for SqliteRow {
    fn column_text(&self, index: usize) -> Result<Option<String>, sqlx::Error> {
        // SQLite reports the storage class of the value itself.
        let Some(type_name) = value_type(self, index)? else {
            return Ok(None);
        };

        let text = match type_name.as_str() {
            "INTEGER" | "BOOLEAN" => self.try_get_unchecked::<i64, _>(index)?.to_string(),
            "REAL" | "NUMERIC" => self.try_get_unchecked::<f64, _>(index)?.to_string(),
            "TEXT" | "DATE" | "TIME" | "DATETIME" => self.try_get_unchecked::<String, _>(index)?,
            "BLOB" => bytes_text(&self.try_get_unchecked::<Vec<u8>, _>(index)?),
            "NULL" => return Ok(None),
            other => fallback_text(self, index, other)?,
        };

        Ok(Some(text))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sqlx::{Connection, SqliteConnection};
    use std::{net::IpAddr, str::FromStr};

    #[test]
    fn bools_render_as_digits() {
        assert_eq!(bool_text(true), "1");
        assert_eq!(bool_text(false), "0");
    }

    #[test]
    fn bytes_render_lossy() {
        assert_eq!(bytes_text(b"alice"), "alice");
        assert_eq!(bytes_text(&[0x61, 0xff]), "a\u{fffd}");
    }

    #[test]
    fn arrays_render_as_postgres_literals() {
        assert_eq!(array_text([1, 2, 3]), "{1,2,3}");
        assert_eq!(array_text(Vec::<String>::new()), "{}");
        assert_eq!(
            array_text(["admin", "two words", "a,b", "", "say \"hi\""]),
            r#"{admin,"two words","a,b","","say \"hi\""}"#
        );
    }

    #[test]
    fn intervals_render_like_postgres() {
        assert_eq!(interval_text(0, 0, 0), "00:00:00");
        assert_eq!(interval_text(14, 3, 0), "1 year 2 mons 3 days");
        assert_eq!(interval_text(1, 1, 14_706_500_000), "1 mon 1 day 04:05:06.5");
        assert_eq!(interval_text(0, 0, -90_000_000), "-00:01:30");
    }

    #[test]
    fn inet_hides_host_prefix_cidr_keeps_it() {
        let host = IpNetwork::new(IpAddr::from_str("192.168.0.10").unwrap(), 32).unwrap();
        assert_eq!(inet_text(host, false), "192.168.0.10");
        assert_eq!(inet_text(host, true), "192.168.0.10/32");

        let net = IpNetwork::new(IpAddr::from_str("10.0.0.0").unwrap(), 8).unwrap();
        assert_eq!(inet_text(net, false), "10.0.0.0/8");

        let v6 = IpNetwork::new(IpAddr::from_str("::1").unwrap(), 128).unwrap();
        assert_eq!(inet_text(v6, false), "::1");
    }

    #[tokio::test]
    async fn fallback_reads_text_then_bytes() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let row: SqliteRow = sqlx::query("SELECT '10.50' AS price, X'61FF' AS raw")
            .fetch_one(&mut conn)
            .await
            .unwrap();

        assert_eq!(fallback_text(&row, 0, "MONEY").unwrap(), "10.50");
        assert_eq!(fallback_text(&row, 1, "GEOMETRY").unwrap(), "a\u{fffd}");
    }

    #[tokio::test]
    async fn sqlite_row_columns() {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let row: SqliteRow = sqlx::query(
            "SELECT 'alice' AS username, 50 AS \"group\", 1.5 AS score, NULL AS remember_token, X'6869' AS raw",
        )
        .fetch_one(&mut conn)
        .await
        .unwrap();

        assert_eq!(
            columns(&row).unwrap(),
            vec![
                ("username".to_string(), Some("alice".to_string())),
                ("group".to_string(), Some("50".to_string())),
                ("score".to_string(), Some("1.5".to_string())),
                ("remember_token".to_string(), None),
                ("raw".to_string(), Some("hi".to_string())),
            ]
        );
    }
}
