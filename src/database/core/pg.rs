//! PostgreSQL backend built on the blocking `postgres` client

use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};
use postgres::{Client, Column, NoTls, Row};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use super::backend::{Dialect, SqlBackend};
use super::error::{DbError, DbResult};
use super::value::{Record, SqlValue};
use crate::config::ConnectionConfig;

pub struct PostgresBackend {
    client: Client,
}

impl PostgresBackend {
    /// Connect using the given settings; unset fields fall back to driver defaults
    pub fn connect(config: &ConnectionConfig) -> DbResult<Self> {
        let mut pg = postgres::Config::new();
        if let Some(host) = &config.host {
            pg.host(host);
        }
        if let Some(port) = config.port {
            pg.port(port);
        }
        if let Some(dbname) = &config.dbname {
            pg.dbname(dbname);
        }
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }
        pg.application_name("pgutils");

        debug!("connecting to {}", config.describe());
        let client = pg.connect(NoTls).map_err(|e| {
            DbError::Connect(format!(
                "failed to connect to {}: {}",
                config.describe(),
                describe_pg_error(&e)
            ))
        })?;

        Ok(PostgresBackend { client })
    }
}

impl SqlBackend for PostgresBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn begin(&mut self) -> DbResult<()> {
        self.client.batch_execute("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        let params = bind(params);
        Ok(self.client.execute(sql, &params)?)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Record>> {
        let params = bind(params);
        let rows = self.client.query(sql, &params)?;
        rows.iter().map(pg_record).collect()
    }
}

fn bind(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn pg_record(row: &Row) -> DbResult<Record> {
    let columns = row.columns();
    let mut record = Record::with_capacity(columns.len());
    for (idx, col) in columns.iter().enumerate() {
        record.insert(col.name().to_string(), pg_value(row, idx, col)?);
    }
    Ok(record)
}

fn pg_value(row: &Row, idx: usize, col: &Column) -> DbResult<SqlValue> {
    fn get<'a, T, F>(row: &'a Row, idx: usize, f: F) -> Result<SqlValue, postgres::Error>
    where
        T: FromSql<'a>,
        F: FnOnce(T) -> SqlValue,
    {
        row.try_get::<_, Option<T>>(idx)
            .map(|v| v.map(f).unwrap_or(SqlValue::Null))
    }

    fn array<'a, T>(row: &'a Row, idx: usize) -> Result<SqlValue, postgres::Error>
    where
        T: FromSql<'a> + Into<serde_json::Value>,
    {
        get::<Vec<Option<T>>, _>(row, idx, |v| SqlValue::Json(serde_json::Value::from(v)))
    }

    let ty = col.type_();
    let typed = match *ty {
        Type::BOOL => get::<bool, _>(row, idx, SqlValue::Bool),
        Type::CHAR => get::<i8, _>(row, idx, |v| SqlValue::Int(v as i64)),
        Type::INT2 => get::<i16, _>(row, idx, |v| SqlValue::Int(v as i64)),
        Type::INT4 => get::<i32, _>(row, idx, |v| SqlValue::Int(v as i64)),
        Type::INT8 => get::<i64, _>(row, idx, SqlValue::Int),
        Type::OID => get::<u32, _>(row, idx, |v| SqlValue::Int(v as i64)),
        Type::FLOAT4 => get::<f32, _>(row, idx, |v| SqlValue::Float(v as f64)),
        Type::FLOAT8 => get::<f64, _>(row, idx, SqlValue::Float),
        // text keeps the exact scale, e.g. "12.50"
        Type::NUMERIC => get::<Decimal, _>(row, idx, |v| SqlValue::Text(v.to_string())),
        Type::UUID => get::<Uuid, _>(row, idx, |v| SqlValue::Text(v.to_string())),
        Type::BYTEA => get::<Vec<u8>, _>(row, idx, SqlValue::Bytes),
        Type::JSON | Type::JSONB => get::<serde_json::Value, _>(row, idx, SqlValue::Json),
        Type::TIMESTAMP => get::<NaiveDateTime, _>(row, idx, |v| {
            SqlValue::Text(v.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }),
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>, _>(row, idx, |v| SqlValue::Text(v.to_rfc3339()))
        }
        Type::DATE => get::<NaiveDate, _>(row, idx, |v| SqlValue::Text(v.to_string())),
        Type::TIME => get::<NaiveTime, _>(row, idx, |v| SqlValue::Text(v.to_string())),
        Type::BOOL_ARRAY => array::<bool>(row, idx),
        Type::INT2_ARRAY => array::<i16>(row, idx),
        Type::INT4_ARRAY => array::<i32>(row, idx),
        Type::INT8_ARRAY => array::<i64>(row, idx),
        Type::FLOAT4_ARRAY => array::<f32>(row, idx),
        Type::FLOAT8_ARRAY => array::<f64>(row, idx),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY | Type::BPCHAR_ARRAY | Type::NAME_ARRAY => {
            array::<String>(row, idx)
        }
        Type::UUID_ARRAY => get::<Vec<Option<Uuid>>, _>(row, idx, |v| {
            SqlValue::Json(serde_json::Value::from(
                v.into_iter()
                    .map(|u| u.map(|u| u.to_string()))
                    .collect::<Vec<_>>(),
            ))
        }),
        // TEXT, VARCHAR, BPCHAR, NAME, citext and other text-compatible types
        _ if <String as FromSql<'_>>::accepts(ty) => {
            get::<String, _>(row, idx, SqlValue::Text)
        }
        _ => get::<RawValue, _>(row, idx, |v| v.0),
    };

    // NaN numerics, multi-dimensional arrays and the like keep their wire bytes
    let value = typed.or_else(|e| {
        debug!(
            "column '{}' of type {} kept raw: {}",
            col.name(),
            ty.name(),
            e
        );
        get::<RawValue, _>(row, idx, |v| v.0)
    });

    value.map_err(|e| DbError::Decode {
        column: col.name().to_string(),
        type_name: ty.name().to_string(),
        reason: describe_pg_error(&e),
    })
}

/// Decoder of last resort, accepting any column type
///
/// Enums and domains over text become `Text`, intervals are rendered the way
/// psql shows them, everything else is returned as the binary wire value.
struct RawValue(SqlValue);

impl<'a> FromSql<'a> for RawValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match ty.kind() {
            Kind::Enum(_) => SqlValue::Text(std::str::from_utf8(raw)?.to_string()),
            Kind::Domain(inner) if <String as FromSql<'_>>::accepts(inner) => {
                SqlValue::Text(std::str::from_utf8(raw)?.to_string())
            }
            _ if *ty == Type::INTERVAL => SqlValue::Text(format_interval(raw)?),
            _ => SqlValue::Bytes(raw.to_vec()),
        };
        Ok(RawValue(value))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

/// Binary interval (microseconds, days, months) in psql's default style,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`
fn format_interval(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    if raw.len() != 16 {
        return Err(format!("interval must be 16 bytes, got {}", raw.len()).into());
    }
    let micros = i64::from_be_bytes(<[u8; 8]>::try_from(&raw[0..8])?);
    let days = i32::from_be_bytes(<[u8; 4]>::try_from(&raw[8..12])?);
    let months = i32::from_be_bytes(<[u8; 4]>::try_from(&raw[12..16])?);

    let unit = |n: i32, name: &str| {
        if n == 1 {
            format!("{} {}", n, name)
        } else {
            format!("{} {}s", n, name)
        }
    };

    let mut parts = Vec::new();
    if months / 12 != 0 {
        parts.push(unit(months / 12, "year"));
    }
    if months % 12 != 0 {
        parts.push(unit(months % 12, "mon"));
    }
    if days != 0 {
        parts.push(unit(days, "day"));
    }
    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let abs = micros.unsigned_abs();
        let secs = abs / 1_000_000;
        let mut time = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        let frac = abs % 1_000_000;
        if frac != 0 {
            time.push('.');
            time.push_str(format!("{:06}", frac).trim_end_matches('0'));
        }
        parts.push(time);
    }
    Ok(parts.join(" "))
}

/// Full text of a client error: server errors with severity, SQLSTATE,
/// message, detail and hint; other errors with their source chain
pub(crate) fn describe_pg_error(e: &postgres::Error) -> String {
    if let Some(db) = e.as_db_error() {
        let mut text = format!("{} {}: {}", db.severity(), db.code().code(), db.message());
        if let Some(detail) = db.detail() {
            text.push_str(&format!(" (detail: {})", detail));
        }
        if let Some(hint) = db.hint() {
            text.push_str(&format!(" (hint: {})", hint));
        }
        return text;
    }

    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    text
}

/// Parameters adapt to the type the server inferred for each placeholder.
impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql_checked(ty, out),
            SqlValue::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql_checked(ty, out),
                Type::OID => u32::try_from(*v)?.to_sql_checked(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql_checked(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Text(v) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(v)?.to_sql_checked(ty, out)
                }
                _ => v.to_sql_checked(ty, out),
            },
            SqlValue::Bytes(v) => v.to_sql_checked(ty, out),
            SqlValue::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
