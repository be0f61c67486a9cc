//! Conversions between tiberius column data and SQL Doctor values

use crate::connection::MssqlConnectionError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqldoctor_core::{Result, Row, Value};
use std::borrow::Cow;
use tiberius::{ColumnData, Row as TiberiusRow};

/// Converts one tiberius result set, keeping column names on every row
pub(crate) fn convert_rows(rows: Vec<TiberiusRow>) -> Result<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = first.columns().iter().map(|c| c.name().to_string()).collect();

    rows.into_iter()
        .map(|row| {
            let values = row
                .into_iter()
                .map(column_data_to_value)
                .collect::<Result<Vec<_>>>()?;
            Ok(Row::new(columns.clone(), values))
        })
        .collect()
}

fn conversion_error(what: &str) -> sqldoctor_core::DoctorError {
    MssqlConnectionError::TypeConversion(format!("{} out of range", what)).into()
}

/// `days` after January 1st of `base_year`
fn date_from_days(base_year: i32, days: i64) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(base_year, 1, 1)
        .and_then(|base| base.checked_add_signed(chrono::Duration::days(days)))
        .ok_or_else(|| conversion_error("date"))
}

/// Time of day from a count of `10^-scale` second increments
fn time_from_increments(increments: u64, scale: u8) -> NaiveTime {
    let scale = u32::from(scale.min(9));
    let per_second = 10u64.pow(scale);
    let seconds = (increments / per_second) as u32;
    let nanos = ((increments % per_second) * 10u64.pow(9 - scale)) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos).unwrap_or_default()
}

fn datetime2_to_naive(value: tiberius::time::DateTime2) -> Result<NaiveDateTime> {
    let date = date_from_days(1, i64::from(value.date().days()))?;
    let time = time_from_increments(value.time().increments(), value.time().scale());
    Ok(NaiveDateTime::new(date, time))
}

/// Convert tiberius ColumnData to a SQL Doctor value
pub(crate) fn column_data_to_value(data: ColumnData<'static>) -> Result<Value> {
    let value = match data {
        ColumnData::Bit(v) => v.map(Value::Bool),
        ColumnData::U8(v) => v.map(|v| Value::Int16(i16::from(v))),
        ColumnData::I16(v) => v.map(Value::Int16),
        ColumnData::I32(v) => v.map(Value::Int32),
        ColumnData::I64(v) => v.map(Value::Int64),
        ColumnData::F32(v) => v.map(Value::Float32),
        ColumnData::F64(v) => v.map(Value::Float64),
        ColumnData::String(v) => v.map(|s| Value::String(s.into_owned())),
        ColumnData::Guid(v) => v.map(Value::Uuid),
        ColumnData::Binary(v) => v.map(|b| Value::Bytes(b.into_owned())),
        ColumnData::Numeric(v) => v.map(|n| Value::Decimal(n.to_string())),
        ColumnData::Xml(v) => v.map(|xml| Value::String(xml.into_owned().into_string())),
        ColumnData::DateTime(v) => match v {
            Some(dt) => {
                let date = date_from_days(1900, i64::from(dt.days()))?;
                // 1/300 second ticks
                let millis = u64::from(dt.seconds_fragments()) * 10 / 3;
                let time = NaiveTime::from_num_seconds_from_midnight_opt(
                    (millis / 1000) as u32,
                    ((millis % 1000) * 1_000_000) as u32,
                )
                .unwrap_or_default();
                Some(Value::DateTime(NaiveDateTime::new(date, time)))
            }
            None => None,
        },
        ColumnData::SmallDateTime(v) => match v {
            Some(dt) => {
                let date = date_from_days(1900, i64::from(dt.days()))?;
                let minutes = u32::from(dt.seconds_fragments());
                let time =
                    NaiveTime::from_num_seconds_from_midnight_opt(minutes * 60, 0).unwrap_or_default();
                Some(Value::DateTime(NaiveDateTime::new(date, time)))
            }
            None => None,
        },
        ColumnData::DateTime2(v) => match v {
            Some(dt) => Some(Value::DateTime(datetime2_to_naive(dt)?)),
            None => None,
        },
        ColumnData::DateTimeOffset(v) => match v {
            Some(dto) => {
                let naive = datetime2_to_naive(dto.datetime2())?;
                Some(Value::DateTimeUtc(DateTime::<Utc>::from_naive_utc_and_offset(
                    naive, Utc,
                )))
            }
            None => None,
        },
        ColumnData::Date(v) => match v {
            Some(d) => Some(Value::Date(date_from_days(1, i64::from(d.days()))?)),
            None => None,
        },
        ColumnData::Time(v) => v.map(|t| Value::Time(time_from_increments(t.increments(), t.scale()))),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Owned parameter values bound to a tiberius query
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TiberiusParam {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
}

impl tiberius::ToSql for TiberiusParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            TiberiusParam::Null => ColumnData::String(None),
            TiberiusParam::Bool(v) => ColumnData::Bit(Some(*v)),
            TiberiusParam::I16(v) => ColumnData::I16(Some(*v)),
            TiberiusParam::I32(v) => ColumnData::I32(Some(*v)),
            TiberiusParam::I64(v) => ColumnData::I64(Some(*v)),
            TiberiusParam::F32(v) => ColumnData::F32(Some(*v)),
            TiberiusParam::F64(v) => ColumnData::F64(Some(*v)),
            TiberiusParam::String(v) => ColumnData::String(Some(Cow::Borrowed(v.as_str()))),
            TiberiusParam::Bytes(v) => ColumnData::Binary(Some(Cow::Borrowed(v.as_slice()))),
            TiberiusParam::Uuid(v) => ColumnData::Guid(Some(*v)),
        }
    }
}

/// Converts values to bindable parameters; temporal and decimal values bind as text
pub(crate) fn values_to_tiberius_params(values: &[Value]) -> Vec<TiberiusParam> {
    values
        .iter()
        .map(|v| match v {
            Value::Null => TiberiusParam::Null,
            Value::Bool(b) => TiberiusParam::Bool(*b),
            Value::Int16(i) => TiberiusParam::I16(*i),
            Value::Int32(i) => TiberiusParam::I32(*i),
            Value::Int64(i) => TiberiusParam::I64(*i),
            Value::Float32(f) => TiberiusParam::F32(*f),
            Value::Float64(f) => TiberiusParam::F64(*f),
            Value::Decimal(s) | Value::String(s) => TiberiusParam::String(s.clone()),
            Value::Bytes(b) => TiberiusParam::Bytes(b.clone()),
            Value::Uuid(u) => TiberiusParam::Uuid(*u),
            Value::Date(d) => TiberiusParam::String(d.to_string()),
            Value::Time(t) => TiberiusParam::String(t.to_string()),
            Value::DateTime(dt) => TiberiusParam::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::DateTimeUtc(dt) => TiberiusParam::String(dt.to_rfc3339()),
        })
        .collect()
}
