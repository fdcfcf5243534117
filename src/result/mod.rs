// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Result set handling for query results.
//!
//! A [`ResultSet`] walks the columnar row batches of one operation, fetching
//! the next page from its [`BatchSource`] once the current one is exhausted.

pub mod schema;
pub mod value;

use crate::error::{HiveError, HiveResult};
use crate::types::hs2::{TColumn, TFetchResultsResp, TRowSet, TTypedColumn};
use async_trait::async_trait;
use schema::{ColumnDesc, ScanType, TableSchema};
use std::sync::Arc;
use value::Value;

/// Supplies the next page of an operation's output.
#[async_trait]
pub trait BatchSource: Send + std::fmt::Debug {
    async fn fetch(&mut self) -> HiveResult<TFetchResultsResp>;
}

/// Forward-only cursor over the rows of one operation.
#[derive(Debug)]
pub struct ResultSet {
    idx: usize,
    length: usize,
    more: bool,
    batch: Option<TRowSet>,
    schema: Arc<TableSchema>,
    source: Box<dyn BatchSource>,
}

impl ResultSet {
    /// Creates a cursor positioned before the first row of `first`.
    pub fn new(
        first: TFetchResultsResp,
        schema: Arc<TableSchema>,
        source: Box<dyn BatchSource>,
    ) -> Self {
        Self {
            idx: 0,
            length: length(first.results.as_ref()),
            more: first.has_more_rows.unwrap_or(false),
            batch: first.results,
            schema,
            source,
        }
    }

    /// Returns the schema of the result set.
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Decodes the next row into `dest`, one slot per column.
    ///
    /// Returns `Ok(false)` at end of data.
    pub async fn next(&mut self, dest: &mut [Value]) -> HiveResult<bool> {
        while self.idx >= self.length && self.more {
            // No delay between fetches. A page may be empty while more rows are
            // still coming: the server hit its per-fetch time budget first.
            let resp = self.source.fetch().await?;
            self.more = resp.has_more_rows.unwrap_or(false);
            self.length = length(resp.results.as_ref());
            self.batch = resp.results;
            self.idx = 0;
        }

        if self.idx >= self.length {
            return Ok(false);
        }

        let batch = self
            .batch
            .as_ref()
            .ok_or_else(|| HiveError::Decode("missing row batch".to_string()))?;
        for (i, slot) in dest.iter_mut().enumerate() {
            let col = batch.columns.get(i).ok_or_else(|| {
                HiveError::Decode(format!("row batch has no column {i}"))
            })?;
            let desc = self.schema.columns.get(i).ok_or_else(|| {
                HiveError::Decode(format!("schema has no column {i}"))
            })?;
            *slot = decode(col, desc, self.idx)?;
        }
        self.idx += 1;
        Ok(true)
    }
}

/// Number of rows in a batch, taken from the first typed array present.
pub fn length(batch: Option<&TRowSet>) -> usize {
    let Some(batch) = batch else {
        return 0;
    };
    for col in &batch.columns {
        let len = col
            .bool_val
            .as_ref()
            .map(|c| c.values.len())
            .or_else(|| col.byte_val.as_ref().map(|c| c.values.len()))
            .or_else(|| col.i16_val.as_ref().map(|c| c.values.len()))
            .or_else(|| col.i32_val.as_ref().map(|c| c.values.len()))
            .or_else(|| col.i64_val.as_ref().map(|c| c.values.len()))
            .or_else(|| col.string_val.as_ref().map(|c| c.values.len()))
            .or_else(|| col.double_val.as_ref().map(|c| c.values.len()))
            .or_else(|| col.binary_val.as_ref().map(|c| c.values.len()));
        if let Some(len) = len {
            return len;
        }
    }
    0
}

fn is_null(nulls: &[u8], i: usize) -> bool {
    nulls
        .get(i / 8)
        .is_some_and(|byte| byte & (1 << (i % 8)) != 0)
}

/// Reads row `i` of a typed array, honoring its null bitmap.
fn cell<'a, T>(
    typed: Option<&'a TTypedColumn<T>>,
    desc: &ColumnDesc,
    i: usize,
) -> HiveResult<Option<&'a T>> {
    let typed = typed.ok_or_else(|| {
        HiveError::Decode(format!(
            "column {} ({}) is missing its {} values",
            desc.name, desc.database_type_name, desc.value_type
        ))
    })?;
    if is_null(&typed.nulls, i) {
        return Ok(None);
    }
    typed.values.get(i).map(Some).ok_or_else(|| {
        HiveError::Decode(format!(
            "column {} has {} values, row {} requested",
            desc.name,
            typed.values.len(),
            i
        ))
    })
}

fn decode(col: &TColumn, desc: &ColumnDesc, i: usize) -> HiveResult<Value> {
    let value = match desc.value_type {
        ScanType::Int8 => cell(col.byte_val.as_ref(), desc, i)?.map(|v| Value::Int8(*v)),
        ScanType::Int16 => cell(col.i16_val.as_ref(), desc, i)?.map(|v| Value::Int16(*v)),
        ScanType::Int32 => cell(col.i32_val.as_ref(), desc, i)?.map(|v| Value::Int32(*v)),
        ScanType::Int64 => cell(col.i64_val.as_ref(), desc, i)?.map(|v| Value::Int64(*v)),
        ScanType::Bool => cell(col.bool_val.as_ref(), desc, i)?.map(|v| Value::Bool(*v)),
        ScanType::Float64 => {
            cell(col.double_val.as_ref(), desc, i)?.map(|v| Value::Float64(*v))
        }
        ScanType::DateTime => match cell(col.string_val.as_ref(), desc, i)? {
            Some(s) => Some(Value::DateTime(Value::parse_timestamp(s).map_err(|e| {
                HiveError::Decode(format!("invalid timestamp {s:?}: {e}"))
            })?)),
            None => None,
        },
        _ => cell(col.string_val.as_ref(), desc, i)?.map(|v| Value::String(v.clone())),
    };
    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::hs2::TStatus;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct ScriptedSource {
        pages: VecDeque<TFetchResultsResp>,
        calls: usize,
    }

    #[async_trait]
    impl BatchSource for ScriptedSource {
        async fn fetch(&mut self) -> HiveResult<TFetchResultsResp> {
            self.calls += 1;
            self.pages
                .pop_front()
                .ok_or_else(|| HiveError::Rpc("no more pages".to_string()))
        }
    }

    fn page(columns: Vec<TColumn>, more: bool) -> TFetchResultsResp {
        TFetchResultsResp {
            status: TStatus::success(),
            has_more_rows: Some(more),
            results: Some(TRowSet {
                start_row_offset: 0,
                columns,
            }),
        }
    }

    fn string_schema() -> Arc<TableSchema> {
        Arc::new(TableSchema::new(vec![ColumnDesc::new(
            "s",
            "STRING",
            ScanType::String,
        )]))
    }

    #[tokio::test]
    async fn test_empty_result_set() {
        let first = TFetchResultsResp::default();
        let mut rs = ResultSet::new(first, string_schema(), Box::<ScriptedSource>::default());
        let mut row = vec![Value::Null];
        assert!(!rs.next(&mut row).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_page_with_more_rows_is_not_eof() {
        let source = ScriptedSource {
            pages: VecDeque::from([
                page(vec![TColumn::strings(vec![], vec![])], true),
                page(vec![TColumn::strings(vec!["hello".into()], vec![0])], false),
            ]),
            calls: 0,
        };
        let first = page(vec![TColumn::strings(vec![], vec![])], true);
        let mut rs = ResultSet::new(first, string_schema(), Box::new(source));

        let mut row = vec![Value::Null];
        assert!(rs.next(&mut row).await.unwrap());
        assert_eq!(row[0], Value::String("hello".into()));
        assert!(!rs.next(&mut row).await.unwrap());
    }

    #[tokio::test]
    async fn test_null_bit_wins_over_value() {
        let schema = Arc::new(TableSchema::new(vec![
            ColumnDesc::new("i", "INT", ScanType::Int32),
            ColumnDesc::new("s", "STRING", ScanType::String),
        ]));
        // row 1 of the int column and row 0 of the string column are null,
        // their slots hold leftover values
        let first = page(
            vec![
                TColumn::i32s(vec![1, 99, 3], vec![0b010]),
                TColumn::strings(vec!["junk".into(), "b".into(), "c".into()], vec![0b001]),
            ],
            false,
        );
        let mut rs = ResultSet::new(first, schema, Box::<ScriptedSource>::default());

        let mut row = vec![Value::Null, Value::Null];
        assert!(rs.next(&mut row).await.unwrap());
        assert_eq!(row, vec![Value::Int32(1), Value::Null]);
        assert!(rs.next(&mut row).await.unwrap());
        assert_eq!(row, vec![Value::Null, Value::String("b".into())]);
        assert!(rs.next(&mut row).await.unwrap());
        assert_eq!(row, vec![Value::Int32(3), Value::String("c".into())]);
        assert!(!rs.next(&mut row).await.unwrap());
    }

    #[tokio::test]
    async fn test_short_null_bitmap_means_not_null() {
        let schema = Arc::new(TableSchema::new(vec![ColumnDesc::new(
            "b",
            "BIGINT",
            ScanType::Int64,
        )]));
        let values: Vec<i64> = (0..10).collect();
        let first = page(vec![TColumn::i64s(values, vec![])], false);
        let mut rs = ResultSet::new(first, schema, Box::<ScriptedSource>::default());

        let mut row = vec![Value::Null];
        for expected in 0..10 {
            assert!(rs.next(&mut row).await.unwrap());
            assert_eq!(row[0], Value::Int64(expected));
        }
        assert!(!rs.next(&mut row).await.unwrap());
    }

    #[tokio::test]
    async fn test_timestamp_column() {
        let schema = Arc::new(TableSchema::new(vec![ColumnDesc::new(
            "t",
            "TIMESTAMP",
            ScanType::DateTime,
        )]));
        let first = page(
            vec![TColumn::strings(vec!["2019-01-01 12:00:00".into()], vec![0])],
            false,
        );
        let mut rs = ResultSet::new(first, schema, Box::<ScriptedSource>::default());

        let mut row = vec![Value::Null];
        assert!(rs.next(&mut row).await.unwrap());
        assert_eq!(
            row[0],
            Value::DateTime(Utc.with_ymd_and_hms(2019, 1, 1, 12, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_decimal_stays_a_string() {
        let schema = Arc::new(TableSchema::new(vec![ColumnDesc::new(
            "d",
            "DECIMAL",
            ScanType::String,
        )]));
        let first = page(vec![TColumn::strings(vec!["1.10".into()], vec![0])], false);
        let mut rs = ResultSet::new(first, schema, Box::<ScriptedSource>::default());

        let mut row = vec![Value::Null];
        assert!(rs.next(&mut row).await.unwrap());
        assert_eq!(row[0], Value::String("1.10".into()));
    }

    #[tokio::test]
    async fn test_missing_typed_array_is_decode_error() {
        let schema = Arc::new(TableSchema::new(vec![ColumnDesc::new(
            "i",
            "INT",
            ScanType::Int32,
        )]));
        let first = page(vec![TColumn::strings(vec!["1".into()], vec![0])], false);
        let mut rs = ResultSet::new(first, schema, Box::<ScriptedSource>::default());

        let mut row = vec![Value::Null];
        let err = rs.next(&mut row).await.unwrap_err();
        assert!(matches!(err, HiveError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_error_is_returned() {
        let first = page(vec![TColumn::strings(vec![], vec![])], true);
        let mut rs = ResultSet::new(first, string_schema(), Box::<ScriptedSource>::default());
        let mut row = vec![Value::Null];
        let err = rs.next(&mut row).await.unwrap_err();
        assert_eq!(err, HiveError::Rpc("no more pages".into()));
    }

    #[test]
    fn test_length_probe_order() {
        assert_eq!(length(None), 0);
        let batch = TRowSet {
            start_row_offset: 0,
            columns: vec![
                TColumn::default(),
                TColumn::doubles(vec![1.0, 2.0], vec![]),
            ],
        };
        assert_eq!(length(Some(&batch)), 2);
    }
}
