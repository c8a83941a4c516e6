//! Row decoding helpers shared by the dialect clients.

use sqlx::{Column, ColumnIndex, Decode, Row, Type, ValueRef};

/// Column names of a fetched row, in result order.
pub(crate) fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Returns true if the value at `index` is SQL NULL.
pub(crate) fn is_null<R>(row: &R, index: usize) -> bool
where
    R: Row,
    usize: ColumnIndex<R>,
{
    row.try_get_raw(index).map(|v| v.is_null()).unwrap_or(true)
}

/// Decodes a column with the driver's type check. `None` if NULL or incompatible.
pub(crate) fn decode<'r, R, T>(row: &'r R, index: usize) -> Option<T>
where
    R: Row,
    T: Decode<'r, R::Database> + Type<R::Database>,
    usize: ColumnIndex<R>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// Decodes a column skipping the driver's type check.
pub(crate) fn decode_unchecked<'r, R, T>(row: &'r R, index: usize) -> Option<T>
where
    R: Row,
    T: Decode<'r, R::Database>,
    usize: ColumnIndex<R>,
{
    row.try_get_unchecked::<Option<T>, _>(index).ok().flatten()
}

/// Reads a text column that some servers report as binary.
pub(crate) fn decode_text<'r, R>(row: &'r R, index: usize) -> Option<String>
where
    R: Row,
    String: Decode<'r, R::Database> + Type<R::Database>,
    Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
    usize: ColumnIndex<R>,
{
    decode::<R, String>(row, index).or_else(|| {
        decode::<R, Vec<u8>>(row, index).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    })
}
