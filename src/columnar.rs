//! Arrow representation of a point set: one row per point, the coordinates as a non-nullable
//! `list<int64>` column named `points`.

use crate::{Error, PointStore, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::Int64Type;
use arrow_array::{Array, ArrayRef, Int64Array, ListArray, RecordBatch};
use arrow_buffer::OffsetBuffer;
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

pub const POINTS_FIELD: &str = "points";
pub const COORD_FIELD: &str = "coord";

/// Schema of the record batches produced by [`encode_points`].
pub fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![Field::new(POINTS_FIELD, DataType::List(coord_field()), false)]))
}

fn coord_field() -> Arc<Field> {
    Arc::new(Field::new(COORD_FIELD, DataType::Int64, false))
}

/// Encode **points** as a record batch with one list entry per point.
pub fn encode_points(points: &PointStore<i64>) -> Result<RecordBatch> {
    if i32::try_from(points.as_slice().len()).is_err() {
        return Err(Error::encoding("record batch",
            format!("{} coordinates exceed the 32-bit list offsets", points.as_slice().len())));
    }
    let values = Int64Array::from(points.as_slice().to_vec());
    let offsets = OffsetBuffer::<i32>::from_lengths(std::iter::repeat(points.dims()).take(points.len()));
    let list = ListArray::try_new(coord_field(), offsets, Arc::new(values), None)?;
    Ok(RecordBatch::try_new(schema(), vec![Arc::new(list) as ArrayRef])?)
}

/// Decode a batch written by [`encode_points`].
///
/// Fails with [`Error::EncodingMismatch`] if the column is missing or has the wrong type, if it
/// contains nulls, or if the points differ in dimensionality. The dimensionality is taken from the
/// first row, so an empty batch cannot be decoded.
pub fn decode_points(batch: &RecordBatch) -> Result<PointStore<i64>> {
    let column = batch.column_by_name(POINTS_FIELD)
        .ok_or_else(|| Error::encoding("record batch", format!("no `{}` column", POINTS_FIELD)))?;
    let list = column.as_list_opt::<i32>()
        .ok_or_else(|| Error::encoding("record batch", format!("`{}` is {}, not a list", POINTS_FIELD, column.data_type())))?;
    let coords = list.values().as_primitive_opt::<Int64Type>()
        .ok_or_else(|| Error::encoding("record batch", format!("coordinates are {}, not int64", list.values().data_type())))?;
    if list.null_count() > 0 || coords.null_count() > 0 {
        return Err(Error::encoding("record batch", "points contain nulls"));
    }
    if list.is_empty() {
        return Err(Error::encoding("record batch", "cannot infer the dimensionality of an empty batch"));
    }

    let offsets = list.value_offsets();
    let dims = (offsets[1] - offsets[0]) as usize;
    if let Some(row) = offsets.windows(2).position(|w| (w[1] - w[0]) as usize != dims) {
        return Err(Error::encoding("record batch", format!(
            "point {} has {} coordinates, expected {}", row, offsets[row + 1] - offsets[row], dims)));
    }
    let (start, end) = (offsets[0] as usize, offsets[list.len()] as usize);
    PointStore::new(coords.values()[start..end].to_vec(), list.len(), dims)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::testing;

    #[test]
    fn encodes_one_list_per_point() {
        let points = testing::points(&[&[1, -2, 3], &[i64::MIN, 0, i64::MAX]]);
        let batch = encode_points(&points).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema(), schema());
        assert_eq!(decode_points(&batch).unwrap(), points);
    }

    #[test]
    fn empty_store_encodes_but_cannot_be_decoded() {
        let points = PointStore::<i64>::new(vec![], 0, 3).unwrap();
        let batch = encode_points(&points).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert!(matches!(decode_points(&batch), Err(Error::EncodingMismatch { .. })));
    }

    #[test]
    fn ragged_lists_are_rejected() {
        let offsets = OffsetBuffer::<i32>::from_lengths([2, 1]);
        let list = ListArray::try_new(coord_field(), offsets, Arc::new(Int64Array::from(vec![1, 2, 3])), None).unwrap();
        let batch = RecordBatch::try_new(schema(), vec![Arc::new(list) as ArrayRef]).unwrap();
        assert!(matches!(decode_points(&batch), Err(Error::EncodingMismatch { .. })));
    }

    #[test]
    fn wrong_column_type_is_rejected() {
        let schema = Arc::new(Schema::new(vec![Field::new(POINTS_FIELD, DataType::Int64, false)]));
        let batch = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef]).unwrap();
        assert!(matches!(decode_points(&batch), Err(Error::EncodingMismatch { .. })));
    }
}
