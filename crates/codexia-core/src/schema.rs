/// Arrow layout of the policy passage table.
pub mod passages {
    use std::sync::Arc;

    use arrow::array::{Array, FixedSizeListBuilder, Float32Builder, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::evidence::Passage;

    pub const EMBEDDING_COLUMN: &str = "embedding";

    /// Schema for embedded policy passages.
    pub fn policy_passage_schema(dim: usize) -> Schema {
        Schema::new(vec![
            Field::new("text", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, false),
            Field::new("clause_id", DataType::Utf8, false),
            Field::new("effective_from", DataType::Utf8, false),
            Field::new("effective_to", DataType::Utf8, true),
            Field::new(
                EMBEDDING_COLUMN,
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dim as i32,
                ),
                false,
            ),
        ])
    }

    /// Build one batch from passages and their embeddings (same order, same length).
    pub fn passages_to_batch(
        passages: &[Passage],
        vectors: &[Vec<f32>],
        dim: usize,
    ) -> Result<RecordBatch, ArrowError> {
        if passages.len() != vectors.len() {
            return Err(ArrowError::InvalidArgumentError(format!(
                "{} passages but {} vectors",
                passages.len(),
                vectors.len()
            )));
        }
        let column = |f: fn(&Passage) -> Option<&str>| {
            Arc::new(StringArray::from(passages.iter().map(f).collect::<Vec<_>>())) as Arc<dyn Array>
        };

        let mut emb_builder = FixedSizeListBuilder::new(Float32Builder::new(), dim as i32);
        for vector in vectors {
            if vector.len() != dim {
                return Err(ArrowError::InvalidArgumentError(format!(
                    "embedding has {} values, expected {dim}",
                    vector.len()
                )));
            }
            emb_builder.values().append_slice(vector);
            emb_builder.append(true);
        }

        RecordBatch::try_new(
            Arc::new(policy_passage_schema(dim)),
            vec![
                column(|p| Some(p.text.as_str())),
                column(|p| Some(p.source.as_str())),
                column(|p| Some(p.clause_id.as_str())),
                column(|p| Some(p.effective_from.as_str())),
                column(|p| p.effective_to.as_deref()),
                Arc::new(emb_builder.finish()),
            ],
        )
    }

    /// Read passages back out of a batch carrying at least the text columns.
    pub fn batch_to_passages(batch: &RecordBatch) -> Result<Vec<Passage>, ArrowError> {
        let text = string_column(batch, "text")?;
        let source = string_column(batch, "source")?;
        let clause_id = string_column(batch, "clause_id")?;
        let from = string_column(batch, "effective_from")?;
        let to = string_column(batch, "effective_to")?;

        Ok((0..batch.num_rows())
            .map(|i| Passage {
                text: text.value(i).to_string(),
                source: source.value(i).to_string(),
                clause_id: clause_id.value(i).to_string(),
                effective_from: from.value(i).to_string(),
                effective_to: (!to.is_null(i)).then(|| to.value(i).to_string()),
            })
            .collect())
    }

    fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, ArrowError> {
        batch
            .column_by_name(name)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| ArrowError::SchemaError(format!("missing utf8 column {name:?}")))
    }
}
