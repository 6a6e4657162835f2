//! Delimited row encoding for batch files: comma separated, quoted as
//! needed, no header line.

use firehose_common::{BatchRow, PipelineError, Result};

pub fn encode_rows<R: BatchRow>(rows: &[R]) -> std::result::Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row.to_fields())?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Rows of a batch file as raw fields. Arity is not checked here.
pub fn decode_rows(data: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    reader
        .records()
        .enumerate()
        .map(|(row, record)| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| PipelineError::MalformedRecord {
                    row,
                    reason: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_fields_that_need_it() {
        let rows = vec![vec!["1".to_string(), "a, \"b\"".to_string(), "line\nbreak".to_string()]];
        let encoded = encode_rows(&rows).unwrap();
        assert_eq!(
            String::from_utf8(encoded.clone()).unwrap(),
            "1,\"a, \"\"b\"\"\",\"line\nbreak\"\n"
        );
        assert_eq!(decode_rows(&encoded).unwrap(), rows);
    }

    #[test]
    fn empty_batch_encodes_to_nothing() {
        let rows: Vec<Vec<String>> = Vec::new();
        assert!(encode_rows(&rows).unwrap().is_empty());
        assert!(decode_rows(b"").unwrap().is_empty());
    }

    #[test]
    fn ragged_rows_are_returned_as_is() {
        let rows = decode_rows(b"a,b,c\nd\n").unwrap();
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1], vec!["d".to_string()]);
    }
}
