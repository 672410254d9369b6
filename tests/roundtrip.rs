use proptest::prelude::*;
use strict_csv::{Parser, Row, Terminator, Writer, WriterBuilder};

fn field_strategy() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..8)
}

fn row_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(field_strategy(), 0..5)
}

fn rows_strategy() -> impl Strategy<Value = Vec<Vec<Vec<u8>>>> {
    proptest::collection::vec(row_strategy(), 0..5)
}

fn write_rows(rows: &[Vec<Vec<u8>>], terminator: Terminator) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut wtr = WriterBuilder::new()
            .terminator(terminator)
            .build(&mut buf)
            .unwrap();
        for row in rows {
            wtr.write_row(row.iter().map(|f| f.as_slice())).unwrap();
        }
        wtr.flush().unwrap();
    }
    buf
}

fn parse_rows(data: &[u8]) -> Vec<Vec<Vec<u8>>> {
    let mut parser = Parser::new(data).unwrap();
    let mut out = Vec::new();
    let mut row = Row::new();
    while parser.read_row(&mut row).unwrap() {
        out.push(row.iter().map(|f| f.to_vec()).collect());
    }
    out
}

proptest! {
    /// Any row of arbitrary byte fields survives a write/parse cycle.
    #[test]
    fn roundtrip_any_bytes(rows in rows_strategy()) {
        let data = write_rows(&rows, Terminator::LF);
        let parsed = parse_rows(&data);
        prop_assert_eq!(parsed, rows);
    }

    /// Swapping the writer's terminator never changes what gets parsed back.
    #[test]
    fn terminator_insensitive(rows in rows_strategy()) {
        let lf = parse_rows(&write_rows(&rows, Terminator::LF));
        let cr = parse_rows(&write_rows(&rows, Terminator::CR));
        let crlf = parse_rows(&write_rows(&rows, Terminator::CRLF));
        prop_assert_eq!(&lf, &rows);
        prop_assert_eq!(&cr, &rows);
        prop_assert_eq!(&crlf, &rows);
    }

    /// A field made entirely of `k` quote bytes is written as `2k + 2`
    /// quote bytes (the opening/closing pair plus one escape per quote).
    #[test]
    fn quote_doubling_scales_with_quote_count(k in 0usize..20) {
        let field = vec![b'"'; k];
        let mut buf = Vec::new();
        {
            let mut wtr = Writer::new(&mut buf).unwrap();
            wtr.write_row([field.as_slice()]).unwrap();
        }
        let quote_count = buf.iter().filter(|&&b| b == b'"').count();
        prop_assert_eq!(quote_count, 2 * k + 2);
    }

    /// A single row round-trips regardless of whether its lone field is
    /// empty (the empty-row/empty-field ambiguity the `""` encoding exists
    /// to resolve).
    #[test]
    fn single_field_roundtrip(field in field_strategy()) {
        let rows = vec![vec![field]];
        let data = write_rows(&rows, Terminator::LF);
        let parsed = parse_rows(&data);
        prop_assert_eq!(parsed, rows);
    }
}
