use csv::ReaderBuilder;
use encoding_rs::WINDOWS_1250;
use tracing::debug;

use super::NumberedRow;
use crate::error::ImportError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Read delimited text into rows of trimmed cells (header row included).
///
/// Each row carries the file line its record starts on. Blank lines are
/// skipped by the reader and a quoted field may span lines, so this is not
/// the record index.
pub fn read_csv_table(content: &[u8]) -> Result<Vec<NumberedRow>, ImportError> {
    let text = decode_text(content)?;
    let delimiter = sniff_delimiter(&text);
    debug!("CSV delimiter: {:?}", delimiter as char);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true) // Exchanges append summary lines with fewer columns
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(idx + 1, |pos| pos.line() as usize);
        rows.push((line, record.iter().map(|c| c.trim().to_string()).collect()));
    }
    Ok(rows)
}

/// UTF-8 first; legacy Polish exports are Windows-1250
fn decode_text(content: &[u8]) -> Result<String, ImportError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    if let Ok(text) = std::str::from_utf8(content) {
        return Ok(text.to_string());
    }

    let (text, _, had_errors) = WINDOWS_1250.decode(content);
    if had_errors {
        return Err(ImportError::Encoding);
    }
    debug!("Decoded CSV as Windows-1250");
    Ok(text.into_owned())
}

/// Most frequent candidate delimiter in the header line, comma on ties
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, header.bytes().filter(|b| *b == d).count()))
        .fold((b',', 0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_semicolon_separated_with_bom() {
        let content = b"\xEF\xBB\xBFData;Ilosc;Wartosc\n2024-01-01;1,5;100,00\n";
        let rows = read_csv_table(content).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, vec!["Data", "Ilosc", "Wartosc"]);
        assert_eq!(rows[1].1[1], "1,5");
    }

    #[test]
    fn test_decodes_windows_1250() {
        // "Ilość" in Windows-1250: 0x9C = ś, 0xE6 = ć
        let content = b"Data,Ilo\x9C\xE6\n2024-01-01,1\n";
        let rows = read_csv_table(content).unwrap();
        assert_eq!(rows[0].1[1], "Ilość");
    }

    #[test]
    fn test_quoted_commas_and_short_rows() {
        let content = b"a,b,c\n\"1,5\",x,y\ntotal\n";
        let rows = read_csv_table(content).unwrap();
        assert_eq!(rows[1].1[0], "1,5");
        assert_eq!(rows[2].1, vec!["total"]);
    }

    #[test]
    fn test_rows_keep_file_line_numbers() {
        let content = b"a,b\n1,x\n\n2,\"multi\nline\"\n3,y\n";
        let rows = read_csv_table(content).unwrap();
        let lines: Vec<usize> = rows.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![1, 2, 4, 6]);
        assert_eq!(rows[2].1[1], "multi\nline");
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("a;b,c;d"), b';');
        assert_eq!(sniff_delimiter("single"), b',');
    }
}
